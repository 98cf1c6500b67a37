// src/geometry.rs - 2D points, segment vectors and the angle between them
use nalgebra::{Point2, Vector2};

/// Image-space pixel position. y grows downward.
pub type Point2D = Point2<f64>;

/// Directed difference between two points (never a position).
pub type Vector2D = Vector2<f64>;

/// Segments shorter than this are treated as coincident landmarks.
pub const SEGMENT_EPSILON: f64 = 1e-6;

/// Image-space "up".
pub fn vertical_up() -> Vector2D {
    Vector2D::new(0.0, -1.0)
}

pub fn midpoint(a: &Point2D, b: &Point2D) -> Point2D {
    nalgebra::center(a, b)
}

pub fn is_degenerate(v: &Vector2D) -> bool {
    !(v.norm() >= SEGMENT_EPSILON)
}

/// Unsigned angle between two vectors in degrees, always within `[0, 180]`.
///
/// The cosine is clamped to `[-1, 1]` before `acos` so rounding drift on
/// (anti)parallel vectors never produces NaN.
///
/// Precondition: neither vector is zero-length. A zero-length input divides
/// by zero and yields NaN; callers guard with [`is_degenerate`].
pub fn angle_between(v1: &Vector2D, v2: &Vector2D) -> f64 {
    let cos_angle = (v1.dot(v2) / (v1.norm() * v2.norm())).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

// src/simulation.rs - Synthetic gait cycle used when no keypoint stream is supplied
use nalgebra::Rotation2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, PI};

use crate::geometry::{Point2D, Vector2D};
use crate::landmarks::{CanonicalFrame, PoseModel, SegmentPoints};
use crate::zones::GaitType;

const TRUNK_LENGTH: f64 = 50.0;
const THIGH_LENGTH: f64 = 55.0;
const SHANK_LENGTH: f64 = 50.0;
const FOOT_LENGTH: f64 = 25.0;

const LEFT_HIP: (f64, f64) = (98.0, 95.0);
const RIGHT_HIP: (f64, f64) = (102.0, 95.0);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub frames: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { frames: 60 }
    }
}

/// Joint trajectory shape for one gait type. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaitProfile {
    /// Mean thigh angle from vertical, forward positive.
    pub thigh_mean: f64,
    pub thigh_amplitude: f64,
    pub knee_min: f64,
    /// Peak-to-peak knee flexion.
    pub knee_range: f64,
    /// Mean angle between shank and foot.
    pub ankle_mean: f64,
    pub ankle_amplitude: f64,
}

impl GaitProfile {
    pub fn for_gait(gait: GaitType) -> Self {
        match gait {
            GaitType::Running => Self {
                thigh_mean: 30.0,
                thigh_amplitude: 32.0,
                knee_min: 5.0,
                knee_range: 125.0,
                ankle_mean: 90.0,
                ankle_amplitude: 35.0,
            },
            GaitType::Walking => Self {
                thigh_mean: 15.0,
                thigh_amplitude: 17.0,
                knee_min: 5.0,
                knee_range: 60.0,
                ankle_mean: 90.0,
                ankle_amplitude: 16.0,
            },
        }
    }
}

/// Forward trunk lean in degrees, a slow half-sine over the cycle (3 to 13).
pub fn trunk_lean(phase: f64) -> f64 {
    8.0 + 5.0 * (phase * 0.5).sin()
}

/// Unit vector pointing down the image, rotated forward (+x) by `degrees`.
fn downward(degrees: f64) -> Vector2D {
    let r = degrees.to_radians();
    Vector2D::new(r.sin(), r.cos())
}

pub struct GaitSimulator {
    profile: GaitProfile,
    frames: usize,
}

impl GaitSimulator {
    pub fn new(gait: GaitType, config: &SimulationConfig) -> Self {
        Self::with_profile(GaitProfile::for_gait(gait), config.frames)
    }

    pub fn with_profile(profile: GaitProfile, frames: usize) -> Self {
        Self { profile, frames }
    }

    pub fn profile(&self) -> &GaitProfile {
        &self.profile
    }

    /// One full cycle, `frames` samples over `[0, 2π)`.
    pub fn generate(&self) -> Vec<CanonicalFrame> {
        (0..self.frames)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / self.frames as f64;
                self.frame_at(i, phase)
            })
            .collect()
    }

    pub fn frame_at(&self, frame_index: usize, phase: f64) -> CanonicalFrame {
        let lean = trunk_lean(phase);
        CanonicalFrame {
            left: self.side(LEFT_HIP, lean, phase),
            right: self.side(RIGHT_HIP, lean, phase + PI),
            model: PoseModel::Simulated,
            frame_index,
            has_foot_landmark: true,
        }
    }

    fn side(&self, hip: (f64, f64), lean: f64, phase: f64) -> SegmentPoints {
        let p = &self.profile;
        let hip = Point2D::new(hip.0, hip.1);
        // up the leaned trunk
        let shoulder = hip - downward(-lean) * TRUNK_LENGTH;

        let thigh = p.thigh_mean + p.thigh_amplitude * phase.sin();
        let knee = hip + downward(thigh) * THIGH_LENGTH;

        let flexion = p.knee_min + p.knee_range * (0.5 - 0.5 * phase.cos());
        let shank_dir = downward(thigh - flexion);
        let ankle = knee + shank_dir * SHANK_LENGTH;

        let ankle_angle = p.ankle_mean + p.ankle_amplitude * (phase + FRAC_PI_4).sin();
        let foot = ankle + Rotation2::new(ankle_angle.to_radians()) * shank_dir * FOOT_LENGTH;

        SegmentPoints { shoulder, hip, knee, ankle, foot }
    }
}

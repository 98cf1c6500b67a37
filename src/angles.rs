// src/angles.rs - Per-frame joint angles and the per-side angle series
use serde::{Deserialize, Serialize};

use crate::error::FrameRejection;
use crate::geometry::{angle_between, is_degenerate, midpoint, vertical_up, Vector2D};
use crate::landmarks::{BodySide, CanonicalFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Joint {
    Spine,
    Hip,
    Knee,
    /// Ankle angle, or tibial inclination when no foot data exists.
    Ankle,
}

impl Joint {
    pub const ALL: [Joint; 4] = [Joint::Spine, Joint::Hip, Joint::Knee, Joint::Ankle];
    /// Joints measured independently on each side.
    pub const PAIRED: [Joint; 3] = [Joint::Hip, Joint::Knee, Joint::Ankle];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnkleMethod {
    /// Shank against the ankle-to-foot segment.
    Traditional,
    /// Shank against image vertical.
    TibialSurrogate,
}

impl AnkleMethod {
    /// The method a single frame supports on its own.
    pub fn for_frame(frame: &CanonicalFrame) -> Self {
        if frame.has_true_foot_segments() {
            AnkleMethod::Traditional
        } else {
            AnkleMethod::TibialSurrogate
        }
    }

    /// One method for a whole capture: traditional when most frames carry
    /// true foot segments, otherwise the surrogate for every frame.
    pub fn for_run(frames: &[CanonicalFrame]) -> Self {
        let with_foot = frames.iter().filter(|f| f.has_true_foot_segments()).count();
        if with_foot > 0 && with_foot * 2 > frames.len() {
            AnkleMethod::Traditional
        } else {
            AnkleMethod::TibialSurrogate
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnkleMethod::Traditional => "Traditional Ankle-Foot Angle",
            AnkleMethod::TibialSurrogate => "Tibial Inclination (shank-to-vertical surrogate)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointAngles {
    pub spine: f64,
    pub hip: f64,
    pub knee: f64,
    pub ankle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameAngles {
    pub left: JointAngles,
    pub right: JointAngles,
    pub ankle_method: AnkleMethod,
}

fn segment(v: Vector2D, name: &'static str) -> Result<Vector2D, FrameRejection> {
    if is_degenerate(&v) {
        Err(FrameRejection::DegenerateGeometry { segment: name })
    } else {
        Ok(v)
    }
}

/// Computes the eight joint angles of one frame, picking the ankle method
/// from the frame itself.
pub fn extract_frame_angles(frame: &CanonicalFrame) -> Result<FrameAngles, FrameRejection> {
    extract_frame_angles_with(frame, AnkleMethod::for_frame(frame))
}

/// Computes the eight joint angles with a fixed ankle method. A frame without
/// true foot segments cannot be measured with the traditional method.
pub fn extract_frame_angles_with(
    frame: &CanonicalFrame,
    ankle_method: AnkleMethod,
) -> Result<FrameAngles, FrameRejection> {
    if ankle_method == AnkleMethod::Traditional && !frame.has_true_foot_segments() {
        return Err(FrameRejection::MissingFootSegment);
    }

    let up = vertical_up();
    let shoulder_mid = midpoint(&frame.left.shoulder, &frame.right.shoulder);
    let hip_mid = midpoint(&frame.left.hip, &frame.right.hip);
    let trunk = segment(shoulder_mid - hip_mid, "trunk")?;
    let spine = angle_between(&trunk, &up);

    let side_angles = |side: BodySide| -> Result<JointAngles, FrameRejection> {
        let p = frame.side(side);
        let side_trunk = segment(p.shoulder - p.hip, "side trunk")?;
        let thigh = segment(p.hip - p.knee, "thigh")?;
        let shank = segment(p.knee - p.ankle, "shank")?;

        let ankle = match ankle_method {
            AnkleMethod::Traditional => {
                let foot = segment(p.ankle - p.foot, "foot")?;
                angle_between(&shank, &foot)
            }
            AnkleMethod::TibialSurrogate => angle_between(&shank, &up),
        };

        Ok(JointAngles {
            spine,
            hip: angle_between(&side_trunk, &thigh),
            knee: angle_between(&thigh, &shank),
            ankle,
        })
    };

    Ok(FrameAngles {
        left: side_angles(BodySide::Left)?,
        right: side_angles(BodySide::Right)?,
        ankle_method,
    })
}

/// Angle time series for one body side, one entry per analyzed frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointAngleSeries {
    pub spine: Vec<f64>,
    pub hip: Vec<f64>,
    pub knee: Vec<f64>,
    pub ankle: Vec<f64>,
}

impl JointAngleSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            spine: Vec::with_capacity(capacity),
            hip: Vec::with_capacity(capacity),
            knee: Vec::with_capacity(capacity),
            ankle: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, angles: &JointAngles) {
        self.spine.push(angles.spine);
        self.hip.push(angles.hip);
        self.knee.push(angles.knee);
        self.ankle.push(angles.ankle);
    }

    pub fn get(&self, joint: Joint) -> &[f64] {
        match joint {
            Joint::Spine => &self.spine,
            Joint::Hip => &self.hip,
            Joint::Knee => &self.knee,
            Joint::Ankle => &self.ankle,
        }
    }

    pub fn get_mut(&mut self, joint: Joint) -> &mut Vec<f64> {
        match joint {
            Joint::Spine => &mut self.spine,
            Joint::Hip => &mut self.hip,
            Joint::Knee => &mut self.knee,
            Joint::Ankle => &mut self.ankle,
        }
    }

    pub fn len(&self) -> usize {
        self.spine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spine.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleSeriesSet {
    pub left: JointAngleSeries,
    pub right: JointAngleSeries,
}

impl AngleSeriesSet {
    pub fn side(&self, side: BodySide) -> &JointAngleSeries {
        match side {
            BodySide::Left => &self.left,
            BodySide::Right => &self.right,
        }
    }

    pub fn side_mut(&mut self, side: BodySide) -> &mut JointAngleSeries {
        match side {
            BodySide::Left => &mut self.left,
            BodySide::Right => &mut self.right,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.left.len()
    }
}

/// Accumulates per-frame angles over one capture with a single ankle method.
/// Frames that cannot be measured are reported back and leave the series
/// untouched.
#[derive(Debug)]
pub struct AngleExtractor {
    series: AngleSeriesSet,
    ankle_method: AnkleMethod,
}

impl AngleExtractor {
    pub fn new(ankle_method: AnkleMethod, capacity: usize) -> Self {
        Self {
            series: AngleSeriesSet {
                left: JointAngleSeries::with_capacity(capacity),
                right: JointAngleSeries::with_capacity(capacity),
            },
            ankle_method,
        }
    }

    /// Extractor sized for `frames`, with the ankle method resolved over all of them.
    pub fn for_run(frames: &[CanonicalFrame]) -> Self {
        Self::new(AnkleMethod::for_run(frames), frames.len())
    }

    pub fn push_frame(&mut self, frame: &CanonicalFrame) -> Result<(), FrameRejection> {
        let angles = extract_frame_angles_with(frame, self.ankle_method)?;
        self.series.left.push(&angles.left);
        self.series.right.push(&angles.right);
        Ok(())
    }

    pub fn frames(&self) -> usize {
        self.series.frame_count()
    }

    pub fn ankle_method(&self) -> AnkleMethod {
        self.ankle_method
    }

    pub fn using_tibial_surrogate(&self) -> bool {
        self.ankle_method == AnkleMethod::TibialSurrogate
    }

    pub fn finish(self) -> AngleSeriesSet {
        self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2D;
    use crate::landmarks::{PoseModel, SegmentPoints};
    use approx::assert_abs_diff_eq;

    fn upright_side(x: f64) -> SegmentPoints {
        SegmentPoints {
            shoulder: Point2D::new(x, 50.0),
            hip: Point2D::new(x, 100.0),
            knee: Point2D::new(x, 150.0),
            ankle: Point2D::new(x, 200.0),
            foot: Point2D::new(x + 20.0, 200.0),
        }
    }

    fn upright_frame() -> CanonicalFrame {
        CanonicalFrame {
            left: upright_side(95.0),
            right: upright_side(105.0),
            model: PoseModel::MediaPipe,
            frame_index: 0,
            has_foot_landmark: true,
        }
    }

    #[test]
    fn upright_pose_has_straight_joints() {
        let angles = extract_frame_angles(&upright_frame()).unwrap();
        assert_eq!(angles.ankle_method, AnkleMethod::Traditional);
        for side in [angles.left, angles.right] {
            assert_abs_diff_eq!(side.spine, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(side.hip, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(side.knee, 0.0, epsilon = 1e-9);
            // shank up against foot pointing back toward the ankle
            assert_abs_diff_eq!(side.ankle, 90.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn flexed_knee_is_measured_between_thigh_and_shank() {
        let mut frame = upright_frame();
        // shank swings 90 degrees backward
        frame.left.ankle = Point2D::new(45.0, 150.0);
        frame.left.foot = Point2D::new(45.0, 170.0);
        let angles = extract_frame_angles(&frame).unwrap();
        assert_abs_diff_eq!(angles.left.knee, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(angles.right.knee, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn coincident_foot_switches_to_tibial_surrogate() {
        let mut frame = upright_frame();
        frame.left.ankle = Point2D::new(105.0, 198.0);
        frame.left.foot = frame.left.ankle;
        frame.right.foot = frame.right.ankle;
        let angles = extract_frame_angles(&frame).unwrap();
        assert_eq!(angles.ankle_method, AnkleMethod::TibialSurrogate);
        let shank = frame.left.knee - frame.left.ankle;
        assert_abs_diff_eq!(
            angles.left.ankle,
            angle_between(&shank, &vertical_up()),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(angles.right.ankle, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn schema_without_foot_uses_surrogate_even_with_distinct_points() {
        let mut frame = upright_frame();
        frame.has_foot_landmark = false;
        let angles = extract_frame_angles(&frame).unwrap();
        assert_eq!(angles.ankle_method, AnkleMethod::TibialSurrogate);
    }

    #[test]
    fn coincident_knee_and_hip_is_degenerate() {
        let mut frame = upright_frame();
        frame.right.knee = frame.right.hip;
        assert!(matches!(
            extract_frame_angles(&frame),
            Err(FrameRejection::DegenerateGeometry { segment: "thigh" })
        ));
    }

    #[test]
    fn extractor_skips_rejected_frames() {
        let mut extractor = AngleExtractor::new(AnkleMethod::Traditional, 3);
        let good = upright_frame();
        let mut bad = upright_frame();
        bad.left.shoulder = bad.left.hip;

        assert!(extractor.push_frame(&good).is_ok());
        assert!(extractor.push_frame(&bad).is_err());
        assert!(extractor.push_frame(&good).is_ok());

        assert_eq!(extractor.frames(), 2);
        assert!(!extractor.using_tibial_surrogate());
        let series = extractor.finish();
        assert_eq!(series.left.hip.len(), 2);
        assert_eq!(series.right.ankle.len(), 2);
    }

    #[test]
    fn run_method_follows_the_majority_of_frames() {
        let mut footless = upright_frame();
        footless.has_foot_landmark = false;

        let mostly_feet = [upright_frame(), upright_frame(), footless];
        assert_eq!(AnkleMethod::for_run(&mostly_feet), AnkleMethod::Traditional);

        let mostly_footless = [upright_frame(), footless, footless];
        assert_eq!(AnkleMethod::for_run(&mostly_footless), AnkleMethod::TibialSurrogate);
        assert_eq!(AnkleMethod::for_run(&[]), AnkleMethod::TibialSurrogate);
    }

    #[test]
    fn traditional_run_drops_footless_frame_instead_of_mixing_methods() {
        let mut footless = upright_frame();
        footless.left.foot = footless.left.ankle;
        let frames = [upright_frame(), footless, upright_frame()];

        let mut extractor = AngleExtractor::for_run(&frames);
        assert_eq!(extractor.ankle_method(), AnkleMethod::Traditional);
        assert!(extractor.push_frame(&frames[0]).is_ok());
        assert_eq!(extractor.push_frame(&frames[1]), Err(FrameRejection::MissingFootSegment));
        assert!(extractor.push_frame(&frames[2]).is_ok());

        let series = extractor.finish();
        assert_eq!(series.left.ankle.len(), 2);
        for value in &series.left.ankle {
            assert_abs_diff_eq!(*value, 90.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn surrogate_run_measures_every_frame_against_vertical() {
        let mut extractor = AngleExtractor::new(AnkleMethod::TibialSurrogate, 2);
        extractor.push_frame(&upright_frame()).unwrap();
        assert!(extractor.using_tibial_surrogate());
        // vertical shank, even though this frame has a real foot
        assert_abs_diff_eq!(extractor.finish().right.ankle[0], 0.0, epsilon = 1e-9);
    }
}

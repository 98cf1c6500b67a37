// src/landmarks.rs - Pose-model landmark schemas and the canonical per-frame body structure
use serde::{Deserialize, Serialize};

use crate::error::FrameRejection;
use crate::geometry::Point2D;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodySide {
    Left,
    Right,
}

impl BodySide {
    pub const BOTH: [BodySide; 2] = [BodySide::Left, BodySide::Right];

    pub fn label(&self) -> &'static str {
        match self {
            BodySide::Left => "Left",
            BodySide::Right => "Right",
        }
    }
}

/// Landmarks the canonical frame carries for each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandmarkJoint {
    Shoulder,
    Hip,
    Knee,
    Ankle,
    Foot,
}

/// Which pose model produced the landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoseModel {
    /// 17-point COCO layout, no foot landmark (ankle doubles as foot).
    MoveNet,
    /// 33-point layout with foot-index landmarks.
    MediaPipe,
    Simulated,
}

impl PoseModel {
    pub fn has_foot_landmarks(&self) -> bool {
        !matches!(self, PoseModel::MoveNet)
    }

    fn schema(&self) -> Option<&'static LandmarkSchema> {
        match self {
            PoseModel::MoveNet => Some(&MOVENET_SCHEMA),
            PoseModel::MediaPipe => Some(&MEDIAPIPE_SCHEMA),
            PoseModel::Simulated => None,
        }
    }
}

struct SideIndices {
    shoulder: usize,
    hip: usize,
    knee: usize,
    ankle: usize,
    foot: Option<usize>,
}

struct LandmarkSchema {
    left: SideIndices,
    right: SideIndices,
}

impl LandmarkSchema {
    fn side(&self, side: BodySide) -> &SideIndices {
        match side {
            BodySide::Left => &self.left,
            BodySide::Right => &self.right,
        }
    }
}

const MOVENET_SCHEMA: LandmarkSchema = LandmarkSchema {
    left: SideIndices {
        shoulder: 5,
        hip: 11,
        knee: 13,
        ankle: 15,
        foot: None,
    },
    right: SideIndices {
        shoulder: 6,
        hip: 12,
        knee: 14,
        ankle: 16,
        foot: None,
    },
};

const MEDIAPIPE_SCHEMA: LandmarkSchema = LandmarkSchema {
    left: SideIndices {
        shoulder: 11,
        hip: 23,
        knee: 25,
        ankle: 27,
        foot: Some(31),
    },
    right: SideIndices {
        shoulder: 12,
        hip: 24,
        knee: 26,
        ankle: 28,
        foot: Some(32),
    },
};

/// One landmark as reported by the pose model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawLandmark {
    pub x: f64,
    pub y: f64,
    /// Detection score / visibility. Absent means the model gave none.
    #[serde(default)]
    pub score: Option<f64>,
}

impl RawLandmark {
    pub fn new(x: f64, y: f64, score: f64) -> Self {
        Self { x, y, score: Some(score) }
    }
}

/// Per-frame output of an external pose model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoseFrame {
    pub model: PoseModel,
    pub landmarks: Vec<RawLandmark>,
    /// When set, coordinates are normalized to `[0, 1]` and are scaled by
    /// `(width, height)` into pixel space.
    #[serde(default)]
    pub frame_size: Option<(f64, f64)>,
    #[serde(default)]
    pub frame_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentPoints {
    pub shoulder: Point2D,
    pub hip: Point2D,
    pub knee: Point2D,
    pub ankle: Point2D,
    /// Equal to `ankle` by value when no foot landmark exists.
    pub foot: Point2D,
}

impl SegmentPoints {
    /// True when the foot point is the ankle standing in for it.
    pub fn foot_is_ankle(&self) -> bool {
        self.foot.x == self.ankle.x && self.foot.y == self.ankle.y
    }
}

/// Pose-model independent landmarks for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFrame {
    pub left: SegmentPoints,
    pub right: SegmentPoints,
    pub model: PoseModel,
    pub frame_index: usize,
    /// Set from the schema (and per-frame foot validation), never inferred.
    pub has_foot_landmark: bool,
}

impl CanonicalFrame {
    pub fn side(&self, side: BodySide) -> &SegmentPoints {
        match side {
            BodySide::Left => &self.left,
            BodySide::Right => &self.right,
        }
    }

    /// True foot data requires the schema flag and a foot point that is not the
    /// ankle on both sides. The coordinate check is kept as a tie-break for
    /// frames whose foot landmark was collapsed onto the ankle upstream.
    pub fn has_true_foot_segments(&self) -> bool {
        self.has_foot_landmark && !self.left.foot_is_ankle() && !self.right.foot_is_ankle()
    }
}

/// Maps raw landmark arrays into [`CanonicalFrame`]s.
#[derive(Debug, Clone)]
pub struct KeypointNormalizer {
    min_confidence: f64,
}

impl Default for KeypointNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

impl KeypointNormalizer {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Builds the canonical frame, or says why this frame must be dropped.
    /// `fallback_index` is used when the raw frame carries no index.
    pub fn normalize(
        &self,
        raw: &RawPoseFrame,
        fallback_index: usize,
    ) -> Result<CanonicalFrame, FrameRejection> {
        let schema = raw
            .model
            .schema()
            .ok_or(FrameRejection::UnsupportedModel(raw.model))?;

        let mut has_foot_landmark = raw.model.has_foot_landmarks();
        let mut sides = Vec::with_capacity(2);

        for side in BodySide::BOTH {
            let indices = schema.side(side);
            let shoulder = self.required(raw, side, LandmarkJoint::Shoulder, indices.shoulder)?;
            let hip = self.required(raw, side, LandmarkJoint::Hip, indices.hip)?;
            let knee = self.required(raw, side, LandmarkJoint::Knee, indices.knee)?;
            let ankle = self.required(raw, side, LandmarkJoint::Ankle, indices.ankle)?;

            // A weak foot landmark leaves the frame without a foot segment
            // instead of rejecting it.
            let foot = match indices.foot {
                Some(idx) => match self.required(raw, side, LandmarkJoint::Foot, idx) {
                    Ok(point) => point,
                    Err(reason) => {
                        tracing::debug!(
                            %reason,
                            "foot landmark unusable, frame has no foot segment"
                        );
                        has_foot_landmark = false;
                        ankle
                    }
                },
                None => ankle,
            };

            sides.push(SegmentPoints { shoulder, hip, knee, ankle, foot });
        }

        let (mut left, mut right) = (sides[0], sides[1]);
        if !has_foot_landmark {
            left.foot = left.ankle;
            right.foot = right.ankle;
        }

        Ok(CanonicalFrame {
            left,
            right,
            model: raw.model,
            frame_index: raw.frame_index.unwrap_or(fallback_index),
            has_foot_landmark,
        })
    }

    fn required(
        &self,
        raw: &RawPoseFrame,
        side: BodySide,
        joint: LandmarkJoint,
        index: usize,
    ) -> Result<Point2D, FrameRejection> {
        let landmark = raw.landmarks.get(index).ok_or(FrameRejection::MissingLandmark {
            side,
            joint,
            index,
            available: raw.landmarks.len(),
        })?;

        if let Some(score) = landmark.score {
            if !(score >= self.min_confidence) {
                return Err(FrameRejection::LowConfidence {
                    side,
                    joint,
                    score,
                    threshold: self.min_confidence,
                });
            }
        }

        if !landmark.x.is_finite() || !landmark.y.is_finite() {
            return Err(FrameRejection::NonFiniteCoordinate { side, joint });
        }

        let (sx, sy) = raw.frame_size.unwrap_or((1.0, 1.0));
        Ok(Point2D::new(landmark.x * sx, landmark.y * sy))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 17-point frame with plausible standing-pose coordinates.
    pub(crate) fn movenet_frame(score: f64) -> RawPoseFrame {
        let mut landmarks = vec![RawLandmark::new(0.0, 0.0, score); 17];
        landmarks[5] = RawLandmark::new(95.0, 45.0, score);
        landmarks[6] = RawLandmark::new(105.0, 45.0, score);
        landmarks[11] = RawLandmark::new(98.0, 95.0, score);
        landmarks[12] = RawLandmark::new(102.0, 95.0, score);
        landmarks[13] = RawLandmark::new(104.0, 150.0, score);
        landmarks[14] = RawLandmark::new(96.0, 150.0, score);
        landmarks[15] = RawLandmark::new(100.0, 200.0, score);
        landmarks[16] = RawLandmark::new(94.0, 200.0, score);
        RawPoseFrame { model: PoseModel::MoveNet, landmarks, frame_size: None, frame_index: None }
    }

    pub(crate) fn mediapipe_frame(score: f64) -> RawPoseFrame {
        let mut landmarks = vec![RawLandmark::new(0.5, 0.5, score); 33];
        landmarks[11] = RawLandmark::new(0.475, 0.1125, score);
        landmarks[12] = RawLandmark::new(0.525, 0.1125, score);
        landmarks[23] = RawLandmark::new(0.49, 0.2375, score);
        landmarks[24] = RawLandmark::new(0.51, 0.2375, score);
        landmarks[25] = RawLandmark::new(0.52, 0.375, score);
        landmarks[26] = RawLandmark::new(0.48, 0.375, score);
        landmarks[27] = RawLandmark::new(0.50, 0.5, score);
        landmarks[28] = RawLandmark::new(0.47, 0.5, score);
        landmarks[31] = RawLandmark::new(0.54, 0.52, score);
        landmarks[32] = RawLandmark::new(0.51, 0.52, score);
        RawPoseFrame {
            model: PoseModel::MediaPipe,
            landmarks,
            frame_size: Some((200.0, 400.0)),
            frame_index: Some(7),
        }
    }

    #[test]
    fn movenet_frame_uses_ankle_as_foot() {
        let frame = KeypointNormalizer::default().normalize(&movenet_frame(0.9), 3).unwrap();
        assert_eq!(frame.model, PoseModel::MoveNet);
        assert_eq!(frame.frame_index, 3);
        assert!(!frame.has_foot_landmark);
        assert!(frame.left.foot_is_ankle());
        assert!(frame.right.foot_is_ankle());
        assert_eq!(frame.left.shoulder, Point2D::new(95.0, 45.0));
        assert_eq!(frame.right.knee, Point2D::new(96.0, 150.0));
    }

    #[test]
    fn mediapipe_frame_is_scaled_and_keeps_foot() {
        let frame = KeypointNormalizer::default().normalize(&mediapipe_frame(0.9), 0).unwrap();
        assert!(frame.has_foot_landmark);
        assert!(frame.has_true_foot_segments());
        assert_eq!(frame.frame_index, 7);
        assert!((frame.left.shoulder.x - 95.0).abs() < 1e-9);
        assert!((frame.left.shoulder.y - 45.0).abs() < 1e-9);
        assert!((frame.right.foot.x - 102.0).abs() < 1e-9);
    }

    #[test]
    fn low_confidence_required_joint_rejects_frame() {
        let mut raw = movenet_frame(0.9);
        raw.landmarks[13].score = Some(0.1);
        let err = KeypointNormalizer::default().normalize(&raw, 0).unwrap_err();
        assert!(matches!(
            err,
            FrameRejection::LowConfidence { side: BodySide::Left, joint: LandmarkJoint::Knee, .. }
        ));
    }

    #[test]
    fn truncated_landmark_array_rejects_frame() {
        let mut raw = movenet_frame(0.9);
        raw.landmarks.truncate(15);
        let err = KeypointNormalizer::default().normalize(&raw, 0).unwrap_err();
        assert!(matches!(err, FrameRejection::MissingLandmark { index: 15, available: 15, .. }));
    }

    #[test]
    fn missing_score_is_accepted() {
        let mut raw = movenet_frame(0.9);
        for lm in raw.landmarks.iter_mut() {
            lm.score = None;
        }
        assert!(KeypointNormalizer::default().normalize(&raw, 0).is_ok());
    }

    #[test]
    fn nan_coordinate_rejects_frame() {
        let mut raw = movenet_frame(0.9);
        raw.landmarks[6].x = f64::NAN;
        let err = KeypointNormalizer::default().normalize(&raw, 0).unwrap_err();
        assert_eq!(
            err,
            FrameRejection::NonFiniteCoordinate {
                side: BodySide::Right,
                joint: LandmarkJoint::Shoulder
            }
        );
    }

    #[test]
    fn weak_foot_landmark_falls_back_to_surrogate() {
        let mut raw = mediapipe_frame(0.9);
        raw.landmarks[32].score = Some(0.05);
        let frame = KeypointNormalizer::default().normalize(&raw, 0).unwrap();
        assert!(!frame.has_foot_landmark);
        assert!(frame.left.foot_is_ankle());
        assert!(frame.right.foot_is_ankle());
    }

    #[test]
    fn simulated_raw_frames_are_unsupported() {
        let mut raw = movenet_frame(0.9);
        raw.model = PoseModel::Simulated;
        assert_eq!(
            KeypointNormalizer::default().normalize(&raw, 0).unwrap_err(),
            FrameRejection::UnsupportedModel(PoseModel::Simulated)
        );
    }

    #[test]
    fn coincident_foot_defeats_schema_flag() {
        let mut frame = KeypointNormalizer::default().normalize(&mediapipe_frame(0.9), 0).unwrap();
        frame.right.foot = frame.right.ankle;
        assert!(frame.has_foot_landmark);
        assert!(!frame.has_true_foot_segments());
    }
}

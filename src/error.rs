// src/error.rs
use thiserror::Error;

use crate::landmarks::{BodySide, LandmarkJoint, PoseModel};

/// Why a single frame was left out of the analysis. Recoverable: the
/// pipeline drops the frame and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameRejection {
    #[error("{side:?} {joint:?} missing (landmark index {index}, frame has {available})")]
    MissingLandmark {
        side: BodySide,
        joint: LandmarkJoint,
        index: usize,
        available: usize,
    },

    #[error("{side:?} {joint:?} confidence {score:.2} below threshold {threshold:.2}")]
    LowConfidence {
        side: BodySide,
        joint: LandmarkJoint,
        score: f64,
        threshold: f64,
    },

    #[error("{side:?} {joint:?} has non-finite coordinates")]
    NonFiniteCoordinate { side: BodySide, joint: LandmarkJoint },

    #[error("no landmark schema for pose model {0:?}")]
    UnsupportedModel(PoseModel),

    #[error("degenerate {segment} segment (coincident landmarks)")]
    DegenerateGeometry { segment: &'static str },

    #[error("no foot segment in a run measured with the traditional ankle angle")]
    MissingFootSegment,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("sampling rate must be positive, got {0}")]
    InvalidSamplingRate(f64),

    #[error("cutoff {cutoff} Hz must lie in (0, {nyquist}) Hz")]
    InvalidCutoff { cutoff: f64, nyquist: f64 },

    #[error("filter order must be at least 1")]
    InvalidOrder,
}

/// Run-fatal analysis errors.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no analyzable pose data: all {received} frames were rejected")]
    NoAnalyzablePoseData { received: usize, rejected: usize },

    #[error("invalid filter configuration: {0}")]
    InvalidFilter(#[from] FilterError),
}

/// A command-line or config value that names no known variant.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

// src/lib.rs - Gait-cycle biomechanical analysis from 2D body keypoints
pub mod analysis;
pub mod angles;
pub mod data;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod landmarks;
pub mod metrics;
pub mod recommendations;
pub mod simulation;
pub mod zones;

pub use analysis::{
    analyze, analyze_with_rng, AnalysisConfig, AnalysisResult, DataSource, FrameSource,
};
pub use error::{AnalysisError, FilterError, FrameRejection};
pub use landmarks::{CanonicalFrame, PoseModel, RawLandmark, RawPoseFrame};
pub use zones::{CameraAngle, GaitType, Zone, ZoneScore};

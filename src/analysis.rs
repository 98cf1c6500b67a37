// src/analysis.rs - The analysis pipeline: frames in, gait metrics out
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::angles::{AngleExtractor, AngleSeriesSet, AnkleMethod, Joint};
use crate::error::AnalysisError;
use crate::filter::{FilterConfig, NoiseConfig, SignalConditioner};
use crate::landmarks::{
    BodySide, CanonicalFrame, KeypointNormalizer, PoseModel, RawPoseFrame, DEFAULT_MIN_CONFIDENCE,
};
use crate::metrics::{
    gait_grade, Asymmetry, CycleStats, GaitGrade, JointStats, RomVector, SeriesStats,
};
use crate::simulation::{GaitSimulator, SimulationConfig};
use crate::zones::{classify, CameraAngle, GaitType, JointCategory, ZoneScore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Minimum peak prominence in degrees.
    pub prominence: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self { prominence: 4.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub gait_type: GaitType,
    pub camera_angle: CameraAngle,
    /// Capture rate of the frame stream, used for cycle spacing and cadence.
    pub frame_rate: f64,
    pub min_confidence: f64,
    pub noise: NoiseConfig,
    pub filter: FilterConfig,
    pub simulation: SimulationConfig,
    pub cycles: CycleConfig,
    /// Fixes noise and moderate-tier scores when set.
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gait_type: GaitType::Running,
            camera_angle: CameraAngle::Side,
            frame_rate: 30.0,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            noise: NoiseConfig::default(),
            filter: FilterConfig::default(),
            simulation: SimulationConfig::default(),
            cycles: CycleConfig::default(),
            seed: None,
        }
    }
}

impl AnalysisConfig {
    /// Minimum spacing between gait-cycle peaks: half a second of frames.
    pub fn peak_distance(&self) -> usize {
        (self.frame_rate / 2.0).round().max(1.0) as usize
    }
}

/// Where the frames of one run come from.
#[derive(Debug, Clone)]
pub enum FrameSource {
    Keypoints(Vec<RawPoseFrame>),
    Canonical(Vec<CanonicalFrame>),
    Simulate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    PoseEstimation,
    Simulation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub pose_model: PoseModel,
    pub using_tibial_surrogate: bool,
    pub ankle_method: AnkleMethod,
    pub data_source: DataSource,
    pub frame_rate: f64,
    pub frames_received: usize,
    pub frames_analyzed: usize,
    /// Frames that carried no true foot segment on at least one side.
    pub frames_without_foot: usize,
    pub gait_type: GaitType,
    pub camera_angle: CameraAngle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomTableRow {
    pub joint: String,
    pub category: JointCategory,
    pub min_angle: f64,
    pub max_angle: f64,
    pub rom: f64,
    pub zone: ZoneScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Rounded to 0.1 degree.
    pub asymmetry: Asymmetry,
    pub rom_values: RomVector,
    pub joint_stats: JointStats,
    pub angles: AngleSeriesSet,
    pub rom_table: Vec<RomTableRow>,
    pub grade: GaitGrade,
    pub cycles: CycleStats,
    pub cadence_spm: Option<f64>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    pub fn ankle_label(&self) -> &'static str {
        ankle_label(self.metadata.using_tibial_surrogate)
    }
}

fn ankle_label(surrogate: bool) -> &'static str {
    if surrogate {
        "Tibial Inclination"
    } else {
        "Ankle"
    }
}

/// Runs the pipeline with an RNG seeded from `config.seed`, or from entropy.
pub fn analyze(
    source: FrameSource,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    analyze_with_rng(source, config, &mut rng)
}

pub fn analyze_with_rng<R: Rng + ?Sized>(
    source: FrameSource,
    config: &AnalysisConfig,
    rng: &mut R,
) -> Result<AnalysisResult, AnalysisError> {
    let conditioner = SignalConditioner::new(config.noise.clone(), config.filter.clone())?;
    if (config.filter.sampling_hz - config.frame_rate).abs() > f64::EPSILON {
        tracing::warn!(
            frame_rate = config.frame_rate,
            sampling_hz = config.filter.sampling_hz,
            "filter sampling rate differs from frame rate"
        );
    }

    let (frames, received, mut rejected, data_source) = resolve_frames(source, config);
    tracing::info!(
        frames = received,
        source = ?data_source,
        gait = %config.gait_type,
        camera = %config.camera_angle,
        "starting gait analysis"
    );

    let frames_without_foot = frames.iter().filter(|f| !f.has_true_foot_segments()).count();
    let mut extractor = AngleExtractor::for_run(&frames);
    let ankle_method = extractor.ankle_method();
    let using_tibial_surrogate = extractor.using_tibial_surrogate();
    if using_tibial_surrogate {
        tracing::warn!(
            frames_without_foot,
            "no usable foot landmarks, ankle reported as tibial inclination"
        );
    } else if frames_without_foot > 0 {
        tracing::warn!(
            frames_without_foot,
            "frames without foot landmarks dropped from a traditional ankle run"
        );
    }

    let mut pose_model = None;
    for frame in &frames {
        match extractor.push_frame(frame) {
            Ok(_) => {
                pose_model.get_or_insert(frame.model);
            }
            Err(reason) => {
                tracing::debug!(frame = frame.frame_index, %reason, "dropping frame");
                rejected += 1;
            }
        }
    }
    drop(frames);

    let analyzed = extractor.frames();
    let pose_model = match pose_model {
        Some(model) if analyzed > 0 => model,
        _ => return Err(AnalysisError::NoAnalyzablePoseData { received, rejected }),
    };
    if rejected > 0 {
        tracing::warn!(rejected, received, "frames dropped from analysis");
    }

    let raw = extractor.finish();
    let simulated = data_source == DataSource::Simulation;
    let mut angles = AngleSeriesSet::default();
    for side in BodySide::BOTH {
        for joint in Joint::ALL {
            *angles.side_mut(side).get_mut(joint) =
                conditioner.condition(raw.side(side).get(joint), simulated, rng);
        }
    }

    let joint_stats = JointStats::from_series(&angles)
        .ok_or(AnalysisError::NoAnalyzablePoseData { received, rejected })?;
    let rom_values = RomVector::from_stats(&joint_stats);
    let asymmetry = Asymmetry::from_rom(&rom_values);
    let grade = gait_grade(&joint_stats, asymmetry.total_magnitude);
    let cycles = CycleStats::from_series(&angles, config.cycles.prominence, config.peak_distance());
    let cadence_spm = cycles.cadence(analyzed, config.frame_rate);

    let rom_table = build_rom_table(&joint_stats, using_tibial_surrogate, config, rng);

    tracing::info!(
        frames = analyzed,
        model = ?pose_model,
        %grade,
        asymmetry = asymmetry.cumulative,
        "gait analysis complete"
    );

    Ok(AnalysisResult {
        asymmetry: asymmetry.rounded(),
        rom_values,
        joint_stats,
        angles,
        rom_table,
        grade,
        cycles,
        cadence_spm,
        metadata: AnalysisMetadata {
            pose_model,
            using_tibial_surrogate,
            ankle_method,
            data_source,
            frame_rate: config.frame_rate,
            frames_received: received,
            frames_analyzed: analyzed,
            frames_without_foot,
            gait_type: config.gait_type,
            camera_angle: config.camera_angle,
        },
    })
}

/// Canonical frames for the run, with the received count, normalizer
/// rejections and the data source.
fn resolve_frames(
    source: FrameSource,
    config: &AnalysisConfig,
) -> (Vec<CanonicalFrame>, usize, usize, DataSource) {
    match source {
        FrameSource::Keypoints(raw) => {
            let normalizer = KeypointNormalizer::new(config.min_confidence);
            let received = raw.len();
            let mut rejected = 0;
            let mut frames = Vec::with_capacity(received);
            for (i, raw_frame) in raw.iter().enumerate() {
                match normalizer.normalize(raw_frame, i) {
                    Ok(frame) => frames.push(frame),
                    Err(reason) => {
                        tracing::debug!(frame = i, %reason, "dropping frame");
                        rejected += 1;
                    }
                }
            }
            (frames, received, rejected, DataSource::PoseEstimation)
        }
        FrameSource::Canonical(frames) => {
            let simulated =
                !frames.is_empty() && frames.iter().all(|f| f.model == PoseModel::Simulated);
            let source = if simulated {
                DataSource::Simulation
            } else {
                DataSource::PoseEstimation
            };
            let received = frames.len();
            (frames, received, 0, source)
        }
        FrameSource::Simulate => {
            let frames = GaitSimulator::new(config.gait_type, &config.simulation).generate();
            let received = frames.len();
            (frames, received, 0, DataSource::Simulation)
        }
    }
}

fn build_rom_table<R: Rng + ?Sized>(
    stats: &JointStats,
    surrogate: bool,
    config: &AnalysisConfig,
    rng: &mut R,
) -> Vec<RomTableRow> {
    let ankle = ankle_label(surrogate);
    let rows: [(String, &SeriesStats); 7] = [
        ("Trunk Spine".to_string(), &stats.left.spine),
        ("Left Hip".to_string(), &stats.left.hip),
        ("Right Hip".to_string(), &stats.right.hip),
        ("Left Knee".to_string(), &stats.left.knee),
        ("Right Knee".to_string(), &stats.right.knee),
        (format!("Left {}", ankle), &stats.left.ankle),
        (format!("Right {}", ankle), &stats.right.ankle),
    ];

    rows.into_iter()
        .map(|(joint, s)| {
            let zone = classify(&joint, s.rom, config.gait_type, config.camera_angle, rng);
            RomTableRow {
                category: JointCategory::from_label(&joint),
                joint,
                min_angle: s.min,
                max_angle: s.max,
                rom: s.rom,
                zone,
            }
        })
        .collect()
}

// src/data.rs - CSV/JSON export of analysis results and keypoint/config loading
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::analysis::{AnalysisConfig, AnalysisResult};
use crate::landmarks::RawPoseFrame;
use crate::recommendations::Recommendations;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Serialize)]
struct RomTableRecord<'a> {
    joint: &'a str,
    min_angle: f64,
    max_angle: f64,
    rom: f64,
    zone: String,
    score: u8,
}

/// Everything written to the session JSON file.
#[derive(Debug, Serialize)]
struct SessionReport<'a> {
    session: &'a str,
    analysis: &'a AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendations: Option<&'a Recommendations>,
}

pub struct DataExporter {
    output_dir: PathBuf,
    session_name: String,
}

impl DataExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    fn create_file(&self, name: &str) -> Result<(PathBuf, File)> {
        let dir = self.session_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating session directory {}", dir.display()))?;
        let path = dir.join(name);
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        Ok((path, file))
    }

    /// Per-frame angle trajectories, frames numbered from 1.
    pub fn export_angles_csv(&self, result: &AnalysisResult) -> Result<PathBuf> {
        let (csv_path, file) = self.create_file("joint_angles.csv")?;
        let mut writer = Writer::from_writer(file);

        let (left_ankle, right_ankle) = if result.metadata.using_tibial_surrogate {
            ("left_tibial_inclination", "right_tibial_inclination")
        } else {
            ("left_ankle", "right_ankle")
        };
        writer.write_record([
            "frame",
            left_ankle,
            right_ankle,
            "left_knee",
            "right_knee",
            "left_hip",
            "right_hip",
            "spine",
        ])?;

        let (l, r) = (&result.angles.left, &result.angles.right);
        for i in 0..result.angles.frame_count() {
            let values = [
                l.ankle[i], r.ankle[i], l.knee[i], r.knee[i], l.hip[i], r.hip[i], l.spine[i],
            ];
            let mut record = vec![(i + 1).to_string()];
            record.extend(values.iter().map(|v| format!("{:.2}", v)));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(csv_path)
    }

    pub fn export_rom_table_csv(&self, result: &AnalysisResult) -> Result<PathBuf> {
        let (csv_path, file) = self.create_file("rom_table.csv")?;
        let mut writer = Writer::from_writer(file);

        for row in &result.rom_table {
            writer.serialize(RomTableRecord {
                joint: &row.joint,
                min_angle: round2(row.min_angle),
                max_angle: round2(row.max_angle),
                rom: round2(row.rom),
                zone: row.zone.zone.to_string(),
                score: row.zone.score,
            })?;
        }

        writer.flush()?;
        Ok(csv_path)
    }

    pub fn export_json(
        &self,
        result: &AnalysisResult,
        recommendations: Option<&Recommendations>,
    ) -> Result<PathBuf> {
        let (json_path, file) = self.create_file("analysis.json")?;
        let report = SessionReport {
            session: &self.session_name,
            analysis: result,
            recommendations,
        };
        serde_json::to_writer_pretty(file, &report)
            .with_context(|| format!("writing {}", json_path.display()))?;
        Ok(json_path)
    }

    /// Writes every export for one session.
    pub fn export_all(
        &self,
        result: &AnalysisResult,
        recommendations: Option<&Recommendations>,
    ) -> Result<Vec<PathBuf>> {
        Ok(vec![
            self.export_angles_csv(result)?,
            self.export_rom_table_csv(result)?,
            self.export_json(result, recommendations)?,
        ])
    }
}

/// Reads a JSON array of raw pose frames.
pub fn load_keypoint_frames(path: impl AsRef<Path>) -> Result<Vec<RawPoseFrame>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading keypoints from {}", path.display()))?;
    let frames: Vec<RawPoseFrame> = serde_json::from_str(&text)
        .with_context(|| format!("parsing keypoints in {}", path.display()))?;
    tracing::debug!(frames = frames.len(), path = %path.display(), "loaded keypoint frames");
    Ok(frames)
}

/// Reads an analysis config; omitted fields keep their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<AnalysisConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config in {}", path.display()))
}

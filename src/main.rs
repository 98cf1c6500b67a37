// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use directories::UserDirs;
use std::path::PathBuf;

use stride_sync::analysis::{analyze, AnalysisConfig, AnalysisResult, FrameSource};
use stride_sync::data::{load_config, load_keypoint_frames, DataExporter};
use stride_sync::recommendations::{recommend, Recommendations};
use stride_sync::zones::{CameraAngle, GaitType};

#[derive(Parser, Debug)]
#[command(author, version, about = "Gait-cycle analysis from 2D body keypoints")]
struct Cli {
    /// JSON array of pose frames; a simulated cycle is analyzed when omitted
    #[arg(long)]
    keypoints: Option<PathBuf>,

    /// running | walking
    #[arg(long)]
    gait: Option<GaitType>,

    /// side | back
    #[arg(long)]
    camera: Option<CameraAngle>,

    /// Analysis config (JSON); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write CSV and JSON files for this session
    #[arg(long)]
    export: bool,

    /// Print the full result as JSON instead of the summary
    #[arg(long)]
    json: bool,
}

fn default_output_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|d| d.join("StrideSync")))
        .unwrap_or_else(|| PathBuf::from("output"))
}

fn build_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(gait) = cli.gait {
        config.gait_type = gait;
    }
    if let Some(camera) = cli.camera {
        config.camera_angle = camera;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

fn print_summary(result: &AnalysisResult, recs: &Recommendations) {
    let meta = &result.metadata;
    println!(
        "Gait analysis ({} / {} camera, {:?}, {:?})",
        meta.gait_type, meta.camera_angle, meta.data_source, meta.pose_model
    );
    println!(
        "Frames: {} analyzed of {} received",
        meta.frames_analyzed, meta.frames_received
    );
    println!("Ankle method: {}", meta.ankle_method.description());
    println!("Grade: {}", result.grade);
    println!(
        "Asymmetry (R-L): hip {:+.1}°, knee {:+.1}°, {} {:+.1}°, cumulative {:+.1}°",
        result.asymmetry.hip,
        result.asymmetry.knee,
        result.ankle_label().to_lowercase(),
        result.asymmetry.ankle,
        result.asymmetry.cumulative
    );
    match result.cadence_spm {
        Some(cadence) => println!("Cadence: {:.0} steps/min", cadence),
        None => println!("Cadence: not enough gait cycles"),
    }

    println!();
    println!(
        "{:<26} {:>8} {:>8} {:>8}  {:<11} {:>5}",
        "Joint", "Min", "Max", "ROM", "Zone", "Score"
    );
    for row in &result.rom_table {
        println!(
            "{:<26} {:>8.1} {:>8.1} {:>8.1}  {:<11} {:>5}",
            row.joint,
            row.min_angle,
            row.max_angle,
            row.rom,
            row.zone.zone.to_string(),
            row.zone.score
        );
    }

    println!();
    if let Some(issue) = &recs.primary_issue {
        println!("Primary focus: {}", issue);
    }
    for (kind, tip) in [
        ("Footwear", &recs.footwear),
        ("Drill", &recs.drill),
        ("Cue", &recs.cue),
        ("Training", &recs.training),
    ] {
        println!("{:<9} {}: {}", kind, tip.title, tip.explanation);
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let source = match &cli.keypoints {
        Some(path) => FrameSource::Keypoints(load_keypoint_frames(path)?),
        None => FrameSource::Simulate,
    };

    let result = analyze(source, &config).context("gait analysis failed")?;
    let recs = recommend(&result);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result, &recs);
    }

    if cli.export {
        let output_dir = cli.output_dir.clone().unwrap_or_else(default_output_dir);
        let exporter = DataExporter::new(&output_dir, None);
        for path in exporter.export_all(&result, Some(&recs))? {
            tracing::info!(path = %path.display(), "exported");
            eprintln!("Wrote {}", path.display());
        }
    }

    Ok(())
}

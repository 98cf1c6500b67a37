// src/recommendations.rs - Personalized footwear, drill, cue and training tips
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, RomTableRow};
use crate::zones::{GaitType, JointCategory};

/// Asymmetry magnitude, in degrees, above which the cue targets balance.
pub const ASYMMETRY_CUE_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    pub title: String,
    pub explanation: String,
}

impl Tip {
    fn new(title: &str, explanation: impl Into<String>) -> Self {
        Self { title: title.to_string(), explanation: explanation.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    /// Joint whose zone score is lowest, if any scored below 100.
    pub primary_issue: Option<String>,
    pub footwear: Tip,
    pub drill: Tip,
    pub cue: Tip,
    pub training: Tip,
}

/// Lowest-scoring ROM row. The first row wins ties; perfect rows are not issues.
pub fn primary_issue(rows: &[RomTableRow]) -> Option<&RomTableRow> {
    rows.iter()
        .filter(|row| row.zone.score < 100)
        .fold(None, |worst: Option<&RomTableRow>, row| match worst {
            Some(w) if w.zone.score <= row.zone.score => Some(w),
            _ => Some(row),
        })
}

pub fn recommend(result: &AnalysisResult) -> Recommendations {
    let issue = primary_issue(&result.rom_table);
    let category = issue.map(|row| row.category);
    let gait = result.metadata.gait_type;
    let magnitude = result.asymmetry.total_magnitude;

    Recommendations {
        primary_issue: issue.map(|row| row.joint.clone()),
        footwear: footwear(category, gait),
        drill: drill(category),
        cue: cue(category, magnitude),
        training: training(category, result.grade.letter()),
    }
}

fn footwear(category: Option<JointCategory>, gait: GaitType) -> Tip {
    match (category, gait) {
        (Some(JointCategory::Ankle | JointCategory::Tibial), GaitType::Running) => Tip::new(
            "Motion Control Shoes",
            "Your lower-leg angle pattern points to excess foot motion; a stability shoe will help contain it.",
        ),
        (Some(JointCategory::Ankle | JointCategory::Tibial), GaitType::Walking) => Tip::new(
            "Stability Walking Shoes",
            "A structured shoe keeps the lower limb aligned through stance.",
        ),
        (Some(JointCategory::Knee), _) => Tip::new(
            "Cushioned Neutral Shoes",
            "More cushioning lowers the impact load on the knee at ground contact.",
        ),
        (Some(JointCategory::Hip), _) => Tip::new(
            "Minimalist / Low Drop",
            "A lower heel-to-toe drop encourages fuller hip extension.",
        ),
        (Some(JointCategory::Spine), _) => Tip::new(
            "Structured Support",
            "A firm midsole helps you hold posture through the whole cycle.",
        ),
        (None, _) => Tip::new(
            "Neutral Running Shoes",
            "Balanced cushioning and support suit your current pattern.",
        ),
    }
}

fn drill(category: Option<JointCategory>) -> Tip {
    match category {
        Some(JointCategory::Hip) => Tip::new(
            "Hip Flexor Stretches",
            "Hip extension is limited. Stretch the hip flexors daily to lengthen your stride.",
        ),
        Some(JointCategory::Knee) => Tip::new(
            "Single-Leg Squats",
            "Controlled single-leg work builds quadriceps strength and knee stability.",
        ),
        Some(JointCategory::Ankle | JointCategory::Tibial) => Tip::new(
            "Calf Raises + Mobility",
            "Pair calf strength with ankle mobility work to improve push-off.",
        ),
        Some(JointCategory::Spine) => Tip::new(
            "Core Stabilization",
            "Planks and dead bugs improve trunk control and reduce excess forward lean.",
        ),
        None => Tip::new(
            "High Knees",
            "Dynamic high knees keep coordination and joint mobility sharp.",
        ),
    }
}

fn cue(category: Option<JointCategory>, asymmetry_magnitude: f64) -> Tip {
    if asymmetry_magnitude > ASYMMETRY_CUE_THRESHOLD {
        return Tip::new(
            "Equal Push-Off",
            format!(
                "A {:.1}° left/right difference suggests one leg is doing more work. Push off evenly with both.",
                asymmetry_magnitude
            ),
        );
    }
    match category {
        Some(JointCategory::Spine) => Tip::new(
            "Tall Posture",
            "Run tall, as if a string were pulling the top of your head upward.",
        ),
        Some(JointCategory::Hip) => Tip::new(
            "Drive Knees Forward",
            "Lift the knees forward and up rather than kicking the feet back.",
        ),
        Some(JointCategory::Knee) => Tip::new(
            "Light Foot Strike",
            "Land softly beneath your center of mass to ease the load on your knees.",
        ),
        Some(JointCategory::Ankle | JointCategory::Tibial) => Tip::new(
            "Quick Cadence",
            "Raise your step rate by 5-10% to shorten ground contact.",
        ),
        None => Tip::new(
            "Relaxed Shoulders",
            "Keep the shoulders loose and let the arms swing naturally.",
        ),
    }
}

fn training(category: Option<JointCategory>, grade_letter: char) -> Tip {
    match (grade_letter, category) {
        ('A', _) => Tip::new(
            "Speed Development",
            "Your mechanics are excellent. Shift the focus to speed and race-specific sessions.",
        ),
        ('B', _) => Tip::new(
            "Endurance Base",
            "Mechanics are solid. Build aerobic base with consistent easy-pace mileage.",
        ),
        (_, Some(JointCategory::Hip)) => Tip::new(
            "Hip Strengthening",
            "Work glute medius and hip flexor strength three times a week for 4-6 weeks.",
        ),
        (_, Some(JointCategory::Knee)) => Tip::new(
            "Quad + Hamstring",
            "Balance knee stability with targeted quadriceps and hamstring strength work.",
        ),
        (_, Some(JointCategory::Spine)) => Tip::new(
            "Core Stability",
            "Add 15 minutes of core work four times a week to improve trunk control.",
        ),
        _ => Tip::new(
            "Movement Quality",
            "Spend time on drills and technique before adding training volume.",
        ),
    }
}

// src/zones.rs - Reference ranges and performance-zone classification
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaitType {
    #[default]
    Running,
    Walking,
}

impl fmt::Display for GaitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GaitType::Running => "running",
            GaitType::Walking => "walking",
        })
    }
}

impl FromStr for GaitType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" | "run" => Ok(GaitType::Running),
            "walking" | "walk" => Ok(GaitType::Walking),
            _ => Err(UnknownVariant {
                kind: "gait type",
                value: s.to_string(),
                expected: "running, walking",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraAngle {
    #[default]
    Side,
    Back,
}

impl fmt::Display for CameraAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CameraAngle::Side => "side",
            CameraAngle::Back => "back",
        })
    }
}

impl FromStr for CameraAngle {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "side" => Ok(CameraAngle::Side),
            "back" | "rear" => Ok(CameraAngle::Back),
            _ => Err(UnknownVariant {
                kind: "camera angle",
                value: s.to_string(),
                expected: "side, back",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointCategory {
    Spine,
    Hip,
    Knee,
    Ankle,
    Tibial,
}

impl JointCategory {
    /// Category for a ROM-table label such as "Left Hip" or
    /// "Right Tibial Inclination". Unknown labels use the knee ranges.
    pub fn from_label(label: &str) -> Self {
        if label.contains("Tibial") {
            return JointCategory::Tibial;
        }
        if label.contains("Ankle") {
            return JointCategory::Ankle;
        }

        let lower = label.to_lowercase();
        let stripped = ["left ", "right ", "trunk "]
            .iter()
            .find_map(|prefix| lower.strip_prefix(prefix))
            .unwrap_or(&lower);

        match stripped.split_whitespace().next() {
            Some("spine") => JointCategory::Spine,
            Some("hip") => JointCategory::Hip,
            Some("knee") => JointCategory::Knee,
            _ => {
                tracing::debug!(label, "no reference category for label, using knee ranges");
                JointCategory::Knee
            }
        }
    }
}

/// Inclusive ROM interval in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RomRange {
    pub lo: f64,
    pub hi: f64,
}

impl RomRange {
    const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn distance_to(&self, v: f64) -> f64 {
        (v - self.lo).abs().min((v - self.hi).abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub good: RomRange,
    pub moderate: RomRange,
    pub optimal: f64,
}

impl ReferenceRange {
    const fn new(good: (f64, f64), moderate: (f64, f64), optimal: f64) -> Self {
        Self {
            good: RomRange::new(good.0, good.1),
            moderate: RomRange::new(moderate.0, moderate.1),
            optimal,
        }
    }
}

type TableKey = (CameraAngle, GaitType, JointCategory);

static REFERENCE_TABLE: Lazy<HashMap<TableKey, ReferenceRange>> = Lazy::new(|| {
    use CameraAngle::*;
    use GaitType::*;

    // (spine, hip, knee, ankle); tibial shares the ankle ranges
    let rows: [(CameraAngle, GaitType, [ReferenceRange; 4]); 4] = [
        (
            Side,
            Running,
            [
                ReferenceRange::new((5.0, 15.0), (0.0, 5.0), 10.0),
                ReferenceRange::new((60.0, 70.0), (50.0, 60.0), 65.0),
                ReferenceRange::new((120.0, 130.0), (110.0, 120.0), 125.0),
                ReferenceRange::new((65.0, 75.0), (55.0, 65.0), 70.0),
            ],
        ),
        (
            Side,
            Walking,
            [
                ReferenceRange::new((0.0, 5.0), (5.0, 10.0), 2.5),
                ReferenceRange::new((25.0, 45.0), (15.0, 25.0), 35.0),
                ReferenceRange::new((50.0, 70.0), (40.0, 50.0), 60.0),
                ReferenceRange::new((20.0, 45.0), (15.0, 20.0), 32.5),
            ],
        ),
        (
            Back,
            Running,
            [
                ReferenceRange::new((1.0, 10.0), (0.0, 1.0), 5.5),
                ReferenceRange::new((0.0, 10.0), (10.0, 20.0), 7.5),
                ReferenceRange::new((0.0, 5.0), (5.0, 10.0), 2.5),
                ReferenceRange::new((20.0, 50.0), (10.0, 20.0), 35.0),
            ],
        ),
        (
            Back,
            Walking,
            [
                ReferenceRange::new((0.0, 5.0), (5.0, 10.0), 2.5),
                ReferenceRange::new((0.0, 10.0), (10.0, 20.0), 7.5),
                ReferenceRange::new((0.0, 5.0), (5.0, 10.0), 2.5),
                ReferenceRange::new((20.0, 50.0), (10.0, 20.0), 35.0),
            ],
        ),
    ];

    let mut table = HashMap::new();
    for (camera, gait, [spine, hip, knee, ankle]) in rows {
        table.insert((camera, gait, JointCategory::Spine), spine);
        table.insert((camera, gait, JointCategory::Hip), hip);
        table.insert((camera, gait, JointCategory::Knee), knee);
        table.insert((camera, gait, JointCategory::Ankle), ankle);
        table.insert((camera, gait, JointCategory::Tibial), ankle);
    }
    table
});

pub fn reference_range(
    camera: CameraAngle,
    gait: GaitType,
    category: JointCategory,
) -> ReferenceRange {
    // every key combination is populated above
    REFERENCE_TABLE[&(camera, gait, category)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    Elite,
    Optimal,
    Good,
    Fair,
    #[serde(rename = "Needs Work")]
    NeedsWork,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Zone::Elite => "Elite",
            Zone::Optimal => "Optimal",
            Zone::Good => "Good",
            Zone::Fair => "Fair",
            Zone::NeedsWork => "Needs Work",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneScore {
    pub zone: Zone,
    /// 0..=100
    pub score: u8,
}

fn to_score(raw: f64) -> u8 {
    raw.round().clamp(0.0, 100.0) as u8
}

/// Places one ROM value in a performance zone. Only the moderate tier
/// draws from `rng`.
pub fn classify<R: Rng + ?Sized>(
    label: &str,
    rom: f64,
    gait: GaitType,
    camera: CameraAngle,
    rng: &mut R,
) -> ZoneScore {
    let range = reference_range(camera, gait, JointCategory::from_label(label));
    classify_against(&range, rom, rng)
}

pub fn classify_against<R: Rng + ?Sized>(
    range: &ReferenceRange,
    rom: f64,
    rng: &mut R,
) -> ZoneScore {
    let good = range.good;

    if good.contains(rom) {
        let half_width = good.width() / 2.0;
        let raw = if half_width > 0.0 {
            100.0 - (rom - range.optimal).abs() / half_width * 20.0
        } else {
            100.0
        };
        let raw = raw.clamp(80.0, 100.0);
        let zone = if raw >= 95.0 { Zone::Elite } else { Zone::Optimal };
        return ZoneScore { zone, score: to_score(raw) };
    }

    if range.moderate.contains(rom) {
        return ZoneScore { zone: Zone::Good, score: rng.gen_range(60..75) };
    }

    let d = good.distance_to(rom);
    let raw = (60.0 - d / good.hi.max(100.0) * 60.0).max(0.0);
    let zone = if raw >= 30.0 { Zone::Fair } else { Zone::NeedsWork };
    ZoneScore { zone, score: to_score(raw) }
}

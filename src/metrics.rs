// src/metrics.rs - Range of motion, asymmetry, grade and gait-cycle statistics
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::angles::{AngleSeriesSet, Joint, JointAngleSeries};
use crate::landmarks::BodySide;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub rom: f64,
}

impl SeriesStats {
    /// `None` for an empty series.
    pub fn from_series(series: &[f64]) -> Option<Self> {
        if series.is_empty() {
            return None;
        }
        let min = series.iter().copied().fold(f64::INFINITY, f64::min);
        let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = series.iter().sum::<f64>() / series.len() as f64;
        Some(Self { min, max, avg, rom: max - min })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    pub spine: SeriesStats,
    pub hip: SeriesStats,
    pub knee: SeriesStats,
    pub ankle: SeriesStats,
}

impl SideStats {
    pub fn from_series(series: &JointAngleSeries) -> Option<Self> {
        Some(Self {
            spine: SeriesStats::from_series(&series.spine)?,
            hip: SeriesStats::from_series(&series.hip)?,
            knee: SeriesStats::from_series(&series.knee)?,
            ankle: SeriesStats::from_series(&series.ankle)?,
        })
    }

    pub fn get(&self, joint: Joint) -> &SeriesStats {
        match joint {
            Joint::Spine => &self.spine,
            Joint::Hip => &self.hip,
            Joint::Knee => &self.knee,
            Joint::Ankle => &self.ankle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointStats {
    pub left: SideStats,
    pub right: SideStats,
}

impl JointStats {
    pub fn from_series(series: &AngleSeriesSet) -> Option<Self> {
        Some(Self {
            left: SideStats::from_series(&series.left)?,
            right: SideStats::from_series(&series.right)?,
        })
    }

    pub fn side(&self, side: BodySide) -> &SideStats {
        match side {
            BodySide::Left => &self.left,
            BodySide::Right => &self.right,
        }
    }
}

/// The seven ROM values in the fixed export order. Serializes as a plain
/// array; reordering it breaks every downstream reader.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 7]")]
pub struct RomVector {
    pub right_knee: f64,
    pub right_hip: f64,
    pub spine: f64,
    pub left_hip: f64,
    pub left_knee: f64,
    pub left_ankle: f64,
    pub right_ankle: f64,
}

impl RomVector {
    pub const LABELS: [&'static str; 7] = [
        "Right Knee",
        "Right Hip",
        "Spine",
        "Left Hip",
        "Left Knee",
        "Left Ankle",
        "Right Ankle",
    ];

    /// Spine ROM comes from the left series; both sides carry the same spine signal.
    pub fn from_stats(stats: &JointStats) -> Self {
        Self {
            right_knee: stats.right.knee.rom,
            right_hip: stats.right.hip.rom,
            spine: stats.left.spine.rom,
            left_hip: stats.left.hip.rom,
            left_knee: stats.left.knee.rom,
            left_ankle: stats.left.ankle.rom,
            right_ankle: stats.right.ankle.rom,
        }
    }

    pub fn to_array(&self) -> [f64; 7] {
        [
            self.right_knee,
            self.right_hip,
            self.spine,
            self.left_hip,
            self.left_knee,
            self.left_ankle,
            self.right_ankle,
        ]
    }

    pub fn side(&self, side: BodySide, joint: Joint) -> f64 {
        match (side, joint) {
            (_, Joint::Spine) => self.spine,
            (BodySide::Left, Joint::Hip) => self.left_hip,
            (BodySide::Left, Joint::Knee) => self.left_knee,
            (BodySide::Left, Joint::Ankle) => self.left_ankle,
            (BodySide::Right, Joint::Hip) => self.right_hip,
            (BodySide::Right, Joint::Knee) => self.right_knee,
            (BodySide::Right, Joint::Ankle) => self.right_ankle,
        }
    }
}

impl From<[f64; 7]> for RomVector {
    fn from(v: [f64; 7]) -> Self {
        Self {
            right_knee: v[0],
            right_hip: v[1],
            spine: v[2],
            left_hip: v[3],
            left_knee: v[4],
            left_ankle: v[5],
            right_ankle: v[6],
        }
    }
}

impl Serialize for RomVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Signed right-minus-left ROM differences. Positive values mean the right
/// side moves more.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Asymmetry {
    pub hip: f64,
    pub knee: f64,
    pub ankle: f64,
    /// Sum of the signed components.
    pub cumulative: f64,
    /// Sum of the absolute components.
    pub total_magnitude: f64,
}

impl Asymmetry {
    /// Exact, unrounded values.
    pub fn from_rom(rom: &RomVector) -> Self {
        let hip = rom.right_hip - rom.left_hip;
        let knee = rom.right_knee - rom.left_knee;
        let ankle = rom.right_ankle - rom.left_ankle;
        Self {
            hip,
            knee,
            ankle,
            cumulative: hip + knee + ankle,
            total_magnitude: hip.abs() + knee.abs() + ankle.abs(),
        }
    }

    /// Values for reporting, rounded to one decimal.
    pub fn rounded(&self) -> Self {
        Self {
            hip: round1(self.hip),
            knee: round1(self.knee),
            ankle: round1(self.ankle),
            cumulative: round1(self.cumulative),
            total_magnitude: round1(self.total_magnitude),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GaitGrade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    C,
    D,
}

impl GaitGrade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 95.0 => GaitGrade::APlus,
            s if s >= 90.0 => GaitGrade::A,
            s if s >= 87.0 => GaitGrade::AMinus,
            s if s >= 83.0 => GaitGrade::BPlus,
            s if s >= 80.0 => GaitGrade::B,
            s if s >= 77.0 => GaitGrade::BMinus,
            s if s >= 73.0 => GaitGrade::CPlus,
            s if s >= 70.0 => GaitGrade::C,
            _ => GaitGrade::D,
        }
    }

    /// The letter without modifier.
    pub fn letter(&self) -> char {
        match self {
            GaitGrade::APlus | GaitGrade::A | GaitGrade::AMinus => 'A',
            GaitGrade::BPlus | GaitGrade::B | GaitGrade::BMinus => 'B',
            GaitGrade::CPlus | GaitGrade::C => 'C',
            GaitGrade::D => 'D',
        }
    }
}

impl fmt::Display for GaitGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GaitGrade::APlus => "A+",
            GaitGrade::A => "A",
            GaitGrade::AMinus => "A-",
            GaitGrade::BPlus => "B+",
            GaitGrade::B => "B",
            GaitGrade::BMinus => "B-",
            GaitGrade::CPlus => "C+",
            GaitGrade::C => "C",
            GaitGrade::D => "D",
        };
        f.write_str(s)
    }
}

/// Whole-body ROM targets used by the grade.
const GRADE_TARGET_ROM: [(Joint, f64); 4] = [
    (Joint::Knee, 65.0),
    (Joint::Hip, 45.0),
    (Joint::Ankle, 30.0),
    (Joint::Spine, 8.0),
];

/// Score out of 100 before letter conversion: asymmetry costs 2 points per
/// degree, each degree of deviation from the target ROM costs half a point.
pub fn grade_score(stats: &JointStats, asymmetry_magnitude: f64) -> f64 {
    let mut score = 100.0 - asymmetry_magnitude * 2.0;
    for (joint, target) in GRADE_TARGET_ROM {
        let left_dev = (stats.left.get(joint).rom - target).abs();
        let right_dev = (stats.right.get(joint).rom - target).abs();
        score -= (left_dev + right_dev) * 0.5;
    }
    score
}

pub fn gait_grade(stats: &JointStats, asymmetry_magnitude: f64) -> GaitGrade {
    GaitGrade::from_score(grade_score(stats, asymmetry_magnitude))
}

/// Indices of local maxima whose prominence is at least `min_prominence`,
/// keeping only the tallest of any peaks closer than `min_distance` samples.
pub fn find_peaks(data: &[f64], min_prominence: f64, min_distance: usize) -> Vec<usize> {
    let n = data.len();
    if n < 3 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    let mut i = 1;
    while i < n - 1 {
        if data[i] > data[i - 1] {
            // walk across a flat top; the peak sits at its middle
            let mut j = i;
            while j + 1 < n && data[j + 1] == data[i] {
                j += 1;
            }
            if j + 1 < n && data[j + 1] < data[i] {
                candidates.push((i + j) / 2);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }

    let candidates: Vec<usize> = candidates
        .into_iter()
        .filter(|&p| prominence(data, p) >= min_prominence)
        .collect();

    if min_distance <= 1 {
        return candidates;
    }

    let mut by_height = candidates.clone();
    by_height.sort_by(|&a, &b| data[b].total_cmp(&data[a]));
    let mut kept: Vec<usize> = Vec::new();
    for p in by_height {
        if kept.iter().all(|&k| k.abs_diff(p) >= min_distance) {
            kept.push(p);
        }
    }
    kept.sort_unstable();
    kept
}

/// Local minima, found as peaks of the negated signal.
pub fn find_valleys(data: &[f64], min_prominence: f64, min_distance: usize) -> Vec<usize> {
    let negated: Vec<f64> = data.iter().map(|v| -v).collect();
    find_peaks(&negated, min_prominence, min_distance)
}

/// Height of a peak above the higher of its two bases. Each base is the
/// lowest point before the signal climbs above the peak on that side.
fn prominence(data: &[f64], peak: usize) -> f64 {
    let height = data[peak];

    let mut left_min = height;
    for &v in data[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &data[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

/// Peak/valley statistics for one angle series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub peaks: Vec<usize>,
    pub valleys: Vec<usize>,
    pub peak_mean: Option<f64>,
    pub peak_std: Option<f64>,
    pub valley_mean: Option<f64>,
    pub valley_std: Option<f64>,
    /// Mean peak minus mean valley; a per-cycle ROM less sensitive to one outlier.
    pub cycle_rom: Option<f64>,
}

impl CycleSummary {
    pub fn from_series(series: &[f64], min_prominence: f64, min_distance: usize) -> Self {
        let peaks = find_peaks(series, min_prominence, min_distance);
        let valleys = find_valleys(series, min_prominence, min_distance);
        let peak_values: Vec<f64> = peaks.iter().map(|&i| series[i]).collect();
        let valley_values: Vec<f64> = valleys.iter().map(|&i| series[i]).collect();
        let peak_ms = mean_and_std(&peak_values);
        let valley_ms = mean_and_std(&valley_values);

        Self {
            peak_mean: peak_ms.map(|(m, _)| m),
            peak_std: peak_ms.map(|(_, s)| s),
            valley_mean: valley_ms.map(|(m, _)| m),
            valley_std: valley_ms.map(|(_, s)| s),
            cycle_rom: match (peak_ms, valley_ms) {
                (Some((p, _)), Some((v, _))) => Some(p - v),
                _ => None,
            },
            peaks,
            valleys,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideCycles {
    pub hip: CycleSummary,
    pub knee: CycleSummary,
    pub ankle: CycleSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStats {
    pub left: SideCycles,
    pub right: SideCycles,
}

impl CycleStats {
    pub fn from_series(series: &AngleSeriesSet, min_prominence: f64, min_distance: usize) -> Self {
        let side = |s: &JointAngleSeries| SideCycles {
            hip: CycleSummary::from_series(&s.hip, min_prominence, min_distance),
            knee: CycleSummary::from_series(&s.knee, min_prominence, min_distance),
            ankle: CycleSummary::from_series(&s.ankle, min_prominence, min_distance),
        };
        Self {
            left: side(&series.left),
            right: side(&series.right),
        }
    }

    /// Steps per minute from knee-flexion peaks: one peak per stride per
    /// side, two steps per stride.
    pub fn cadence(&self, frames: usize, frame_rate: f64) -> Option<f64> {
        let peaks = self.left.knee.peaks.len() + self.right.knee.peaks.len();
        if peaks == 0 || frames == 0 || !(frame_rate > 0.0) {
            return None;
        }
        let strides = peaks as f64 / 2.0;
        let minutes = frames as f64 / frame_rate / 60.0;
        Some(strides * 2.0 / minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn series(values: &[f64]) -> JointAngleSeries {
        JointAngleSeries {
            spine: values.to_vec(),
            hip: values.to_vec(),
            knee: values.to_vec(),
            ankle: values.to_vec(),
        }
    }

    #[test]
    fn stats_of_series() {
        let s = SeriesStats::from_series(&[10.0, 40.0, 25.0, 5.0]).unwrap();
        assert_abs_diff_eq!(s.min, 5.0);
        assert_abs_diff_eq!(s.max, 40.0);
        assert_abs_diff_eq!(s.avg, 20.0);
        assert_abs_diff_eq!(s.rom, 35.0);
    }

    #[test]
    fn rom_is_zero_only_for_constant_series() {
        assert_eq!(SeriesStats::from_series(&[3.0; 8]).unwrap().rom, 0.0);
        assert!(SeriesStats::from_series(&[3.0, 3.0, 3.0001]).unwrap().rom > 0.0);
        assert!(SeriesStats::from_series(&[]).is_none());
    }

    #[test]
    fn rom_vector_follows_export_order() {
        let set = AngleSeriesSet {
            left: JointAngleSeries {
                spine: vec![0.0, 8.0],
                hip: vec![0.0, 40.0],
                knee: vec![0.0, 60.0],
                ankle: vec![0.0, 30.0],
            },
            right: JointAngleSeries {
                spine: vec![0.0, 9.0],
                hip: vec![0.0, 45.0],
                knee: vec![0.0, 62.0],
                ankle: vec![0.0, 25.0],
            },
        };
        let stats = JointStats::from_series(&set).unwrap();
        let rom = RomVector::from_stats(&stats);
        assert_eq!(rom.to_array(), [62.0, 45.0, 8.0, 40.0, 60.0, 30.0, 25.0]);
        assert_eq!(serde_json::to_string(&rom).unwrap(), "[62.0,45.0,8.0,40.0,60.0,30.0,25.0]");
        let back: RomVector = serde_json::from_str("[62.0,45.0,8.0,40.0,60.0,30.0,25.0]").unwrap();
        assert_eq!(back, rom);
    }

    #[test]
    fn cumulative_asymmetry_is_sum_of_components() {
        let rom = RomVector::from([62.3, 41.7, 8.0, 44.1, 60.0, 31.2, 27.9]);
        let asym = Asymmetry::from_rom(&rom);
        assert_eq!(asym.cumulative, asym.hip + asym.knee + asym.ankle);
        assert_abs_diff_eq!(asym.hip, -2.4, epsilon = 1e-9);
        assert_abs_diff_eq!(asym.knee, 2.3, epsilon = 1e-9);
        assert_abs_diff_eq!(asym.ankle, -3.3, epsilon = 1e-9);
        assert_abs_diff_eq!(asym.total_magnitude, 8.0, epsilon = 1e-9);

        let rounded = asym.rounded();
        assert_abs_diff_eq!(rounded.cumulative, -3.4, epsilon = 1e-9);
        assert_abs_diff_eq!(rounded.ankle, -3.3, epsilon = 1e-9);
    }

    #[test]
    fn perfect_rom_earns_top_grade() {
        let set = AngleSeriesSet {
            left: JointAngleSeries {
                spine: vec![0.0, 8.0],
                hip: vec![0.0, 45.0],
                knee: vec![0.0, 65.0],
                ankle: vec![0.0, 30.0],
            },
            right: JointAngleSeries {
                spine: vec![0.0, 8.0],
                hip: vec![0.0, 45.0],
                knee: vec![0.0, 65.0],
                ankle: vec![0.0, 30.0],
            },
        };
        let stats = JointStats::from_series(&set).unwrap();
        assert_abs_diff_eq!(grade_score(&stats, 0.0), 100.0);
        assert_eq!(gait_grade(&stats, 0.0), GaitGrade::APlus);
        // ten degrees of asymmetry drops twenty points
        assert_eq!(gait_grade(&stats, 10.0), GaitGrade::B);
        assert_eq!(gait_grade(&stats, 10.5), GaitGrade::BMinus);
    }

    #[test]
    fn grade_boundaries() {
        assert_eq!(GaitGrade::from_score(95.0), GaitGrade::APlus);
        assert_eq!(GaitGrade::from_score(86.99), GaitGrade::BPlus);
        assert_eq!(GaitGrade::from_score(70.0), GaitGrade::C);
        assert_eq!(GaitGrade::from_score(-40.0), GaitGrade::D);
        assert_eq!(GaitGrade::AMinus.to_string(), "A-");
        assert_eq!(GaitGrade::BPlus.letter(), 'B');
    }

    #[test]
    fn peaks_respect_prominence() {
        // small ripple of 1 degree on top of a single tall bump
        let data = [0.0, 1.0, 0.0, 1.0, 0.0, 10.0, 20.0, 10.0, 0.0, 1.0, 0.0];
        assert_eq!(find_peaks(&data, 4.0, 1), vec![6]);
        assert_eq!(find_peaks(&data, 0.5, 1), vec![1, 3, 6, 9]);
    }

    #[test]
    fn peaks_respect_distance() {
        let data = [0.0, 10.0, 0.0, 12.0, 0.0, 0.0, 0.0, 0.0, 9.0, 0.0];
        assert_eq!(find_peaks(&data, 1.0, 3), vec![3, 8]);
    }

    #[test]
    fn flat_top_peak_reports_middle() {
        let data = [0.0, 5.0, 5.0, 5.0, 0.0];
        assert_eq!(find_peaks(&data, 1.0, 1), vec![2]);
    }

    #[test]
    fn cycle_summary_on_sine() {
        // two full 1 Hz cycles at 30 Hz
        let data: Vec<f64> = (0..60)
            .map(|i| 40.0 + 30.0 * (2.0 * PI * i as f64 / 30.0).sin())
            .collect();
        let summary = CycleSummary::from_series(&data, 4.0, 15);
        assert_eq!(summary.peaks.len(), 2);
        assert_eq!(summary.valleys.len(), 2);
        let cycle_rom = summary.cycle_rom.unwrap();
        assert!((cycle_rom - 60.0).abs() < 1.0, "cycle rom {}", cycle_rom);
    }

    #[test]
    fn cadence_from_knee_peaks() {
        let data: Vec<f64> = (0..60)
            .map(|i| 40.0 + 30.0 * (2.0 * PI * i as f64 / 30.0).sin())
            .collect();
        let stats = CycleStats::from_series(
            &AngleSeriesSet { left: series(&data), right: series(&data) },
            4.0,
            15,
        );
        // 2 strides per side in 2 seconds: 60 strides/min, 120 steps/min
        assert_abs_diff_eq!(stats.cadence(60, 30.0).unwrap(), 120.0, epsilon = 1e-9);

        let flat = CycleStats::from_series(
            &AngleSeriesSet { left: series(&[1.0; 10]), right: series(&[1.0; 10]) },
            4.0,
            15,
        );
        assert!(flat.cadence(10, 30.0).is_none());
    }
}

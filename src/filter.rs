// src/filter.rs - Measurement-noise model and low-pass smoothing of angle series
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::FilterError;

/// When synthetic measurement noise is added to angle series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoisePolicy {
    SimulatedOnly,
    Always,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Half-width of the uniform noise band, in degrees.
    pub level: f64,
    pub policy: NoisePolicy,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            level: 2.0,
            policy: NoisePolicy::SimulatedOnly,
        }
    }
}

impl NoiseConfig {
    pub fn applies_to(&self, simulated: bool) -> bool {
        match self.policy {
            NoisePolicy::Always => true,
            NoisePolicy::Never => false,
            NoisePolicy::SimulatedOnly => simulated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowPassMethod {
    /// Centered moving average sized from the cutoff.
    MovingAverage,
    /// Butterworth IIR; `zero_phase` runs it forward then backward.
    Butterworth { zero_phase: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub method: LowPassMethod,
    pub cutoff_hz: f64,
    pub sampling_hz: f64,
    pub order: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            method: LowPassMethod::MovingAverage,
            cutoff_hz: 6.0,
            sampling_hz: 30.0,
            order: 4,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), FilterError> {
        if !(self.sampling_hz > 0.0) {
            return Err(FilterError::InvalidSamplingRate(self.sampling_hz));
        }
        let nyquist = 0.5 * self.sampling_hz;
        if !(self.cutoff_hz > 0.0 && self.cutoff_hz < nyquist) {
            return Err(FilterError::InvalidCutoff { cutoff: self.cutoff_hz, nyquist });
        }
        if self.order == 0 {
            return Err(FilterError::InvalidOrder);
        }
        Ok(())
    }
}

/// Adds uniform noise in `[-level, level]` to each sample.
pub fn add_measurement_noise<R: Rng + ?Sized>(data: &[f64], level: f64, rng: &mut R) -> Vec<f64> {
    if !(level > 0.0) {
        return data.to_vec();
    }
    data.iter().map(|&v| v + rng.gen_range(-level..=level)).collect()
}

/// Window length of the moving-average approximation: `round(fs / fc)`, at least 1.
pub fn moving_average_window(cutoff_hz: f64, sampling_hz: f64) -> usize {
    ((sampling_hz / cutoff_hz).round() as usize).max(1)
}

/// Centered moving average. The window shrinks at the ends of the series
/// instead of padding or wrapping.
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let n = data.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            let slice = &data[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// One second-order section, transposed direct form II.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn run(&self, data: &mut [f64]) {
        let Some(&x0) = data.first() else { return };
        // steady-state for a constant input x0 (unity DC gain)
        let mut z1 = x0 * (1.0 - self.b0);
        let mut z2 = x0 * (self.b2 - self.a2);
        for v in data.iter_mut() {
            let x = *v;
            let y = self.b0 * x + z1;
            z1 = self.b1 * x - self.a1 * y + z2;
            z2 = self.b2 * x - self.a2 * y;
            *v = y;
        }
    }
}

/// Digital Butterworth low-pass built by the bilinear transform with
/// frequency pre-warping, realised as cascaded sections.
#[derive(Debug, Clone)]
pub struct ButterworthLowPass {
    sections: Vec<Biquad>,
    order: usize,
    cutoff_hz: f64,
    sampling_hz: f64,
}

impl ButterworthLowPass {
    pub fn new(order: usize, cutoff_hz: f64, sampling_hz: f64) -> Result<Self, FilterError> {
        FilterConfig {
            method: LowPassMethod::Butterworth { zero_phase: false },
            cutoff_hz,
            sampling_hz,
            order,
        }
        .validate()?;

        let k = (PI * cutoff_hz / sampling_hz).tan();
        let k2 = k * k;
        let mut sections = Vec::with_capacity((order + 1) / 2);

        for i in 0..order / 2 {
            let theta = PI * (2 * i + 1) as f64 / (2 * order) as f64;
            let q = 1.0 / (2.0 * theta.cos());
            let norm = 1.0 / (1.0 + k / q + k2);
            let b0 = k2 * norm;
            sections.push(Biquad {
                b0,
                b1: 2.0 * b0,
                b2: b0,
                a1: 2.0 * (k2 - 1.0) * norm,
                a2: (1.0 - k / q + k2) * norm,
            });
        }

        if order % 2 == 1 {
            let norm = 1.0 / (k + 1.0);
            sections.push(Biquad {
                b0: k * norm,
                b1: k * norm,
                b2: 0.0,
                a1: (k - 1.0) * norm,
                a2: 0.0,
            });
        }

        Ok(Self { sections, order, cutoff_hz, sampling_hz })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    pub fn sampling_hz(&self) -> f64 {
        self.sampling_hz
    }

    /// Causal filtering.
    pub fn filter(&self, data: &[f64]) -> Vec<f64> {
        let mut out = data.to_vec();
        for section in &self.sections {
            section.run(&mut out);
        }
        out
    }

    /// Forward-backward filtering; no phase lag, squared magnitude response.
    pub fn filter_zero_phase(&self, data: &[f64]) -> Vec<f64> {
        let mut out = self.filter(data);
        out.reverse();
        let mut out = self.filter(&out);
        out.reverse();
        out
    }
}

/// Noise stage followed by the low-pass stage, applied to one series at a time.
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    noise: NoiseConfig,
    filter: FilterConfig,
    butterworth: Option<ButterworthLowPass>,
}

impl SignalConditioner {
    pub fn new(noise: NoiseConfig, filter: FilterConfig) -> Result<Self, FilterError> {
        filter.validate()?;
        let butterworth = match filter.method {
            LowPassMethod::Butterworth { .. } => Some(ButterworthLowPass::new(
                filter.order,
                filter.cutoff_hz,
                filter.sampling_hz,
            )?),
            LowPassMethod::MovingAverage => None,
        };
        Ok(Self { noise, filter, butterworth })
    }

    pub fn smooth(&self, data: &[f64]) -> Vec<f64> {
        match (self.filter.method, &self.butterworth) {
            (LowPassMethod::Butterworth { zero_phase: true }, Some(bw)) => {
                bw.filter_zero_phase(data)
            }
            (LowPassMethod::Butterworth { zero_phase: false }, Some(bw)) => bw.filter(data),
            _ => moving_average(
                data,
                moving_average_window(self.filter.cutoff_hz, self.filter.sampling_hz),
            ),
        }
    }

    pub fn condition<R: Rng + ?Sized>(
        &self,
        data: &[f64],
        simulated: bool,
        rng: &mut R,
    ) -> Vec<f64> {
        if self.noise.applies_to(simulated) {
            self.smooth(&add_measurement_noise(data, self.noise.level, rng))
        } else {
            self.smooth(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_window_is_five() {
        assert_eq!(moving_average_window(6.0, 30.0), 5);
        assert_eq!(moving_average_window(100.0, 30.0), 1);
    }

    #[test]
    fn moving_average_shrinks_at_edges() {
        let data = [0.0, 10.0, 20.0, 30.0, 40.0, 50.0];
        let out = moving_average(&data, 5);
        // first sample averages indices 0..=2
        assert_abs_diff_eq!(out[0], 10.0);
        assert_abs_diff_eq!(out[1], 15.0);
        assert_abs_diff_eq!(out[2], 20.0);
        assert_abs_diff_eq!(out[5], 40.0);
        assert_eq!(out.len(), data.len());
    }

    #[test]
    fn moving_average_handles_empty_and_single() {
        assert!(moving_average(&[], 5).is_empty());
        assert_eq!(moving_average(&[7.5], 5), vec![7.5]);
    }

    #[test]
    fn noise_stays_within_band() {
        let mut rng = StdRng::seed_from_u64(11);
        let data = vec![45.0; 500];
        let noisy = add_measurement_noise(&data, 2.0, &mut rng);
        assert!(noisy.iter().all(|v| (43.0..=47.0).contains(v)));
        assert!(noisy.iter().any(|v| (v - 45.0).abs() > 0.5));
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let data = vec![10.0; 20];
        let a = add_measurement_noise(&data, 2.0, &mut StdRng::seed_from_u64(3));
        let b = add_measurement_noise(&data, 2.0, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert_eq!(ButterworthLowPass::new(0, 6.0, 30.0).unwrap_err(), FilterError::InvalidOrder);
        assert!(matches!(
            ButterworthLowPass::new(4, 15.0, 30.0),
            Err(FilterError::InvalidCutoff { .. })
        ));
        assert!(matches!(
            ButterworthLowPass::new(4, 6.0, 0.0),
            Err(FilterError::InvalidSamplingRate(_))
        ));
    }

    #[test]
    fn butterworth_passes_constant_signal_without_transient() {
        for order in 1..=5 {
            let bw = ButterworthLowPass::new(order, 6.0, 30.0).unwrap();
            let out = bw.filter(&[42.0; 40]);
            for v in out {
                assert_abs_diff_eq!(v, 42.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn butterworth_attenuates_high_frequency() {
        let bw = ButterworthLowPass::new(4, 6.0, 30.0).unwrap();
        // 12 Hz tone at 30 Hz sampling, well above the cutoff
        let tone: Vec<f64> = (0..300)
            .map(|i| (2.0 * PI * 12.0 * i as f64 / 30.0).sin())
            .collect();
        let out = bw.filter_zero_phase(&tone);
        let peak = out[100..200].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        assert!(peak < 0.05, "12 Hz tone leaked through with amplitude {}", peak);
    }

    #[test]
    fn butterworth_keeps_slow_gait_signal() {
        let bw = ButterworthLowPass::new(4, 6.0, 30.0).unwrap();
        // 1 Hz stride-rate oscillation
        let slow: Vec<f64> = (0..300)
            .map(|i| 30.0 * (2.0 * PI * i as f64 / 30.0).sin())
            .collect();
        let out = bw.filter_zero_phase(&slow);
        for i in 60..240 {
            assert_abs_diff_eq!(out[i], slow[i], epsilon = 0.5);
        }
    }

    #[test]
    fn conditioner_skips_noise_for_real_data_by_default() {
        let conditioner =
            SignalConditioner::new(NoiseConfig::default(), FilterConfig::default()).unwrap();
        let data = vec![20.0; 10];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(conditioner.condition(&data, false, &mut rng), data);
        assert_ne!(conditioner.condition(&data, true, &mut rng), data);
    }
}

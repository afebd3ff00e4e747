//! Signal feature extraction.
//!
//! Pure function from a raw prediction signal to a fixed set of named
//! scalar features. Everything downstream (the parameter recommender,
//! the intensity-based position remap) keys off this struct, so fields
//! are typed and defaulted explicitly rather than kept in a loose map.

use std::f64::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::peaks::{find_peaks, find_troughs};

/// Sliding-window size used by the stability estimate, in samples.
const STABILITY_WINDOW: usize = 100;

/// Named scalar features of a prediction signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalFeatures {
    // Basic statistics
    pub mean: f64,
    pub std: f64,
    /// Peak-to-peak range.
    pub range: f64,
    pub median: f64,

    // First-difference magnitudes
    pub mean_change: f64,
    pub max_change: f64,
    pub std_change: f64,

    // Frequency
    /// Dominant frequency in cycles per sample (DC excluded).
    pub main_frequency: f64,
    /// `1 / main_frequency` in samples; 0 when no frequency was found.
    pub period_length: f64,

    /// Prominent peaks and troughs per sample.
    pub extrema_density: f64,

    /// `1 / (1 + mean(|second difference|) / range)`, in `[0, 1]`.
    pub smoothness: f64,

    // Distribution shape
    pub skewness: f64,
    /// Excess kurtosis.
    pub kurtosis: f64,

    // Autocorrelation
    /// Normalized autocorrelation at the first prominent lag, in `[0, 1]`.
    pub periodicity: f64,
    /// The lag of that peak in samples; falls back to `period_length`.
    pub period: f64,

    /// Inverse variance-of-window-variances, in `[0, 1]`.
    pub stability: f64,

    // Intensity distribution over |value|
    pub high_intensity_ratio: f64,
    pub low_intensity_ratio: f64,
    /// Coefficient of variation of intensity.
    pub intensity_variance: f64,
    pub mean_intensity: f64,
    pub median_intensity: f64,
}

impl Default for SignalFeatures {
    /// Neutral defaults used for degenerate (too short) signals.
    fn default() -> Self {
        Self {
            mean: 0.0,
            std: 0.0,
            range: 0.0,
            median: 0.0,
            mean_change: 0.0,
            max_change: 0.0,
            std_change: 0.0,
            main_frequency: 0.0,
            period_length: 0.0,
            extrema_density: 0.0,
            smoothness: 1.0,
            skewness: 0.0,
            kurtosis: 0.0,
            periodicity: 0.0,
            period: 0.0,
            stability: 1.0,
            high_intensity_ratio: 0.5,
            low_intensity_ratio: 0.5,
            intensity_variance: 0.0,
            mean_intensity: 0.0,
            median_intensity: 0.0,
        }
    }
}

impl SignalFeatures {
    /// Extract features from a raw prediction signal.
    ///
    /// Inputs shorter than 3 samples return the neutral default rather
    /// than failing.
    pub fn extract(signal: &[f32]) -> Self {
        let values: Vec<f64> = signal.iter().map(|&v| v as f64).collect();
        let n = values.len();
        if n < 3 {
            return Self::default();
        }

        let signal_mean = mean(&values);
        let signal_std = std_dev(&values);
        let range = peak_to_peak(&values);
        let signal_median = median(&values);

        let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let abs_changes: Vec<f64> = changes.iter().map(|c| c.abs()).collect();
        let mean_change = mean(&abs_changes);
        let max_change = abs_changes.iter().cloned().fold(0.0, f64::max);
        let std_change = std_dev(&changes);

        let (main_frequency, period_length) = frequency_features(&values);
        let extrema_density = extrema_density(&values, range);
        let smoothness = smoothness(&values, range);
        let (skewness, kurtosis) = shape_features(&values, signal_mean, signal_std);
        let (periodicity, autocorr_period) = periodicity(&values, signal_mean, signal_std);
        let period = if autocorr_period > 0.0 {
            autocorr_period
        } else {
            period_length
        };
        let stability = stability(&values);

        let mut features = Self {
            mean: signal_mean,
            std: signal_std,
            range,
            median: signal_median,
            mean_change,
            max_change,
            std_change,
            main_frequency,
            period_length,
            extrema_density,
            smoothness,
            skewness,
            kurtosis,
            periodicity,
            period,
            stability,
            ..Self::default()
        };
        features.apply_intensity_distribution(&values);
        features
    }

    /// Classify samples into high/low intensity regions using
    /// `mean ± 0.5·std` of `|value|` and record their fractions.
    fn apply_intensity_distribution(&mut self, values: &[f64]) {
        let n = values.len();
        if n < 10 {
            // Neutral split for signals too short to threshold.
            self.high_intensity_ratio = 0.5;
            self.low_intensity_ratio = 0.5;
            self.intensity_variance = 0.0;
            return;
        }

        let intensity: Vec<f64> = values.iter().map(|v| v.abs()).collect();
        let mean_intensity = mean(&intensity);
        let std_intensity = std_dev(&intensity);

        let high_threshold = mean_intensity + 0.5 * std_intensity;
        let low_threshold = (mean_intensity - 0.5 * std_intensity).max(0.0);

        let high = intensity.iter().filter(|&&v| v > high_threshold).count();
        let low = intensity.iter().filter(|&&v| v < low_threshold).count();

        self.high_intensity_ratio = high as f64 / n as f64;
        self.low_intensity_ratio = low as f64 / n as f64;
        self.intensity_variance = std_intensity / (mean_intensity + 1e-9);
        self.mean_intensity = mean_intensity;
        self.median_intensity = median(&intensity);
    }

    /// Thresholds used to classify intensity regions, `(low, high)`.
    /// `None` when the signal is too short for a meaningful split.
    pub fn intensity_thresholds(signal: &[f32]) -> Option<(f64, f64)> {
        if signal.len() <= 10 {
            return None;
        }
        let intensity: Vec<f64> = signal.iter().map(|&v| (v as f64).abs()).collect();
        let mean_intensity = mean(&intensity);
        let std_intensity = std_dev(&intensity);
        let high = mean_intensity + 0.5 * std_intensity;
        let low = (mean_intensity - 0.5 * std_intensity).max(0.0);
        Some((low, high))
    }
}

/// Dominant frequency via a Hann-windowed power spectrum, plus the
/// corresponding period length in samples.
fn frequency_features(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n < 4 {
        return (0.0, 0.0);
    }

    let mut buffer: Vec<Complex<f64>> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| Complex::new(v * hann(i, n), 0.0))
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let power: Vec<f64> = buffer[..n / 2].iter().map(|c| c.norm_sqr()).collect();
    if power.len() <= 1 {
        return (0.0, 0.0);
    }

    // Skip the DC term when picking the dominant bin.
    let dominant = power
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|&(_, a), &(_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let main_frequency = dominant as f64 / n as f64;
    let period_length = if main_frequency > 0.0 {
        1.0 / main_frequency
    } else {
        0.0
    };
    (main_frequency, period_length)
}

/// Prominent peaks and troughs per sample.
fn extrema_density(values: &[f64], range: f64) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let threshold = (range * 0.05).max(0.01);
    let extrema = find_peaks(values, threshold).len() + find_troughs(values, threshold).len();
    extrema as f64 / n as f64
}

/// Inverse mean second-difference magnitude, normalized by range.
fn smoothness(values: &[f64], range: f64) -> f64 {
    if values.len() < 3 || range <= 0.0 {
        return 1.0;
    }
    let second_diffs: Vec<f64> = values
        .windows(3)
        .map(|w| (w[2] - w[1]) - (w[1] - w[0]))
        .collect();
    let avg = mean(&second_diffs.iter().map(|d| d.abs()).collect::<Vec<_>>());
    (1.0 / (1.0 + avg / range)).clamp(0.0, 1.0)
}

/// Population skewness and excess kurtosis.
fn shape_features(values: &[f64], mean_value: f64, std_value: f64) -> (f64, f64) {
    if std_value <= 1e-12 {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let m3: f64 = values
        .iter()
        .map(|v| (v - mean_value).powi(3))
        .sum::<f64>()
        / n;
    let m4: f64 = values
        .iter()
        .map(|v| (v - mean_value).powi(4))
        .sum::<f64>()
        / n;
    let variance = std_value * std_value;
    (m3 / variance.powf(1.5), m4 / (variance * variance) - 3.0)
}

/// First prominent autocorrelation peak: `(periodicity, lag)`.
fn periodicity(values: &[f64], mean_value: f64, std_value: f64) -> (f64, f64) {
    let n = values.len();
    if n < 4 || std_value <= 1e-12 {
        return (0.0, 0.0);
    }

    let normalized: Vec<f64> = values.iter().map(|v| (v - mean_value) / std_value).collect();
    let autocorr = autocorrelation(&normalized);

    let search_range = (n / 2).min(autocorr.len());
    if search_range < 3 {
        return (0.0, 0.0);
    }

    // Peaks in lags 1..search_range with prominence > 0.1; the scanned
    // slice starts at lag 1, so peak indices are offset by one.
    let peaks = find_peaks(&autocorr[1..search_range], 0.1);
    match peaks.first() {
        Some(peak) => {
            let lag = peak.index + 1;
            (autocorr[lag], lag as f64)
        }
        None => (0.0, 0.0),
    }
}

/// Linear autocorrelation for non-negative lags, normalized by lag 0.
///
/// Computed in the frequency domain with zero padding, which is equal to
/// the direct full correlation.
fn autocorrelation(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let padded_len = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f64>> = values
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(padded_len)
        .collect();

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(padded_len);
    let inverse = planner.plan_fft_inverse(padded_len);

    forward.process(&mut buffer);
    for c in buffer.iter_mut() {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }
    inverse.process(&mut buffer);

    let lag0 = buffer[0].re;
    if lag0.abs() <= 1e-12 {
        return vec![0.0; n];
    }
    buffer[..n].iter().map(|c| c.re / lag0).collect()
}

/// Inverse variance-of-window-variances over overlapping windows.
fn stability(values: &[f64]) -> f64 {
    let n = values.len();
    if n < STABILITY_WINDOW {
        let variance = variance(values);
        let range = peak_to_peak(values);
        if range > 0.0 {
            return (1.0 / (1.0 + variance / range)).clamp(0.0, 1.0);
        }
        return 1.0;
    }

    let stride = STABILITY_WINDOW / 2;
    let window_variances: Vec<f64> = (0..=n - STABILITY_WINDOW)
        .step_by(stride)
        .map(|i| variance(&values[i..i + STABILITY_WINDOW]))
        .collect();

    if window_variances.is_empty() {
        return 1.0;
    }

    let mean_variance = mean(&window_variances);
    if mean_variance <= 0.0 {
        return 1.0;
    }
    let variance_of_variances = variance(&window_variances);
    (1.0 / (1.0 + variance_of_variances / mean_variance)).clamp(0.0, 1.0)
}

fn hann(i: usize, n: usize) -> f64 {
    if n <= 1 {
        return 1.0;
    }
    0.5 - 0.5 * (2.0 * PI * i as f64 / (n - 1) as f64).cos()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

fn peak_to_peak(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    if max.is_finite() && min.is_finite() {
        max - min
    } else {
        0.0
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(n: usize, period: f64, amplitude: f64) -> Vec<f32> {
        (0..n)
            .map(|i| (amplitude * (2.0 * PI * i as f64 / period).sin()) as f32)
            .collect()
    }

    #[test]
    fn test_short_signal_returns_neutral_default() {
        let features = SignalFeatures::extract(&[0.5, 0.6]);
        assert_eq!(features, SignalFeatures::default());
        assert!((features.smoothness - 1.0).abs() < 1e-12);
        assert!((features.stability - 1.0).abs() < 1e-12);
        assert!((features.high_intensity_ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_basic_stats() {
        let features = SignalFeatures::extract(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!((features.mean - 2.0).abs() < 1e-9);
        assert!((features.range - 4.0).abs() < 1e-9);
        assert!((features.median - 2.0).abs() < 1e-9);
        assert!((features.mean_change - 1.0).abs() < 1e-9);
        assert!((features.max_change - 1.0).abs() < 1e-9);
        // Uniform steps: zero change variance, perfectly smooth ramp.
        assert!(features.std_change < 1e-9);
        assert!((features.smoothness - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sine_dominant_frequency() {
        let features = SignalFeatures::extract(&sine(400, 20.0, 1.0));
        // 20 cycles over 400 samples → 0.05 cycles/sample.
        assert!(
            (features.main_frequency - 0.05).abs() < 0.01,
            "main_frequency={}",
            features.main_frequency
        );
        assert!(
            (features.period_length - 20.0).abs() < 4.0,
            "period_length={}",
            features.period_length
        );
    }

    #[test]
    fn test_sine_periodicity() {
        let features = SignalFeatures::extract(&sine(400, 20.0, 1.0));
        assert!(
            features.periodicity > 0.8,
            "periodicity={}",
            features.periodicity
        );
        assert!((features.period - 20.0).abs() < 2.0, "period={}", features.period);
    }

    #[test]
    fn test_sine_extrema_density() {
        let features = SignalFeatures::extract(&sine(400, 20.0, 1.0));
        // 20 peaks + 20 troughs over 400 samples ≈ 0.1.
        assert!(
            (features.extrema_density - 0.1).abs() < 0.02,
            "extrema_density={}",
            features.extrema_density
        );
    }

    #[test]
    fn test_constant_signal_is_smooth_and_stable() {
        let features = SignalFeatures::extract(&[0.7; 64]);
        assert!((features.smoothness - 1.0).abs() < 1e-12);
        assert!((features.stability - 1.0).abs() < 1e-12);
        assert!((features.skewness).abs() < 1e-12);
        assert!(features.periodicity.abs() < 1e-12);
    }

    #[test]
    fn test_intensity_distribution_of_spiky_signal() {
        // Mostly calm with occasional large spikes: low-intensity samples
        // dominate and the coefficient of variation is large.
        let mut signal = vec![0.01_f32; 200];
        for i in (0..200).step_by(25) {
            signal[i] = 1.0;
        }
        let features = SignalFeatures::extract(&signal);
        assert!(features.high_intensity_ratio < 0.2);
        assert!(features.intensity_variance > 1.0);
    }

    #[test]
    fn test_stability_detects_regime_changes() {
        // First half quiet, second half loud: window variances diverge.
        let mut signal = Vec::with_capacity(400);
        for i in 0..400 {
            let amplitude = if i < 200 { 0.02 } else { 1.0 };
            signal.push((amplitude * (i as f64 * 0.7).sin()) as f32);
        }
        let unstable = SignalFeatures::extract(&signal).stability;
        let stable = SignalFeatures::extract(&sine(400, 20.0, 1.0)).stability;
        assert!(
            unstable < stable,
            "unstable={unstable} should be below stable={stable}"
        );
    }

    #[test]
    fn test_intensity_thresholds_need_length() {
        assert!(SignalFeatures::intensity_thresholds(&[0.5; 10]).is_none());
        let (low, high) = SignalFeatures::intensity_thresholds(&[0.5; 11]).unwrap();
        assert!(low <= high);
    }
}

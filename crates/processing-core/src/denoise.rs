//! Signal denoising: windowed FFT low-pass and moving-average smoothing.

use std::f64::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

/// FFT-denoise a signal in overlapping Hann windows.
///
/// Each window of `window_frames` samples keeps only the frequency
/// components whose period is at least `frames_per_component` frames;
/// faster components are treated as noise and zeroed. Windows overlap by
/// half their length and are recombined by weighted overlap-add, so the
/// stitched output has no seams at window boundaries.
pub fn fft_denoise(signal: &[f64], window_frames: usize, frames_per_component: usize) -> Vec<f64> {
    let n = signal.len();
    let window = window_frames.min(n);
    if window < 4 || frames_per_component == 0 {
        return signal.to_vec();
    }

    // Keep bins up to window/frames_per_component cycles per window.
    let cutoff = (window / frames_per_component).max(1);

    let hann: Vec<f64> = (0..window)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / window as f64).cos())
        .collect();

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(window);
    let inverse = planner.plan_fft_inverse(window);

    let hop = (window / 2).max(1);
    let mut output = vec![0.0; n];
    let mut weight = vec![0.0; n];

    let mut start = 0;
    loop {
        let end = (start + window).min(n);
        let len = end - start;

        let mut buffer: Vec<Complex<f64>> = (0..window)
            .map(|i| {
                let v = if i < len { signal[start + i] } else { 0.0 };
                Complex::new(v * hann[i], 0.0)
            })
            .collect();

        forward.process(&mut buffer);
        for (k, c) in buffer.iter_mut().enumerate() {
            let bin = k.min(window - k);
            if bin > cutoff {
                *c = Complex::new(0.0, 0.0);
            }
        }
        inverse.process(&mut buffer);

        for i in 0..len {
            // rustfft's inverse is unnormalized.
            output[start + i] += buffer[i].re / window as f64;
            weight[start + i] += hann[i];
        }

        if end == n {
            break;
        }
        start += hop;
    }

    for i in 0..n {
        if weight[i] > 1e-9 {
            output[i] /= weight[i];
        } else {
            output[i] = signal[i];
        }
    }
    output
}

/// Centered moving average over `window` samples.
pub fn moving_average(signal: &[f64], window: usize) -> Vec<f64> {
    if signal.is_empty() || window <= 1 {
        return signal.to_vec();
    }

    let n = signal.len();
    let mut result = Vec::with_capacity(n);
    for i in 0..n {
        let start = i.saturating_sub(window / 2);
        let end = (i + window / 2 + 1).min(n);
        let sum: f64 = signal[start..end].iter().sum();
        result.push(sum / (end - start) as f64);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_sine(n: usize, period: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                (2.0 * PI * t / period).sin() + 0.3 * (2.0 * PI * t / 3.0).sin()
            })
            .collect()
    }

    fn rms_diff(a: &[f64], b: &[f64]) -> f64 {
        let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
        (sum / a.len() as f64).sqrt()
    }

    #[test]
    fn test_fft_denoise_removes_fast_component() {
        let n = 512;
        let clean: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * i as f64 / 64.0).sin())
            .collect();
        let noisy = noisy_sine(n, 64.0);

        // Components faster than 10 frames/cycle (the 3-frame ripple)
        // are removed; the 64-frame carrier survives.
        let denoised = fft_denoise(&noisy, 128, 10);
        assert!(rms_diff(&denoised, &clean) < rms_diff(&noisy, &clean));

        // Interior samples track the clean carrier closely.
        for i in 64..n - 64 {
            assert!(
                (denoised[i] - clean[i]).abs() < 0.25,
                "sample {i}: {} vs {}",
                denoised[i],
                clean[i]
            );
        }
    }

    #[test]
    fn test_fft_denoise_short_signal_passthrough() {
        let signal = [0.1, 0.2, 0.3];
        assert_eq!(fft_denoise(&signal, 128, 10), signal.to_vec());
    }

    #[test]
    fn test_fft_denoise_preserves_length() {
        // Window longer than the signal shrinks to fit.
        let signal = noisy_sine(100, 25.0);
        assert_eq!(fft_denoise(&signal, 512, 10).len(), 100);
    }

    #[test]
    fn test_moving_average_flattens_spike() {
        let mut signal = vec![0.0; 11];
        signal[5] = 1.0;
        let smoothed = moving_average(&signal, 5);
        assert!((smoothed[5] - 0.2).abs() < 1e-12);
        assert!((smoothed[4] - 0.2).abs() < 1e-12);
        assert!(smoothed[1].abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_window_one_passthrough() {
        let signal = vec![0.5, 0.1, 0.9];
        assert_eq!(moving_average(&signal, 1), signal);
    }
}

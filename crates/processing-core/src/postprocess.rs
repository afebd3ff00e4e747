//! Denoise and keyframe-selection stage.
//!
//! Consumes the raw signal and a resolved configuration, and produces a
//! denoised per-frame series plus the sparse graph points the action
//! builder works from. All intermediate data travels in the returned
//! composite value; nothing is attached to shared state.

use fungen_script_model::{GraphPoint, PostprocessConfig, RawSignal};

use crate::denoise::{fft_denoise, moving_average};
use crate::peaks::{find_peaks, find_troughs};

/// One frame of the denoised series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedSample {
    pub frame_index: u32,
    pub timestamp_ms: f64,
    /// The raw prediction for this frame.
    pub predicted_change: f32,
    /// The denoised, 0–100 normalized value.
    pub processed_value: f64,
}

/// Composite result of the postprocessing stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostprocessOutcome {
    /// Denoised per-frame series, one entry per input sample.
    pub processed: Vec<ProcessedSample>,

    /// Selected keyframes, positions strictly increasing.
    pub graph_points: Vec<GraphPoint>,

    /// Frame rate the positions are expressed against.
    pub frame_rate: f64,

    /// The raw pre-denoise signal, kept for intensity-based remapping.
    pub original_signal: Vec<f32>,
}

/// Run the denoise → extrema-select → merge → envelope pipeline.
pub fn apply_postprocessing(signal: &RawSignal, config: &PostprocessConfig) -> PostprocessOutcome {
    let original_signal = signal.values();
    let values: Vec<f64> = original_signal.iter().map(|&v| v as f64).collect();

    if values.is_empty() {
        return PostprocessOutcome {
            frame_rate: config.frame_rate,
            ..PostprocessOutcome::default()
        };
    }

    let denoised = if config.fft_denoise {
        fft_denoise(
            &values,
            config.fft_window_frames,
            config.fft_frames_per_component,
        )
    } else {
        values.clone()
    };
    let smoothed = moving_average(&denoised, config.smooth_window_frames);

    let keyframes = select_keyframes(&smoothed, config);
    let merged = merge_keyframes(keyframes, config);
    let graph_points = limit_envelope_slopes(merged, config);

    tracing::debug!(
        frames = smoothed.len(),
        keyframes = graph_points.len(),
        "postprocessing selected keyframes"
    );

    let series = interpolate_series(&smoothed, &graph_points);
    let processed = signal
        .samples()
        .iter()
        .zip(series)
        .map(|(sample, processed_value)| ProcessedSample {
            frame_index: sample.frame_index,
            timestamp_ms: sample.timestamp_ms,
            predicted_change: sample.value,
            processed_value,
        })
        .collect();

    PostprocessOutcome {
        processed,
        graph_points,
        frame_rate: config.frame_rate,
        original_signal,
    }
}

/// Detect prominent extrema and map them to 0–100 keyframe values.
fn select_keyframes(smoothed: &[f64], config: &PostprocessConfig) -> Vec<GraphPoint> {
    let (min, max) = min_max(smoothed);
    let range = max - min;
    let threshold = (config.prominence_ratio * range).max(config.min_prominence);

    let mut indices: Vec<usize> = find_peaks(smoothed, threshold)
        .into_iter()
        .chain(find_troughs(smoothed, threshold))
        .map(|p| p.index)
        .collect();
    indices.sort_unstable();
    indices.dedup();

    indices
        .into_iter()
        .map(|i| GraphPoint {
            position: i as f64,
            value: normalize_value(smoothed[i], min, range),
        })
        .collect()
}

/// Merge keyframes closer than the merge threshold, keeping the more
/// extreme value of each colliding pair.
fn merge_keyframes(points: Vec<GraphPoint>, config: &PostprocessConfig) -> Vec<GraphPoint> {
    let frame_ms = if config.frame_rate > 1e-6 {
        1000.0 / config.frame_rate
    } else {
        33.3
    };
    let threshold_frames = config.merge_threshold_ms / frame_ms;

    let mut merged: Vec<GraphPoint> = Vec::with_capacity(points.len());
    for point in points {
        if let Some(last) = merged.last_mut() {
            if point.position - last.position < threshold_frames {
                // Keep the value further from center.
                if (point.value - 50.0).abs() > (last.value - 50.0).abs() {
                    *last = point;
                }
                continue;
            }
        }
        merged.push(point);
    }
    merged
}

/// Bound position change rates between consecutive keyframes.
///
/// Rates are in position units per frame. Segments slower than
/// `min_slope` are dropped entirely, kept-but-weak segments are boosted
/// up to `boost_slope`, and segments faster than `max_slope` are clipped
/// down to it.
fn limit_envelope_slopes(points: Vec<GraphPoint>, config: &PostprocessConfig) -> Vec<GraphPoint> {
    let mut result: Vec<GraphPoint> = Vec::with_capacity(points.len());

    for point in points {
        let Some(last) = result.last() else {
            result.push(point);
            continue;
        };

        let frames = point.position - last.position;
        if frames <= 0.0 {
            continue;
        }

        let delta = point.value - last.value;
        let rate = delta.abs() / frames;

        if rate < config.min_slope {
            continue;
        }

        let mut value = point.value;
        if rate > config.max_slope {
            value = last.value + delta.signum() * config.max_slope * frames;
        } else if rate < config.boost_slope {
            value = last.value + delta.signum() * config.boost_slope * frames;
        }

        result.push(GraphPoint {
            position: point.position,
            value: value.clamp(0.0, 100.0),
        });
    }

    result
}

/// Rebuild a per-frame series by linear interpolation through the graph
/// points; with no points the normalized smoothed series is used.
fn interpolate_series(smoothed: &[f64], points: &[GraphPoint]) -> Vec<f64> {
    let n = smoothed.len();
    if points.is_empty() {
        let (min, max) = min_max(smoothed);
        let range = max - min;
        return smoothed
            .iter()
            .map(|&v| normalize_value(v, min, range))
            .collect();
    }

    let mut series = Vec::with_capacity(n);
    let mut segment = 0;
    for i in 0..n {
        let pos = i as f64;
        while segment + 1 < points.len() && points[segment + 1].position < pos {
            segment += 1;
        }

        let value = if pos <= points[0].position {
            points[0].value
        } else if pos >= points[points.len() - 1].position {
            points[points.len() - 1].value
        } else {
            let a = &points[segment];
            let b = &points[segment + 1];
            let span = b.position - a.position;
            if span <= 0.0 {
                b.value
            } else {
                a.value + (b.value - a.value) * (pos - a.position) / span
            }
        };
        series.push(value);
    }
    series
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() {
        (min, max)
    } else {
        (0.0, 0.0)
    }
}

fn normalize_value(value: f64, min: f64, range: f64) -> f64 {
    if range <= 0.0 {
        50.0
    } else {
        ((value - min) / range * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fungen_script_model::PostprocessOptions;
    use std::f64::consts::PI;

    fn config(frame_rate: f64) -> PostprocessConfig {
        PostprocessConfig::from_options(&PostprocessOptions::default(), frame_rate)
    }

    fn sine_signal(n: usize, period: f64) -> RawSignal {
        let values: Vec<f32> = (0..n)
            .map(|i| (0.5 * (2.0 * PI * i as f64 / period).sin()) as f32)
            .collect();
        RawSignal::from_values(values, 30.0)
    }

    #[test]
    fn test_empty_signal_yields_empty_outcome() {
        let outcome = apply_postprocessing(&RawSignal::from_values(vec![], 30.0), &config(30.0));
        assert!(outcome.processed.is_empty());
        assert!(outcome.graph_points.is_empty());
    }

    #[test]
    fn test_sine_produces_alternating_keyframes() {
        // Period 60 at 30fps = 2s strokes, far apart enough to survive
        // merging.
        let outcome = apply_postprocessing(&sine_signal(600, 60.0), &config(30.0));
        assert!(
            outcome.graph_points.len() >= 10,
            "got {} keyframes",
            outcome.graph_points.len()
        );

        for pair in outcome.graph_points.windows(2) {
            assert!(pair[1].position > pair[0].position);
            // Peaks and troughs alternate around the center.
            assert!((pair[1].value > 50.0) != (pair[0].value > 50.0));
        }
    }

    #[test]
    fn test_graph_point_values_bounded() {
        let outcome = apply_postprocessing(&sine_signal(600, 45.0), &config(30.0));
        for point in &outcome.graph_points {
            assert!((0.0..=100.0).contains(&point.value));
        }
        for sample in &outcome.processed {
            assert!((0.0..=100.0).contains(&sample.processed_value));
        }
    }

    #[test]
    fn test_merge_keeps_more_extreme_value() {
        let cfg = config(30.0);
        // 225ms at 30fps ≈ 6.75 frames; positions 3 apart collide.
        let merged = merge_keyframes(
            vec![
                GraphPoint {
                    position: 10.0,
                    value: 80.0,
                },
                GraphPoint {
                    position: 13.0,
                    value: 95.0,
                },
                GraphPoint {
                    position: 40.0,
                    value: 20.0,
                },
            ],
            &cfg,
        );
        assert_eq!(merged.len(), 2);
        assert!((merged[0].value - 95.0).abs() < 1e-12);
        assert!((merged[0].position - 13.0).abs() < 1e-12);
        assert!((merged[1].value - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_slope_limits_clip_fast_segments() {
        let cfg = config(30.0);
        let limited = limit_envelope_slopes(
            vec![
                GraphPoint {
                    position: 0.0,
                    value: 0.0,
                },
                GraphPoint {
                    position: 10.0,
                    value: 100.0,
                },
            ],
            &cfg,
        );
        // 10 units/frame exceeds max_slope 3.25 → clipped to 32.5.
        assert_eq!(limited.len(), 2);
        assert!((limited[1].value - 32.5).abs() < 1e-9);
    }

    #[test]
    fn test_slope_limits_drop_slow_segments() {
        let cfg = config(30.0);
        let limited = limit_envelope_slopes(
            vec![
                GraphPoint {
                    position: 0.0,
                    value: 50.0,
                },
                // 0.1 units/frame, far below min_slope.
                GraphPoint {
                    position: 100.0,
                    value: 60.0,
                },
            ],
            &cfg,
        );
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_processed_series_tracks_keyframes() {
        let outcome = apply_postprocessing(&sine_signal(600, 60.0), &config(30.0));
        for point in &outcome.graph_points {
            let idx = point.position as usize;
            let sample = &outcome.processed[idx];
            assert!(
                (sample.processed_value - point.value).abs() < 1e-9,
                "series should pass through keyframe at {idx}"
            );
        }
    }

    #[test]
    fn test_original_signal_preserved() {
        let signal = sine_signal(120, 30.0);
        let outcome = apply_postprocessing(&signal, &config(30.0));
        assert_eq!(outcome.original_signal, signal.values());
        assert_eq!(outcome.processed.len(), 120);
        assert_eq!(outcome.processed[5].predicted_change, signal.values()[5]);
    }
}

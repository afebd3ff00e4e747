//! Action synthesis from postprocessed keyframes.
//!
//! Converts graph points (or, failing that, the processed series) into
//! the final timed action list: millisecond conversion, intensity-based
//! position remapping, timestamp deduplication, and velocity smoothing.
//! This stage never fails; with nothing to work from it emits a single
//! centered action.

use fungen_script_model::Action;

use crate::features::SignalFeatures;
use crate::postprocess::PostprocessOutcome;

/// Position change allowed per 100 ms between consecutive actions.
const MAX_CHANGE_PER_100MS: f64 = 15.0;

/// Hard cap on a single step's position change (2× the base rate).
const MAX_CHANGE_CAP: f64 = MAX_CHANGE_PER_100MS * 2.0;

/// Build the final action list from a postprocessing outcome.
pub fn build_actions(outcome: &PostprocessOutcome) -> Vec<Action> {
    let step_ms = if outcome.frame_rate > 1e-6 {
        1000.0 / outcome.frame_rate
    } else {
        33.3
    };
    let thresholds = SignalFeatures::intensity_thresholds(&outcome.original_signal);
    let signal = (!outcome.original_signal.is_empty()).then_some(&outcome.original_signal[..]);

    let mut raw: Vec<(i64, f64)> = Vec::new();
    let mut last_time: i64 = -1;
    for point in &outcome.graph_points {
        let mut time_ms = (point.position * step_ms).round() as i64;
        if last_time >= 0 && time_ms <= last_time {
            time_ms = last_time + 1;
        }
        let value = adjust_position_by_intensity(point.value, time_ms, step_ms, signal, thresholds);
        raw.push((time_ms.max(0), value.clamp(0.0, 100.0).round()));
        last_time = time_ms;
    }

    // Fall back to the dense processed series when no keyframes exist.
    if raw.is_empty() {
        for (idx, sample) in outcome.processed.iter().enumerate() {
            let time_ms = (idx as f64 * step_ms).round() as i64;
            let value = adjust_position_by_intensity(
                sample.processed_value,
                time_ms,
                step_ms,
                signal,
                thresholds,
            );
            raw.push((time_ms.max(0), value.clamp(0.0, 100.0).round()));
        }
    }

    if raw.is_empty() {
        raw.push((0, 50.0));
    }

    // Deduplicate by timestamp; after a stable sort by time, the later
    // entry for the same millisecond wins.
    raw.sort_by_key(|(at, _)| *at);
    let mut deduped: Vec<(i64, f64)> = Vec::with_capacity(raw.len());
    for (at, pos) in raw {
        if let Some(last) = deduped.last_mut() {
            if last.0 == at {
                last.1 = pos;
                continue;
            }
        }
        deduped.push((at, pos));
    }

    smooth_actions(deduped)
}

/// Limit position changes between consecutive actions so the device is
/// never asked to move faster than the configured rate.
fn smooth_actions(sorted: Vec<(i64, f64)>) -> Vec<Action> {
    if sorted.is_empty() {
        return Vec::new();
    }
    if sorted.len() < 2 {
        let (at, pos) = sorted[0];
        return vec![to_action(at, pos)];
    }

    let mut smoothed = Vec::with_capacity(sorted.len());
    let mut last_time: i64 = -1;
    let mut last_pos: Option<f64> = None;

    for (mut time_ms, mut pos) in sorted {
        if last_time >= 0 && time_ms <= last_time {
            time_ms = last_time + 1;
        }

        if let Some(prev) = last_pos {
            let change = pos - prev;
            let time_diff = time_ms - last_time;

            let max_allowed = if time_diff > 0 {
                (MAX_CHANGE_PER_100MS * time_diff as f64 / 100.0).min(MAX_CHANGE_CAP)
            } else {
                MAX_CHANGE_PER_100MS
            };

            if change.abs() > max_allowed {
                pos = prev + change.signum() * max_allowed;
                pos = pos.clamp(0.0, 100.0);
            }
        }

        smoothed.push(to_action(time_ms, pos));
        last_time = time_ms;
        last_pos = Some(pos);
    }

    smoothed
}

/// Remap extreme positions toward the center in calm scenes.
///
/// High-intensity samples keep their extremes; low-intensity samples map
/// `[0,10] → [35,55]` and `[90,100] → [45,65]`; medium intensity maps
/// `[0,10] → [30,50]` and `[90,100] → [50,70]`. Non-extreme values are
/// never touched, and without a raw signal this is a no-op.
fn adjust_position_by_intensity(
    value: f64,
    time_ms: i64,
    step_ms: f64,
    signal: Option<&[f32]>,
    thresholds: Option<(f64, f64)>,
) -> f64 {
    let (Some(signal), Some((low_threshold, high_threshold))) = (signal, thresholds) else {
        return value;
    };

    let frame_idx = (time_ms as f64 / step_ms).round() as i64;
    if frame_idx < 0 || frame_idx as usize >= signal.len() {
        return value;
    }

    let is_extreme = value <= 10.0 || value >= 90.0;
    if !is_extreme {
        return value;
    }

    let intensity = (signal[frame_idx as usize] as f64).abs();
    if intensity > high_threshold {
        return value;
    }

    if intensity < low_threshold {
        if value <= 10.0 {
            35.0 + (value / 10.0) * 20.0
        } else {
            45.0 + ((value - 90.0) / 10.0) * 20.0
        }
    } else if value <= 10.0 {
        30.0 + (value / 10.0) * 20.0
    } else {
        50.0 + ((value - 90.0) / 10.0) * 20.0
    }
}

fn to_action(at: i64, pos: f64) -> Action {
    Action {
        at,
        pos: pos.round().clamp(0.0, 100.0) as u8,
    }
}

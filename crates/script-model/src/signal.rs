//! Per-frame prediction signal and its CSV side file.
//!
//! The signal is produced once per `(video, model)` pair by the inference
//! driver and persisted next to the video as
//! `<video stem>.<model stem>.csv`. It is immutable after creation; all
//! downstream stages read it by value.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Fallback frame rate when the source reports none.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// CSV header of the prediction side file.
pub const PREDICTION_CSV_HEADER: &str = "frame_index,timestamp_ms,predicted_change";

/// One per-frame prediction sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    /// Zero-based index of the decoded frame.
    pub frame_index: u32,

    /// Presentation time of the frame in milliseconds.
    pub timestamp_ms: f64,

    /// Predicted intensity change for this frame.
    pub value: f32,
}

/// Ordered per-frame prediction signal for one video.
///
/// Frame indices and timestamps are strictly increasing. The first
/// `sequence_length - 1` values are exactly 0 (the model has no full
/// window yet).
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignal {
    samples: Vec<SignalSample>,
    frame_rate: f64,
}

/// Errors raised by script-model persistence.
#[derive(Debug, thiserror::Error)]
pub enum ScriptModelError {
    #[error("IO error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },
}

impl RawSignal {
    /// Build a signal from per-frame values at a fixed frame rate.
    ///
    /// Timestamps are derived as `frame_index * 1000 / frame_rate`.
    pub fn from_values(values: Vec<f32>, frame_rate: f64) -> Self {
        let frame_rate = if frame_rate <= 1e-3 {
            FALLBACK_FRAME_RATE
        } else {
            frame_rate
        };
        let frame_ms = 1000.0 / frame_rate;
        let samples = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| SignalSample {
                frame_index: i as u32,
                timestamp_ms: i as f64 * frame_ms,
                value,
            })
            .collect();
        Self {
            samples,
            frame_rate,
        }
    }

    /// Build a signal from explicit samples (segment sampling produces
    /// non-contiguous frame indices).
    pub fn from_samples(mut samples: Vec<SignalSample>, frame_rate: f64) -> Self {
        samples.sort_by_key(|s| s.frame_index);
        samples.dedup_by_key(|s| s.frame_index);
        Self {
            samples,
            frame_rate: if frame_rate <= 1e-3 {
                FALLBACK_FRAME_RATE
            } else {
                frame_rate
            },
        }
    }

    pub fn samples(&self) -> &[SignalSample] {
        &self.samples
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Prediction values as a contiguous slice-friendly vec.
    pub fn values(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Write the signal to its CSV side file.
    ///
    /// Format: `frame_index,timestamp_ms,predicted_change`, timestamps to
    /// 6 decimal places, predictions to 9.
    pub fn write_csv(&self, path: &Path) -> Result<(), ScriptModelError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ScriptModelError::Io {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        let mut out = String::with_capacity(self.samples.len() * 32 + 64);
        out.push_str(PREDICTION_CSV_HEADER);
        out.push('\n');
        for sample in &self.samples {
            out.push_str(&format!(
                "{},{:.6},{:.9}\n",
                sample.frame_index, sample.timestamp_ms, sample.value
            ));
        }

        std::fs::write(path, out).map_err(|e| ScriptModelError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read a signal back from a CSV side file.
    ///
    /// The frame rate is re-derived from the timestamp column, matching
    /// the behavior of regeneration runs that only have the side file.
    pub fn read_csv(path: &Path) -> Result<Self, ScriptModelError> {
        let content = std::fs::read_to_string(path).map_err(|e| ScriptModelError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or_else(|| ScriptModelError::Parse {
            message: "empty prediction CSV".to_string(),
        })?;
        if header.trim() != PREDICTION_CSV_HEADER {
            return Err(ScriptModelError::Parse {
                message: format!("unexpected CSV header: {header}"),
            });
        }

        let mut samples = Vec::new();
        for (line_no, line) in lines.enumerate() {
            let row = line_no + 2;
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != 3 {
                return Err(ScriptModelError::Parse {
                    message: format!("row {row}: expected 3 fields, found {}", fields.len()),
                });
            }
            let frame_index: u32 =
                fields[0]
                    .trim()
                    .parse()
                    .map_err(|e| ScriptModelError::Parse {
                        message: format!("row {row}: bad frame_index: {e}"),
                    })?;
            let timestamp_ms: f64 =
                fields[1]
                    .trim()
                    .parse()
                    .map_err(|e| ScriptModelError::Parse {
                        message: format!("row {row}: bad timestamp_ms: {e}"),
                    })?;
            let value: f32 = fields[2]
                .trim()
                .parse()
                .map_err(|e| ScriptModelError::Parse {
                    message: format!("row {row}: bad predicted_change: {e}"),
                })?;
            samples.push(SignalSample {
                frame_index,
                timestamp_ms,
                value,
            });
        }

        let frame_rate = derive_frame_rate(&samples);
        Ok(Self::from_samples(samples, frame_rate))
    }
}

/// Infer the frame rate from sample timestamps.
fn derive_frame_rate(samples: &[SignalSample]) -> f64 {
    if samples.len() < 2 {
        return FALLBACK_FRAME_RATE;
    }
    let duration_ms = samples[samples.len() - 1].timestamp_ms - samples[0].timestamp_ms;
    if duration_ms <= 0.0 {
        return FALLBACK_FRAME_RATE;
    }
    (samples.len() as f64 / duration_ms) * 1000.0
}

/// Side-file path for a `(video, model)` pair: `<video stem>.<model stem>.csv`
/// next to the video.
pub fn resolve_prediction_path(video_path: &Path, model_path: &Path) -> PathBuf {
    let video_stem = stem_of(video_path);
    let model_stem = stem_of(model_path);
    let dir = video_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{video_stem}.{model_stem}.csv"))
}

/// Output script path for a video: `<video stem>.funscript` next to it.
pub fn resolve_script_path(video_path: &Path) -> PathBuf {
    let dir = video_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}.funscript", stem_of(video_path)))
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

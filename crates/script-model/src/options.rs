//! Postprocessing parameters.

use serde::{Deserialize, Serialize};

/// User-tunable postprocessing options.
///
/// Either supplied directly or produced by the parameter recommender.
/// Treated as a value object; never mutated after construction. Defaults
/// sit at the midpoint of each recommender interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostprocessOptions {
    /// Moving-average window applied to the denoised signal, in frames.
    pub smooth_window_frames: usize,

    /// Extremum prominence threshold as a fraction of the signal range.
    pub prominence_ratio: f64,

    /// Absolute prominence floor for extremum selection.
    pub min_prominence: f64,

    /// Maximum position change per frame for fast segments.
    pub max_slope: f64,

    /// Intermediate cap used when boosting weak strokes.
    pub boost_slope: f64,

    /// Minimum position change per frame; slower segments are dropped.
    pub min_slope: f64,

    /// Extrema closer than this are merged into one keyframe.
    pub merge_threshold_ms: f64,

    /// Whether to FFT-denoise the signal before smoothing.
    pub fft_denoise: bool,

    /// Frames per retained frequency component during FFT denoising.
    pub fft_frames_per_component: usize,

    /// FFT denoising window length in frames.
    pub fft_window_frames: usize,
}

impl Default for PostprocessOptions {
    fn default() -> Self {
        Self {
            smooth_window_frames: 7,
            prominence_ratio: 0.15,
            min_prominence: 0.0075,
            max_slope: 3.25,
            boost_slope: 2.25,
            min_slope: 2.25,
            merge_threshold_ms: 225.0,
            fft_denoise: true,
            fft_frames_per_component: 10,
            fft_window_frames: 120,
        }
    }
}

/// Options resolved against the frame rate of a concrete video.
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessConfig {
    pub frame_rate: f64,
    pub smooth_window_frames: usize,
    pub prominence_ratio: f64,
    pub min_prominence: f64,
    pub max_slope: f64,
    pub boost_slope: f64,
    pub min_slope: f64,
    pub merge_threshold_ms: f64,
    pub fft_denoise: bool,
    pub fft_frames_per_component: usize,
    pub fft_window_frames: usize,
}

impl PostprocessConfig {
    /// Bind options to a concrete frame rate.
    pub fn from_options(options: &PostprocessOptions, frame_rate: f64) -> Self {
        Self {
            frame_rate,
            smooth_window_frames: options.smooth_window_frames,
            prominence_ratio: options.prominence_ratio,
            min_prominence: options.min_prominence,
            max_slope: options.max_slope,
            boost_slope: options.boost_slope,
            min_slope: options.min_slope,
            merge_threshold_ms: options.merge_threshold_ms,
            fft_denoise: options.fft_denoise,
            fft_frames_per_component: options.fft_frames_per_component,
            fft_window_frames: options.fft_window_frames,
        }
    }
}

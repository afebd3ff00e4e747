//! Parameter recommendation from signal features.
//!
//! Four independent estimators each map one aspect of the signal to a
//! slice of the postprocessing options; a fixed precedence combines
//! them. Frequency wins the contended fields, amplitude and smoothness
//! fill theirs, and the intensity distribution adjusts the combined
//! prominence last.

use fungen_script_model::PostprocessOptions;

use crate::features::SignalFeatures;

/// A recommendation produced from one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    /// The combined options.
    pub options: PostprocessOptions,

    /// Features the recommendation was derived from.
    pub features: SignalFeatures,

    /// Prominence before the intensity adjustment was applied.
    pub base_prominence_ratio: f64,

    /// Multiplier applied to the base prominence, in `[0.8, 1.2]`.
    pub intensity_adjustment: f64,

    /// Human-readable explanation of the thresholds that fired.
    pub reasoning: String,
}

/// Frequency-derived parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyRecommendation {
    /// In `[1.5, 3.0]`; high frequency → low slope.
    pub min_slope: f64,
    /// In `[150, 300]` ms.
    pub merge_threshold_ms: f64,
    /// In `[0.10, 0.20]`.
    pub prominence_ratio: f64,
}

/// Amplitude-derived parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeRecommendation {
    /// In `[2.5, 4.0]`.
    pub max_slope: f64,
    /// In `[1.5, 3.0]`.
    pub boost_slope: f64,
    /// 5–8 frames; higher variability keeps a shorter window.
    pub smooth_window_frames: usize,
}

/// Smoothness-derived parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothnessRecommendation {
    /// In `[0.10, 0.20]`.
    pub prominence_ratio: f64,
    /// In `[0, 0.015]`.
    pub min_prominence: f64,
}

/// Intensity-distribution adjustment of the combined prominence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityRecommendation {
    /// Adjusted prominence, clamped back into `[0.10, 0.20]`.
    pub prominence_ratio: f64,
    /// The applied factor, in `[0.8, 1.2]`.
    pub adjustment_factor: f64,
}

/// Recommend postprocessing parameters for a raw prediction signal.
pub fn recommend_parameters(signal: &[f32]) -> Recommendation {
    let features = SignalFeatures::extract(signal);
    recommend_from_features(features)
}

/// Recommend from already-extracted features.
pub fn recommend_from_features(features: SignalFeatures) -> Recommendation {
    let freq = recommend_by_frequency(&features);
    let amp = recommend_by_amplitude(&features);
    let smooth = recommend_by_smoothness(&features);

    let base_prominence_ratio = freq.prominence_ratio.max(smooth.prominence_ratio);
    let intensity = recommend_by_intensity(&features, base_prominence_ratio);

    let mut options = PostprocessOptions {
        // Frequency has the highest priority on contended fields.
        min_slope: freq.min_slope,
        merge_threshold_ms: freq.merge_threshold_ms,
        max_slope: amp.max_slope,
        boost_slope: amp.boost_slope,
        smooth_window_frames: amp.smooth_window_frames,
        min_prominence: smooth.min_prominence,
        prominence_ratio: intensity.prominence_ratio,
        ..PostprocessOptions::default()
    };

    // FFT denoising is always on; the component size follows the period
    // when a clear periodic component exists.
    options.fft_denoise = true;
    options.fft_frames_per_component =
        if features.main_frequency > 0.01 && features.period_length > 0.0 {
            ((features.period_length / 2.0) as usize).clamp(5, 20)
        } else {
            10
        };

    let reasoning = generate_reasoning(&features, intensity.adjustment_factor);
    tracing::debug!(
        prominence_ratio = options.prominence_ratio,
        merge_threshold_ms = options.merge_threshold_ms,
        "parameter recommendation computed"
    );

    Recommendation {
        options,
        features,
        base_prominence_ratio,
        intensity_adjustment: intensity.adjustment_factor,
        reasoning,
    }
}

/// Map frequency characteristics to slope and merge parameters.
///
/// Higher frequency → lower min slope and shorter merge threshold.
pub fn recommend_by_frequency(features: &SignalFeatures) -> FrequencyRecommendation {
    let freq_normalized = (features.main_frequency * 100.0).min(1.0);

    let min_slope = (1.5 + 1.5 * (1.0 - freq_normalized)).clamp(1.5, 3.0);

    let merge_threshold_ms = if features.period_length > 0.0 {
        let period_ms = (features.period_length / 30.0) * 1000.0;
        (period_ms * 0.15).clamp(150.0, 300.0)
    } else {
        150.0 + (300.0 - 150.0) * (1.0 - freq_normalized)
    };

    let prominence_ratio = 0.10 + features.extrema_density.min(0.10);

    FrequencyRecommendation {
        min_slope,
        merge_threshold_ms,
        prominence_ratio,
    }
}

/// Map amplitude characteristics to slope caps and the smoothing window.
///
/// Large amplitude changes → higher caps; high change variability →
/// shorter window to preserve detail.
pub fn recommend_by_amplitude(features: &SignalFeatures) -> AmplitudeRecommendation {
    let avg_amplitude = (features.mean_change + features.max_change) / 2.0;
    let range_normalized = if features.range > 0.0 {
        features.range.min(1.0)
    } else {
        0.0
    };
    let amplitude_normalized = ((avg_amplitude * 2.0 + range_normalized) / 2.0).min(1.0);

    let max_slope = 2.5 + 1.5 * amplitude_normalized;
    let boost_slope = 1.5 + 1.5 * amplitude_normalized;

    let smooth_window_frames = if features.std_change > 0.15 {
        5
    } else if features.std_change > 0.08 {
        6
    } else if features.std_change > 0.03 {
        7
    } else {
        8
    };

    AmplitudeRecommendation {
        max_slope,
        boost_slope,
        smooth_window_frames,
    }
}

/// Map smoothness/stability to prominence thresholds.
///
/// Rougher signal → higher thresholds to reject noise.
pub fn recommend_by_smoothness(features: &SignalFeatures) -> SmoothnessRecommendation {
    let combined = (features.smoothness + features.stability) / 2.0;

    SmoothnessRecommendation {
        prominence_ratio: 0.10 + 0.10 * (1.0 - combined),
        min_prominence: 0.015 * (1.0 - combined),
    }
}

/// Adjust the combined prominence by the intensity balance.
///
/// More high-intensity content lowers prominence (more actions allowed);
/// more low-intensity content raises it.
pub fn recommend_by_intensity(
    features: &SignalFeatures,
    base_prominence: f64,
) -> IntensityRecommendation {
    let balance = features.high_intensity_ratio - features.low_intensity_ratio;
    let adjustment_factor = (1.0
        - balance * 0.15 * (1.0 + features.intensity_variance.min(1.0)))
    .clamp(0.8, 1.2);

    IntensityRecommendation {
        prominence_ratio: (base_prominence * adjustment_factor).clamp(0.10, 0.20),
        adjustment_factor,
    }
}

/// Assemble the human-readable explanation from the thresholds crossed.
fn generate_reasoning(features: &SignalFeatures, adjustment_factor: f64) -> String {
    let mut parts: Vec<String> = Vec::new();

    if features.main_frequency > 0.01 {
        parts.push(format!(
            "Signal shows periodic behavior (frequency: {:.4})",
            features.main_frequency
        ));
    } else {
        parts.push("Signal shows low or no clear periodicity".to_string());
    }

    if features.mean_change > 0.1 {
        parts.push("Large amplitude changes detected".to_string());
    } else if features.mean_change > 0.05 {
        parts.push("Moderate amplitude changes".to_string());
    } else {
        parts.push("Small amplitude changes".to_string());
    }

    if features.smoothness < 0.5 {
        parts.push("Signal is relatively rough, using higher prominence thresholds".to_string());
    } else if features.smoothness > 0.7 {
        parts.push("Signal is smooth, using lower prominence thresholds".to_string());
    }

    if features.high_intensity_ratio > 0.3 {
        parts.push(format!(
            "High-intensity regions detected ({:.1}%), allowing more actions for climax scenes",
            features.high_intensity_ratio * 100.0
        ));
    }
    if features.low_intensity_ratio > 0.3 {
        parts.push(format!(
            "Low-intensity regions detected ({:.1}%), reducing actions for calm scenes",
            features.low_intensity_ratio * 100.0
        ));
    }

    if (adjustment_factor - 1.0).abs() > 0.05 {
        if adjustment_factor < 1.0 {
            parts.push(format!(
                "Adjusted prominence for more dynamic experience (factor: {adjustment_factor:.2})"
            ));
        } else {
            parts.push(format!(
                "Adjusted prominence for smoother experience (factor: {adjustment_factor:.2})"
            ));
        }
    }

    if features.extrema_density > 0.1 {
        parts.push("High density of extrema points, filtering with prominence".to_string());
    } else if features.extrema_density < 0.02 {
        parts.push("Low density of extrema points".to_string());
    }

    if parts.is_empty() {
        return "Standard parameters recommended based on signal analysis".to_string();
    }
    parts.join(". ") + "."
}

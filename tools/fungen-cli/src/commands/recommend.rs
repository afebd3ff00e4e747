//! Analyze a prediction CSV and recommend parameters.

use std::path::PathBuf;

use fungen_processing_core::recommend_parameters;
use fungen_script_model::RawSignal;

pub fn run(csv: PathBuf, print_features: bool) -> anyhow::Result<()> {
    let signal = RawSignal::read_csv(&csv)
        .map_err(|e| anyhow::anyhow!("Failed to read prediction CSV: {e}"))?;

    println!("Analyzing: {}", csv.display());
    println!("  {} frames at {:.2} fps", signal.len(), signal.frame_rate());

    let recommendation = recommend_parameters(&signal.values());
    let options = &recommendation.options;

    println!("\nRecommended parameters:");
    println!("  smooth_window_frames: {}", options.smooth_window_frames);
    println!("  prominence_ratio: {:.3}", options.prominence_ratio);
    println!(
        "    intensity adjustment factor: {:.2}",
        recommendation.intensity_adjustment
    );
    println!("  min_prominence: {:.4}", options.min_prominence);
    println!("  max_slope: {:.1}", options.max_slope);
    println!("  boost_slope: {:.1}", options.boost_slope);
    println!("  min_slope: {:.1}", options.min_slope);
    println!("  merge_threshold_ms: {:.1}", options.merge_threshold_ms);
    println!("  fft_denoise: {}", options.fft_denoise);
    println!(
        "  fft_frames_per_component: {}",
        options.fft_frames_per_component
    );

    println!("\nReasoning: {}", recommendation.reasoning);

    if print_features {
        let json = serde_json::to_string_pretty(&recommendation.features)?;
        println!("\nFeatures:\n{json}");
    }

    Ok(())
}

//! Generate a funscript from a prediction CSV.

use std::path::PathBuf;

use fungen_processing_core::{apply_postprocessing, build_actions, recommend_parameters};
use fungen_script_model::{
    Funscript, PostprocessConfig, PostprocessOptions, RawSignal, ScriptStats,
};

pub struct Args {
    pub csv: PathBuf,
    pub output: Option<PathBuf>,
    pub model_name: String,
    pub auto: bool,
    pub options: PostprocessOptions,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let signal = RawSignal::read_csv(&args.csv)
        .map_err(|e| anyhow::anyhow!("Failed to read prediction CSV: {e}"))?;

    println!("Loaded {} frames at {:.2} fps", signal.len(), signal.frame_rate());

    let options = if args.auto {
        let recommendation = recommend_parameters(&signal.values());
        println!("Auto-recommended parameters: {}", recommendation.reasoning);
        recommendation.options
    } else {
        args.options
    };

    let config = PostprocessConfig::from_options(&options, signal.frame_rate());
    let outcome = apply_postprocessing(&signal, &config);
    println!("  Selected {} keyframes", outcome.graph_points.len());

    let actions = build_actions(&outcome);
    let script = Funscript::new(actions, &args.model_name, &options);

    let output = args.output.unwrap_or_else(|| {
        let stem = args
            .csv
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        args.csv
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
            .join(format!("{stem}.funscript"))
    });

    script
        .save(&output)
        .map_err(|e| anyhow::anyhow!("Failed to write funscript: {e}"))?;
    println!("Saved: {}", output.display());

    let stats = ScriptStats::from_actions(&script.actions);
    println!("\nScript statistics:");
    println!("  actions: {}", stats.action_count);
    println!("  duration: {:.1}s", stats.duration_ms as f64 / 1000.0);
    println!("  mean interval: {:.1}ms", stats.mean_interval_ms);
    println!("  action rate: {:.2} actions/s", stats.actions_per_second);
    println!("  mean position delta: {:.2}", stats.mean_position_delta);
    println!(
        "  extreme positions: {:.1}%",
        stats.extreme_position_ratio * 100.0
    );
    println!(
        "  center positions: {:.1}%",
        stats.center_position_ratio * 100.0
    );

    Ok(())
}

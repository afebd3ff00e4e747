//! Show statistics for a generated funscript.

use std::path::PathBuf;

use fungen_script_model::{Funscript, ScriptStats};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let script =
        Funscript::load(&path).map_err(|e| anyhow::anyhow!("Failed to load funscript: {e}"))?;

    println!("Script: {}", path.display());
    println!(
        "  generator: {} {} (model: {})",
        script.generator.name, script.generator.version, script.generator.model
    );
    println!("  inverted: {}, range: {}", script.inverted, script.range);

    let stats = ScriptStats::from_actions(&script.actions);
    println!("\nStatistics:");
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
    println!("  fast changes: {:.1}%", stats.fast_change_ratio * 100.0);
    println!("  slow changes: {:.1}%", stats.slow_change_ratio * 100.0);

    Ok(())
}

//! Funscript document schema, persistence, and statistics.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::options::PostprocessOptions;
use crate::signal::ScriptModelError;

/// Generator name recorded in produced scripts.
pub const GENERATOR_NAME: &str = "FunGen";

/// One timed position command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Time in milliseconds, strictly increasing across a script.
    pub at: i64,

    /// Device position in `[0, 100]`.
    pub pos: u8,
}

/// A denoised keyframe selected by the extrema/merge stage.
///
/// `position` is a frame-index-like coordinate; `value` is a 0–100
/// position. Positions are strictly increasing after merging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphPoint {
    pub position: f64,
    pub value: f64,
}

/// Metadata about the tool run that produced a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorInfo {
    pub name: String,
    pub version: String,
    pub model: String,
    pub options: PostprocessOptions,
}

/// The persisted funscript document. Owned solely by this serializer;
/// never mutated after write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funscript {
    pub version: String,
    pub inverted: bool,
    pub range: u32,
    pub actions: Vec<Action>,
    pub generator: GeneratorInfo,
}

impl Funscript {
    /// Assemble a document around a finished action list.
    pub fn new(actions: Vec<Action>, model_name: &str, options: &PostprocessOptions) -> Self {
        Self {
            version: "1.0".to_string(),
            inverted: false,
            range: 100,
            actions,
            generator: GeneratorInfo {
                name: GENERATOR_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                model: model_name.to_string(),
                options: options.clone(),
            },
        }
    }

    /// Write the document as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ScriptModelError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ScriptModelError::Io {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ScriptModelError::Parse {
            message: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| ScriptModelError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a previously written document.
    pub fn load(path: &Path) -> Result<Self, ScriptModelError> {
        let content = std::fs::read_to_string(path).map_err(|e| ScriptModelError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ScriptModelError::Parse {
            message: e.to_string(),
        })
    }
}

/// Summary statistics over a script's action list.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScriptStats {
    pub action_count: usize,
    pub duration_ms: i64,
    pub mean_interval_ms: f64,
    pub actions_per_second: f64,
    pub mean_position_delta: f64,
    /// Fraction of actions at pos ≤ 10 or ≥ 90.
    pub extreme_position_ratio: f64,
    /// Fraction of actions at pos in 40–60.
    pub center_position_ratio: f64,
    /// Fraction of consecutive deltas > 50.
    pub fast_change_ratio: f64,
    /// Fraction of consecutive deltas < 5.
    pub slow_change_ratio: f64,
}

impl ScriptStats {
    pub fn from_actions(actions: &[Action]) -> Self {
        if actions.is_empty() {
            return Self::default();
        }

        let n = actions.len();
        let duration_ms = actions[n - 1].at - actions[0].at;

        let intervals: Vec<i64> = actions.windows(2).map(|w| w[1].at - w[0].at).collect();
        let deltas: Vec<i64> = actions
            .windows(2)
            .map(|w| (w[1].pos as i64 - w[0].pos as i64).abs())
            .collect();

        let mean_interval_ms = if intervals.is_empty() {
            0.0
        } else {
            intervals.iter().sum::<i64>() as f64 / intervals.len() as f64
        };
        let mean_position_delta = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().sum::<i64>() as f64 / deltas.len() as f64
        };
        let actions_per_second = if duration_ms > 0 {
            n as f64 / (duration_ms as f64 / 1000.0)
        } else {
            0.0
        };

        let ratio = |count: usize, total: usize| {
            if total > 0 {
                count as f64 / total as f64
            } else {
                0.0
            }
        };

        Self {
            action_count: n,
            duration_ms,
            mean_interval_ms,
            actions_per_second,
            mean_position_delta,
            extreme_position_ratio: ratio(
                actions.iter().filter(|a| a.pos <= 10 || a.pos >= 90).count(),
                n,
            ),
            center_position_ratio: ratio(
                actions
                    .iter()
                    .filter(|a| (40..=60).contains(&a.pos))
                    .count(),
                n,
            ),
            fast_change_ratio: ratio(deltas.iter().filter(|&&d| d > 50).count(), deltas.len()),
            slow_change_ratio: ratio(deltas.iter().filter(|&&d| d < 5).count(), deltas.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_script() -> Funscript {
        Funscript::new(
            vec![
                Action { at: 0, pos: 50 },
                Action { at: 120, pos: 80 },
                Action { at: 260, pos: 20 },
            ],
            "conv_tcn_62",
            &PostprocessOptions::default(),
        )
    }

    #[test]
    fn test_document_schema() {
        let script = sample_script();
        let json = serde_json::to_value(&script).unwrap();
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["inverted"], false);
        assert_eq!(json["range"], 100);
        assert_eq!(json["actions"][1]["at"], 120);
        assert_eq!(json["actions"][1]["pos"], 80);
        assert_eq!(json["generator"]["name"], GENERATOR_NAME);
        assert_eq!(json["generator"]["model"], "conv_tcn_62");
        assert!(json["generator"]["options"]["prominence_ratio"].is_number());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = std::env::temp_dir().join("fungen-script-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("clip.funscript");

        let script = sample_script();
        script.save(&path).unwrap();
        let loaded = Funscript::load(&path).unwrap();
        assert_eq!(script, loaded);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_stats() {
        let actions = vec![
            Action { at: 0, pos: 5 },
            Action { at: 100, pos: 95 },
            Action { at: 300, pos: 50 },
            Action { at: 400, pos: 52 },
        ];
        let stats = ScriptStats::from_actions(&actions);
        assert_eq!(stats.action_count, 4);
        assert_eq!(stats.duration_ms, 400);
        assert!((stats.actions_per_second - 10.0).abs() < 1e-9);
        assert!((stats.extreme_position_ratio - 0.5).abs() < 1e-9);
        assert!((stats.center_position_ratio - 0.5).abs() < 1e-9);
        // deltas: 90, 45, 2 → one fast, one slow
        assert!((stats.fast_change_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert!((stats.slow_change_ratio - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stats() {
        let stats = ScriptStats::from_actions(&[]);
        assert_eq!(stats.action_count, 0);
        assert_eq!(stats.duration_ms, 0);
    }

    proptest::proptest! {
        /// All ratio statistics stay in [0, 1] for any action list.
        #[test]
        fn prop_stats_ratios_bounded(
            raw in proptest::collection::vec((0i64..1_000_000, 0u8..=100), 0..200)
        ) {
            let mut actions: Vec<Action> =
                raw.into_iter().map(|(at, pos)| Action { at, pos }).collect();
            actions.sort_by_key(|a| a.at);
            actions.dedup_by_key(|a| a.at);

            let stats = ScriptStats::from_actions(&actions);
            for ratio in [
                stats.extreme_position_ratio,
                stats.center_position_ratio,
                stats.fast_change_ratio,
                stats.slow_change_ratio,
            ] {
                proptest::prop_assert!((0.0..=1.0).contains(&ratio));
            }
            proptest::prop_assert!(stats.duration_ms >= 0);
            proptest::prop_assert!(stats.mean_interval_ms >= 0.0);
        }
    }
}

//! FunGen Processing Core
//!
//! Turns a raw per-frame prediction signal into a sparse, smooth action
//! script:
//! - **Features:** frequency, extrema, smoothness, periodicity, stability
//!   and intensity-distribution statistics of the raw signal
//! - **Recommend:** map those features to postprocessing parameters
//! - **Postprocess:** denoise, select keyframes, synthesize the envelope
//! - **Actions:** convert keyframes into timed, velocity-bounded commands
//!
//! This crate is pure computation — no I/O, no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod actions;
pub mod denoise;
pub mod features;
pub mod peaks;
pub mod postprocess;
pub mod recommend;

pub use actions::build_actions;
pub use features::SignalFeatures;
pub use postprocess::{apply_postprocessing, PostprocessOutcome};
pub use recommend::{recommend_parameters, Recommendation};

//! FunGen Script Model
//!
//! Defines the core data contracts for FunGen:
//! - **Signal:** Per-frame prediction samples and their CSV side file
//! - **Options:** Postprocessing parameters and their resolved config
//! - **Script:** Funscript actions, document schema, and statistics
//!
//! Prediction side files are keyed by `(video stem, model stem)` so a
//! re-run with the same model reuses the cached signal instead of
//! decoding the video again.

pub mod options;
pub mod script;
pub mod signal;

pub use options::*;
pub use script::*;
pub use signal::*;

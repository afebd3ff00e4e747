//! FunGen Inference
//!
//! Runs a windowed sequence model over decoded video frames to produce
//! the per-frame prediction signal:
//! - **Frames:** frame source contract and model-input preprocessing
//! - **Model:** the opaque sequence-model contract
//! - **Driver:** full-video windowed inference with progress/cancellation
//! - **Sampling:** representative-segment quick pass for recommendations
//!
//! Decoding backends and model runtimes plug in behind the `FrameSource`
//! and `SequenceModel` traits; this crate never selects them.

pub mod driver;
pub mod frames;
pub mod model;
pub mod sampling;

pub use driver::{run_inference, InferenceOutput};
pub use frames::{Frame, FrameSource};
pub use model::{PreparedFrame, SequenceModel};
pub use sampling::{sample_signal, segment_count_for, select_segments, Segment};

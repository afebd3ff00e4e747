//! Error types shared across FunGen crates.

/// Top-level error type for FunGen operations.
#[derive(Debug, thiserror::Error)]
pub enum FungenError {
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Zero usable frames were decoded. Distinct from `Decode` so callers
    /// can suggest re-encoding or trimming the source.
    #[error("No frames decoded from video")]
    NoFrames,

    /// User-initiated stop. A value, not a failure — callers match on it
    /// to distinguish cancellation from errors.
    #[error("Processing cancelled")]
    Cancelled,

    #[error("Model error: {message}")]
    Model { message: String },

    #[error("Script error: {message}")]
    Script { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FungenError.
pub type FungenResult<T> = Result<T, FungenError>;

impl FungenError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model {
            message: msg.into(),
        }
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error represents a user-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

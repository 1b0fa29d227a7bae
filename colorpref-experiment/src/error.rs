use colorpref_core::Marker;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExperimentError>;

#[derive(Debug, Error)]
pub enum ExperimentError {
    /// The subject pressed the abort key. Not a failure: the session unwinds
    /// and every owned resource is released on the way out.
    #[error("session aborted by subject")]
    Aborted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("marker {marker} out of order (previous: {previous:?})")]
    MarkerOrder {
        marker: Marker,
        previous: Option<Marker>,
    },

    #[error("display error: {message}")]
    Display { message: String },

    #[error("input source closed")]
    InputClosed,
}

impl ExperimentError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn display(message: impl Into<String>) -> Self {
        Self::Display {
            message: message.into(),
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

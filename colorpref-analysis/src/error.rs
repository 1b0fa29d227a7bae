use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No qualifying trials for a condition. Reported per condition, never
    /// propagated as a NaN.
    #[error("insufficient data for {condition}")]
    InsufficientData { condition: String },
}

impl AnalysisError {
    pub fn insufficient(condition: impl Into<String>) -> Self {
        Self::InsufficientData {
            condition: condition.into(),
        }
    }
}

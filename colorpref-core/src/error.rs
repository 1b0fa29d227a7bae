use thiserror::Error;

/// Failure to decode one trial-log token or line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("malformed {what}: {input:?}")]
    Malformed { what: &'static str, input: String },

    #[error("expected {expected} tokens, found {found}")]
    TokenCount { expected: usize, found: usize },

    #[error("unrecognized log line: {0:?}")]
    Unrecognized(String),
}

impl ParseError {
    pub fn malformed(what: &'static str, input: &str) -> Self {
        Self::Malformed {
            what,
            input: input.to_string(),
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the evaluation core and its provider clients.
///
/// `Configuration` and `MissingInputFile` abort a run. Everything else is
/// recoverable per question and downgraded to a zero-score row by the
/// evaluation loop.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model returned malformed JSON:\n\n{raw}")]
    MalformedOutput { raw: String },

    #[error("missing ground truth for question: {0}")]
    MissingGroundTruth(String),

    #[error("invalid input record: {0}")]
    InvalidRecord(String),

    #[error("input file not found: {}", .0.display())]
    MissingInputFile(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{provider} request failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EvalError {
    pub fn malformed(raw: impl Into<String>) -> Self {
        Self::MalformedOutput { raw: raw.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

use std::path::PathBuf;

/// Failure conditions raised by the pipeline stages.
///
/// Only `Summarization` is recovered from (it is stored on the paper's
/// result); every other variant aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("Paper source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Failed to parse feed: {0}")]
    Parse(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("Failed to encode digest: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ScoutError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScoutError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;

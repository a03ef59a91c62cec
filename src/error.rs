use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HoardError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tag data: {0}")]
    Tag(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("catalog {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },

    #[error("tracker is no longer running")]
    TrackerStopped,
}

impl HoardError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HoardError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HoardError>;

//! Error taxonomy shared by every pipeline step.
//!
//! Steps return these unchanged; the sequencer never wraps or translates
//! them, so the first failure a caller sees is the one that aborted the run.

use std::io;
use std::path::{Path, PathBuf};

/// Errors produced while resolving configuration or running pipeline steps.
#[derive(Debug, thiserror::Error)]
pub enum WebjarError {
    /// Bad or missing package metadata, settings template, config file, or glob.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Filesystem copy/delete failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Archive build or external packaging tool failure.
    #[error("packaging error: {0}")]
    Packaging(String),

    /// Publish/deploy failure against a remote repository.
    #[error("network error publishing to {repository}: {message}")]
    Network { repository: String, message: String },
}

impl WebjarError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn packaging(msg: impl Into<String>) -> Self {
        Self::Packaging(msg.into())
    }

    pub fn network(repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            repository: repository.into(),
            message: message.into(),
        }
    }

    /// Short, stable label for the error class (used in reports).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Io { .. } => "io",
            Self::Packaging(_) => "packaging",
            Self::Network { .. } => "network",
        }
    }
}

pub type Result<T> = std::result::Result<T, WebjarError>;

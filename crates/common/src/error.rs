use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while recording, encoding or cleaning up.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The capture source reported a failure. Fatal to the running recording.
    #[error("capture failed: {0:#}")]
    Capture(#[source] anyhow::Error),

    /// An operation was called in a state that does not allow it.
    #[error("precondition failed: {0}")]
    Precondition(&'static str),

    /// `start()` was called outside a tokio runtime, so nothing can drive the capture loop.
    #[error("no tokio runtime to drive the capture loop")]
    NoRuntime,

    /// The video encoder failed. `stderr` carries its diagnostic output.
    #[error("encoder failed: {message}")]
    Encoder { message: String, stderr: String },

    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RecorderError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RecorderError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn encoder(message: impl Into<String>, stderr: impl Into<String>) -> Self {
        RecorderError::Encoder {
            message: message.into(),
            stderr: stderr.into(),
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, RecorderError::Precondition(_))
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;

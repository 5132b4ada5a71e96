//! Error kinds surfaced by the recording session.

use std::path::PathBuf;

use thiserror::Error;

use crate::encoder::EncodeError;

#[derive(Error, Debug)]
pub enum RecorderError {
    /// Invalid construction parameters. The session is never created.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The clip writer could not be opened. No handle is retained.
    #[error("failed to open clip {}: {source}", path.display())]
    ResourceCreation {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },

    /// Appending to an open clip failed. The clip has been closed and discarded.
    #[error("failed to write frame to clip {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("frame transform failed: {0}")]
    Transform(String),

    #[error("failed to spawn session actor: {0}")]
    ActorSpawn(#[source] std::io::Error),

    #[error("session actor is no longer running")]
    ActorGone,
}

pub type Result<T> = std::result::Result<T, RecorderError>;

//! Error types for the transport engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::contract::StoreError;

/// Errors raised by the transport engine.
///
/// `Config` is fatal and only produced at startup. `List` aborts a single
/// dispatch cycle. `Load`, `Upload` and `Cleanup` are local to one upload job.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Invalid configuration or failed startup check.
    #[error("{0}")]
    Config(String),

    /// The source directory could not be listed.
    #[error("failed to list {}: {source}", path.display())]
    List { path: PathBuf, source: io::Error },

    /// The file could not be opened, statted or compressed.
    #[error("failed to load {}: {source}", path.display())]
    Load { path: PathBuf, source: io::Error },

    /// The storage client rejected the object.
    #[error("failed to put object s3://{bucket}/{key}: {source}")]
    Upload {
        bucket: String,
        key: String,
        source: StoreError,
    },

    /// The object was stored but the local file could not be removed.
    #[error("failed to remove file {}: {source}", path.display())]
    Cleanup { path: PathBuf, source: io::Error },

    /// The cancellation signal fired.
    #[error("transporter cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether the next dispatch cycle may pick the same file up again.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::List { .. }
            | TransportError::Load { .. }
            | TransportError::Upload { .. }
            | TransportError::Cleanup { .. } => true,
            TransportError::Config(_) | TransportError::Cancelled => false,
        }
    }
}

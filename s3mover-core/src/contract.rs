//! # contract: storage interface consumed by the transport engine
//!
//! This module defines the single trait ([`ObjectStore`]) the engine uses to
//! write objects, plus the body type handed to it.
//!
//! ## Interface & Extensibility
//! - Implement [`ObjectStore`] to add a destination (S3, S3-compatible, in-memory).
//! - Methods are async and return a boxed error; the engine treats every error as
//!   retryable on the next dispatch cycle.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers can generate deterministic mocks
//!   (`MockObjectStore`) for unit and integration tests.

use std::fs::File;
use std::io::Read;

use async_trait::async_trait;
use bytes::Bytes;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error type returned by storage clients.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Content handed to [`ObjectStore::put_object`].
#[derive(Debug)]
pub enum PayloadBody {
    /// Open source file, streamed as-is.
    File(File),
    /// Fully materialised bytes (compressed payloads, probe objects).
    Bytes(Bytes),
}

impl PayloadBody {
    /// Reads the whole body into memory.
    ///
    /// Meant for in-memory stores and tests; real clients should stream.
    pub fn into_vec(self) -> std::io::Result<Vec<u8>> {
        match self {
            PayloadBody::File(mut file) => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)?;
                Ok(buf)
            }
            PayloadBody::Bytes(bytes) => Ok(bytes.to_vec()),
        }
    }
}

impl From<&'static [u8]> for PayloadBody {
    fn from(value: &'static [u8]) -> Self {
        PayloadBody::Bytes(Bytes::from_static(value))
    }
}

/// Trait for writing objects into a bucket.
///
/// The implementor is responsible for connecting to the backing service.
/// `length` is the exact number of bytes `body` yields.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` in `bucket`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: PayloadBody,
        length: u64,
    ) -> Result<(), StoreError>;
}

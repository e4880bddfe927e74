#![doc = "s3mover-core: transport engine for s3mover."]

//! This crate contains the directory-to-object-storage transport engine:
//! the dispatch loop, the bounded-concurrency upload pipeline, key generation,
//! payload encoding and the in-process metrics counters.
//! Concrete storage clients and process bootstrap live in the `s3mover` binary crate.
//!
//! # Usage
//! Build a [`config::TransportConfig`], validate it, hand it to
//! [`transport::Transporter::new`] together with an [`contract::ObjectStore`]
//! implementation and drive it with [`transport::Transporter::start`].

pub mod buffer_pool;
pub mod config;
pub mod contract;
pub mod error;
pub mod key;
pub mod metrics;
pub mod payload;
pub mod transport;

pub use config::TransportConfig;
pub use contract::{ObjectStore, PayloadBody, StoreError};
pub use error::TransportError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use transport::Transporter;

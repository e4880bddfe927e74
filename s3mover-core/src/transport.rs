//! Transport engine: moves every file of the source directory into the bucket.
//!
//! The engine is a loop of dispatch cycles. Each cycle rescans the source
//! directory, fans out one upload job per candidate file under a semaphore of
//! `max_parallels` permits and waits for every job before returning. Nothing is
//! tracked between cycles: a file that failed to upload is simply listed again.
//!
//! # Major Types
//! - [`Transporter`]: owns the config, storage client, semaphore, buffer pool and metrics
//!
//! # Cycle outcomes
//! - listing failed, nothing to do, or some jobs failed: sleep [`RETRY_WAIT`] and rescan
//! - every job succeeded: rescan immediately to drain a backlog
//!
//! # Error Handling
//! Job failures are logged and counted in [`Metrics`]; they never abort a cycle.
//! Only [`Transporter::init`] failures are fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::buffer_pool::BufferPool;
use crate::config::TransportConfig;
use crate::contract::{ObjectStore, PayloadBody};
use crate::error::TransportError;
use crate::key::generate_key;
use crate::metrics::Metrics;
use crate::payload::{self, Payload};

/// Interval between cycles after an error, an empty scan or a partial success.
pub const RETRY_WAIT: Duration = Duration::from_secs(1);

/// Marker used as the file name of the startup probe object.
pub const TEST_OBJECT_KEY: &str = ".s3mover-test-object";

/// Probe file created and removed in the source directory at startup.
const START_FILE: &str = ".start";

const PROBE_BODY: &[u8] = b"test";

pub struct Transporter<S: ObjectStore + ?Sized + 'static> {
    pipeline: Pipeline<S>,
    semaphore: Arc<Semaphore>,
    metrics: Arc<Metrics>,
    retry_wait: Duration,
}

/// Everything one upload job needs, cheap to clone into a task.
struct Pipeline<S: ObjectStore + ?Sized + 'static> {
    store: Arc<S>,
    config: Arc<TransportConfig>,
    pool: Arc<BufferPool>,
}

impl<S: ObjectStore + ?Sized + 'static> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<S: ObjectStore + ?Sized + 'static> Transporter<S> {
    /// `config` is expected to be validated already.
    pub fn new(config: TransportConfig, store: Arc<S>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallels.max(1)));
        let pool = Arc::new(BufferPool::new(
            crate::buffer_pool::DEFAULT_BUFFER_CAPACITY,
            config.max_parallels.max(1),
        ));
        debug!(
            buffers = pool.max_buffers(),
            capacity = pool.default_capacity(),
            "compression buffer pool ready"
        );
        Self {
            pipeline: Pipeline {
                store,
                config: Arc::new(config),
                pool,
            },
            semaphore,
            metrics: Arc::new(Metrics::new()),
            retry_wait: RETRY_WAIT,
        }
    }

    /// Overrides [`RETRY_WAIT`].
    pub fn with_retry_wait(mut self, retry_wait: Duration) -> Self {
        self.retry_wait = retry_wait;
        self
    }

    pub fn config(&self) -> &TransportConfig {
        &self.pipeline.config
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Runs the startup checks, then the dispatch loop until `cancel` fires.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<(), TransportError> {
        self.init().await?;
        info!(component = "transporter", "starting up");
        match self.run(cancel).await {
            Ok(()) | Err(TransportError::Cancelled) => {
                info!(component = "transporter", "shutdown");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Verifies the source directory is usable and the bucket accepts writes.
    ///
    /// The probe object is written under a key containing [`TEST_OBJECT_KEY`]
    /// and is not counted in [`Metrics`].
    pub async fn init(&self) -> Result<(), TransportError> {
        let config = &self.pipeline.config;
        let src = &config.src_dir;

        let stat = tokio::fs::metadata(src).await.map_err(|e| {
            TransportError::Config(format!("failed to stat {}: {e}", src.display()))
        })?;
        if !stat.is_dir() {
            return Err(TransportError::Config(format!(
                "{} is not a directory",
                src.display()
            )));
        }

        let start_file = src.join(START_FILE);
        tokio::fs::File::create(&start_file).await.map_err(|e| {
            TransportError::Config(format!("failed to create {}: {e}", start_file.display()))
        })?;
        tokio::fs::remove_file(&start_file).await.map_err(|e| {
            TransportError::Config(format!("failed to remove {}: {e}", start_file.display()))
        })?;
        debug!(path = %start_file.display(), "source directory is writable");

        let key = generate_key(
            &config.key_prefix,
            TEST_OBJECT_KEY,
            SystemTime::now(),
            false,
            &config.time_format,
            config.time_zone,
        );
        self.pipeline
            .store
            .put_object(
                &config.bucket,
                &key,
                PayloadBody::from(PROBE_BODY),
                PROBE_BODY.len() as u64,
            )
            .await
            .map_err(|e| {
                TransportError::Config(format!("failed to put object to {}: {e}", config.bucket))
            })?;
        info!(s3url = %format!("s3://{}/{}", config.bucket, key), "bucket is writable");
        Ok(())
    }

    /// Dispatch cycles until `cancel` fires; always ends with [`TransportError::Cancelled`].
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), TransportError> {
        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            match self.run_once(cancel).await {
                Err(e) => {
                    warn!(error = %e, "retry after {:?}", self.retry_wait);
                    self.sleep(cancel).await;
                }
                Ok((_, 0)) => {
                    debug!("no files to upload");
                    self.sleep(cancel).await;
                }
                Ok((processed, total)) if processed == total => {
                    info!(processed, total, "succeeded to transport all files");
                }
                Ok((processed, total)) => {
                    warn!(processed, total, "some files are remaining");
                    self.sleep(cancel).await;
                }
            }
        }
    }

    /// One dispatch cycle. Returns `(processed, total)`.
    ///
    /// `total` is the number of candidates seen when the cycle started. Once
    /// `cancel` fires no further jobs are launched, but jobs already running
    /// are awaited.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<(u64, u64), TransportError> {
        let src = self.pipeline.config.src_dir.clone();
        let paths = {
            let src = src.clone();
            tokio::task::spawn_blocking(move || payload::list_files(&src))
        }
        .await
        .map_err(std::io::Error::other)
        .and_then(|listed| listed)
        .map_err(|source| TransportError::List { path: src, source })?;
        if paths.is_empty() {
            return Ok((0, 0));
        }

        let total = paths.len() as u64;
        self.metrics.set_queued(total as i64);

        let mut jobs = JoinSet::new();
        for path in paths {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("cancelled, not launching remaining uploads");
                    break;
                }
                permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    // the semaphore is never closed
                    Err(_) => break,
                },
            };
            let pipeline = self.pipeline.clone();
            let metrics = Arc::clone(&self.metrics);
            jobs.spawn(async move {
                let _permit = permit;
                let result = pipeline.process(&path).await;
                match &result {
                    Ok(()) => metrics.put_object(true),
                    Err(e) => {
                        metrics.put_object(false);
                        warn!(error = %e, retryable = e.is_retryable(), "upload job failed");
                    }
                }
                metrics.dequeue();
                result.is_ok()
            });
        }

        let mut processed = 0;
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(e) => {
                    self.metrics.put_object(false);
                    error!(error = %e, "upload job aborted");
                }
            }
        }
        self.metrics.set_queued(0);
        Ok((processed, total))
    }

    /// Uploads one file and removes it locally.
    pub async fn process(&self, path: &Path) -> Result<(), TransportError> {
        self.pipeline.process(path).await
    }

    async fn sleep(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.retry_wait) => {}
        }
    }
}

impl<S: ObjectStore + ?Sized + 'static> Pipeline<S> {
    async fn process(&self, path: &Path) -> Result<(), TransportError> {
        debug!(path = %path.display(), "processing");
        let filename = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => {
                return Err(TransportError::Load {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "path has no file name",
                    ),
                })
            }
        };
        let payload = self.load(path).await?;

        let config = &self.config;
        let key = generate_key(
            &config.key_prefix,
            &filename,
            payload.mod_time,
            config.gzip,
            &config.time_format,
            config.time_zone,
        );
        let s3url = format!("s3://{}/{}", config.bucket, key);
        debug!(s3url = %s3url, size = payload.length, "uploading");

        self.store
            .put_object(&config.bucket, &key, payload.body, payload.length)
            .await
            .map_err(|source| TransportError::Upload {
                bucket: config.bucket.clone(),
                key: key.clone(),
                source,
            })?;
        info!(s3url = %s3url, size = payload.length, "upload completed");

        debug!(path = %path.display(), "removing");
        tokio::fs::remove_file(path)
            .await
            .map_err(|source| TransportError::Cleanup {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "removed successfully");
        Ok(())
    }

    /// Runs the loader on the blocking pool; compression is CPU bound.
    async fn load(&self, path: &Path) -> Result<Payload, TransportError> {
        let config = Arc::clone(&self.config);
        let pool = Arc::clone(&self.pool);
        let owned: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            payload::load(&owned, config.gzip, config.gzip_level, &pool)
        })
        .await
        .map_err(std::io::Error::other)
        .and_then(|loaded| loaded)
        .map_err(|source| TransportError::Load {
            path: path.to_path_buf(),
            source,
        })
    }
}

//! In-process object counters shared by all upload jobs.
//!
//! Every field is updated with a single atomic operation. Readers get
//! per-field consistency only; a snapshot taken while a cycle is running may
//! mix values from before and after a job completed.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Metrics {
    uploaded: AtomicI64,
    errored: AtomicI64,
    queued: AtomicI64,
}

/// Serializable view of [`Metrics`], shaped as `{"objects": {...}}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub objects: ObjectCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectCounts {
    pub uploaded: i64,
    pub errored: i64,
    pub queued: i64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one upload job.
    pub fn put_object(&self, success: bool) {
        if success {
            self.uploaded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.errored.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn set_queued(&self, n: i64) {
        self.queued.store(n, Ordering::Relaxed);
    }

    /// Marks one queued job as finished.
    pub fn dequeue(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn uploaded(&self) -> i64 {
        self.uploaded.load(Ordering::Relaxed)
    }

    pub fn errored(&self) -> i64 {
        self.errored.load(Ordering::Relaxed)
    }

    pub fn queued(&self) -> i64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            objects: ObjectCounts {
                uploaded: self.uploaded(),
                errored: self.errored(),
                queued: self.queued(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_put_object_has_no_lost_updates() {
        let metrics = Arc::new(Metrics::new());
        let mut handles = Vec::new();
        for _ in 0..100 {
            let metrics = Arc::clone(&metrics);
            handles.push(tokio::spawn(async move {
                metrics.put_object(true);
                metrics.put_object(false);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(metrics.uploaded(), 100);
        assert_eq!(metrics.errored(), 100);
    }

    #[test]
    fn test_queued_gauge_overwrites_and_drains() {
        let metrics = Metrics::new();
        metrics.set_queued(3);
        metrics.dequeue();
        assert_eq!(metrics.queued(), 2);
        metrics.set_queued(0);
        assert_eq!(metrics.queued(), 0);
    }

    #[test]
    fn test_snapshot_serializes_under_objects() {
        let metrics = Metrics::new();
        metrics.put_object(true);
        metrics.set_queued(2);
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"objects": {"uploaded": 1, "errored": 0, "queued": 2}})
        );
    }
}

//! The write-stream seam between the service and an object-storage backend.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

/// An absolute point in time shared by every write of one request.
///
/// Operations run through [`Deadline::run`] are cancelled once the instant
/// passes, whatever they were waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.at
    }

    pub async fn run<F>(&self, future: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        tokio::time::timeout_at(self.at, future)
            .await
            .map_err(|_| DeadlineExceeded)
    }
}

/// A backend able to hand out write streams for individual keys.
///
/// Implementations must be safe to share across many concurrent writers.
pub trait ObjectStore: Send + Sync {
    fn open_writer(&self, bucket: &str, key: &str, deadline: Deadline) -> Box<dyn ObjectWriter>;
}

/// One in-flight object upload. Nothing is guaranteed to be visible in the
/// bucket until [`ObjectWriter::finish`] returns `Ok`.
#[async_trait]
pub trait ObjectWriter: Send {
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Commits the object.
    async fn finish(self: Box<Self>) -> Result<()>;

    /// Drops the upload. Best effort, never reports failure.
    async fn abort(self: Box<Self>);
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use shared::store::{Deadline, ObjectStore};
use tracing::{error, info};

use crate::generator::{generate_content, generate_key};
use crate::task::{write_object, WriteOutcome};

pub const DEFAULT_OBJECT_SIZE: usize = 1024;
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    pub objects_written: usize,
    pub time_taken: Duration,
    pub errors: Vec<String>,
}

/// Fans one request out into concurrent object writes and folds the outcomes
/// back into a single [`AggregateResult`].
#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn ObjectStore>,
    bucket: Arc<str>,
    object_size: usize,
    write_timeout: Duration,
}

impl Coordinator {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            object_size: DEFAULT_OBJECT_SIZE,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_object_size(mut self, object_size: usize) -> Self {
        self.object_size = object_size;
        self
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Writes `count` objects at once, with no limit on concurrency, and
    /// waits for every one of them. All writes share one deadline; a failing
    /// write never cancels the others and nothing already written is undone.
    ///
    /// Writes are detached tasks: dropping the returned future stops the
    /// collection, not the uploads, which still end at the deadline.
    pub async fn run(&self, count: usize) -> AggregateResult {
        let deadline = Deadline::after(self.write_timeout);
        let start = Instant::now();

        let mut tasks = FuturesUnordered::new();
        for _ in 0..count {
            let store = Arc::clone(&self.store);
            let bucket = Arc::clone(&self.bucket);
            let object_size = self.object_size;

            tasks.push(tokio::spawn(async move {
                let key = generate_key();
                let content = generate_content(object_size);
                write_object(store.as_ref(), &bucket, key, &content, deadline).await
            }));
        }

        let mut errors = Vec::new();
        while let Some(joined) = tasks.next().await {
            match joined {
                Ok(WriteOutcome::Success(_)) => {}
                Ok(WriteOutcome::Failure(failure)) => errors.push(failure.to_string()),
                Err(e) => {
                    error!("Write task did not report an outcome: {}", e);
                    errors.push(format!("write task failed: {}", e));
                }
            }
        }

        let time_taken = start.elapsed();
        let result = AggregateResult {
            objects_written: count - errors.len(),
            time_taken,
            errors,
        };

        info!(
            "Wrote {}/{} objects to '{}' in {:?}",
            result.objects_written,
            count,
            self.bucket,
            result.time_taken
        );

        result
    }
}

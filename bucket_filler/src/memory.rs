//! In-process [`ObjectStore`] with fault injection, used by the tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use shared::store::{Deadline, ObjectStore, ObjectWriter};

#[derive(Debug, Clone, Copy)]
enum Fault {
    None,
    Write,
    Finish,
}

#[derive(Debug, Default)]
struct Inner {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    opened: AtomicUsize,
    aborted: AtomicUsize,
    failing_writes: usize,
    failing_finishes: usize,
    latency: Duration,
}

/// The first `failing_writes` writers fail on write, the next
/// `failing_finishes` on finish, the rest succeed.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes(n: usize) -> Self {
        Self::with_faults(n, 0)
    }

    pub fn failing_finishes(n: usize) -> Self {
        Self::with_faults(0, n)
    }

    pub fn with_faults(failing_writes: usize, failing_finishes: usize) -> Self {
        Self::build(failing_writes, failing_finishes, Duration::ZERO)
    }

    /// Every write takes `latency` before it is accepted.
    pub fn with_latency(latency: Duration) -> Self {
        Self::build(0, 0, latency)
    }

    fn build(failing_writes: usize, failing_finishes: usize, latency: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                failing_writes,
                failing_finishes,
                latency,
                ..Inner::default()
            }),
        }
    }

    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn aborted(&self) -> usize {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Committed keys, `bucket/key`, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock_objects().keys().cloned().collect()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock_objects().get(&format!("{bucket}/{key}")).cloned()
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map still holds consistent entries: inserts are single calls.
        self.inner
            .objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ObjectStore for MemoryStore {
    fn open_writer(&self, bucket: &str, key: &str, _deadline: Deadline) -> Box<dyn ObjectWriter> {
        let index = self.inner.opened.fetch_add(1, Ordering::SeqCst);
        let fault = if index < self.inner.failing_writes {
            Fault::Write
        } else if index < self.inner.failing_writes + self.inner.failing_finishes {
            Fault::Finish
        } else {
            Fault::None
        };

        Box::new(MemoryWriter {
            store: self.clone(),
            path: format!("{bucket}/{key}"),
            fault,
            buffer: Vec::new(),
        })
    }
}

struct MemoryWriter {
    store: MemoryStore,
    path: String,
    fault: Fault,
    buffer: Vec<u8>,
}

#[async_trait]
impl ObjectWriter for MemoryWriter {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.store.inner.latency.is_zero() {
            tokio::time::sleep(self.store.inner.latency).await;
        }
        if let Fault::Write = self.fault {
            bail!("connection reset while writing {}", self.path);
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<()> {
        if let Fault::Finish = self.fault {
            bail!("upload of {} was not committed", self.path);
        }
        let MemoryWriter {
            store,
            path,
            buffer,
            ..
        } = *self;
        store.lock_objects().insert(path, buffer);
        Ok(())
    }

    async fn abort(self: Box<Self>) {
        self.store.inner.aborted.fetch_add(1, Ordering::SeqCst);
    }
}

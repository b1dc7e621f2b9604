use shared::store::{Deadline, ObjectStore};
use thiserror::Error;
use tracing::{info, warn};

use crate::generator::ObjectKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Write,
    Finalize,
}

#[derive(Debug, Error)]
pub enum WriteFailure {
    #[error("failed to write object {key}: {cause:#}")]
    Write { key: ObjectKey, cause: anyhow::Error },
    #[error("failed to finalize object {key}: {cause:#}")]
    Finalize { key: ObjectKey, cause: anyhow::Error },
}

impl WriteFailure {
    pub fn key(&self) -> &ObjectKey {
        match self {
            WriteFailure::Write { key, .. } | WriteFailure::Finalize { key, .. } => key,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            WriteFailure::Write { .. } => Stage::Write,
            WriteFailure::Finalize { .. } => Stage::Finalize,
        }
    }
}

#[derive(Debug)]
pub enum WriteOutcome {
    Success(ObjectKey),
    Failure(WriteFailure),
}

/// Uploads `content` under `key`. Never retries.
///
/// A finalize failure does not mean the object is absent from the bucket.
pub async fn write_object(
    store: &dyn ObjectStore,
    bucket: &str,
    key: ObjectKey,
    content: &str,
    deadline: Deadline,
) -> WriteOutcome {
    let mut writer = store.open_writer(bucket, key.as_str(), deadline);

    let written = match deadline.run(writer.write(content.as_bytes())).await {
        Ok(result) => result,
        Err(elapsed) => Err(elapsed.into()),
    };
    if let Err(cause) = written {
        // The write error is what gets reported.
        let _ = deadline.run(writer.abort()).await;
        let failure = WriteFailure::Write { key, cause };
        warn!("{}", failure);
        return WriteOutcome::Failure(failure);
    }

    let finished = match deadline.run(writer.finish()).await {
        Ok(result) => result,
        Err(elapsed) => Err(elapsed.into()),
    };
    if let Err(cause) = finished {
        let failure = WriteFailure::Finalize { key, cause };
        warn!("{}", failure);
        return WriteOutcome::Failure(failure);
    }

    info!("object written: {}", key);
    WriteOutcome::Success(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate_content, generate_key};
    use crate::memory::MemoryStore;
    use std::time::Duration;

    const BUCKET: &str = "test-bucket";

    #[tokio::test]
    async fn successful_write_commits_content() {
        let store = MemoryStore::new();
        let key = generate_key();
        let content = generate_content(1024);

        let outcome = write_object(
            &store,
            BUCKET,
            key.clone(),
            &content,
            Deadline::after(Duration::from_secs(60)),
        )
        .await;

        assert!(matches!(&outcome, WriteOutcome::Success(k) if *k == key));
        assert_eq!(
            store.get(BUCKET, key.as_str()),
            Some(content.into_bytes())
        );
    }

    #[tokio::test]
    async fn write_failure_aborts_and_names_key() {
        let store = MemoryStore::failing_writes(1);
        let key = generate_key();

        let outcome = write_object(
            &store,
            BUCKET,
            key.clone(),
            "abc",
            Deadline::after(Duration::from_secs(60)),
        )
        .await;

        let WriteOutcome::Failure(failure) = outcome else {
            panic!("expected a failure");
        };
        assert_eq!(failure.stage(), Stage::Write);
        assert_eq!(failure.key(), &key);
        let message = failure.to_string();
        assert!(message.starts_with("failed to write object "));
        assert!(message.contains(key.as_str()));
        assert!(message.contains("connection reset"));
        assert_eq!(store.aborted(), 1);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn finalize_failure_is_reported_separately() {
        let store = MemoryStore::failing_finishes(1);
        let key = generate_key();

        let outcome = write_object(
            &store,
            BUCKET,
            key.clone(),
            "abc",
            Deadline::after(Duration::from_secs(60)),
        )
        .await;

        let WriteOutcome::Failure(failure) = outcome else {
            panic!("expected a failure");
        };
        assert_eq!(failure.stage(), Stage::Finalize);
        assert!(failure
            .to_string()
            .starts_with(&format!("failed to finalize object {key}: ")));
        assert_eq!(store.aborted(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_fails_at_deadline() {
        let store = MemoryStore::with_latency(Duration::from_secs(600));
        let deadline = Deadline::after(Duration::from_secs(60));
        let started = tokio::time::Instant::now();

        let outcome = write_object(&store, BUCKET, generate_key(), "abc", deadline).await;

        let WriteOutcome::Failure(failure) = outcome else {
            panic!("expected a failure");
        };
        assert_eq!(failure.stage(), Stage::Write);
        assert!(failure.to_string().ends_with("deadline exceeded"));
        assert!(started.elapsed() < Duration::from_secs(61));
    }
}

use anyhow::{bail, Result};
use async_trait::async_trait;
use aws_smithy_http::byte_stream::ByteStream;
use tracing::debug;

use crate::store::{Deadline, ObjectStore, ObjectWriter};

/// An [`ObjectStore`] backed by one shared S3 client.
#[derive(Debug, Clone)]
pub struct S3Store {
    s3: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(s3: aws_sdk_s3::Client) -> Self {
        Self { s3 }
    }

    pub async fn from_env(endpoint_url: Option<&str>) -> Self {
        let aws_config = aws_config::load_from_env().await;
        let s3 = match endpoint_url {
            Some(url) => {
                let config = aws_sdk_s3::config::Builder::from(&aws_config)
                    .endpoint_url(url)
                    .force_path_style(true)
                    .build();
                aws_sdk_s3::Client::from_conf(config)
            }
            None => aws_sdk_s3::Client::new(&aws_config),
        };
        Self::new(s3)
    }
}

impl ObjectStore for S3Store {
    fn open_writer(&self, bucket: &str, key: &str, deadline: Deadline) -> Box<dyn ObjectWriter> {
        Box::new(S3Writer {
            s3: self.s3.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            deadline,
            buffer: Vec::new(),
        })
    }
}

/// Buffers the body in memory and commits it with a single `PutObject`.
struct S3Writer {
    s3: aws_sdk_s3::Client,
    bucket: String,
    key: String,
    deadline: Deadline,
    buffer: Vec<u8>,
}

#[async_trait]
impl ObjectWriter for S3Writer {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.deadline.is_elapsed() {
            bail!("deadline exceeded before write to {}", self.key);
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<()> {
        let S3Writer {
            s3,
            bucket,
            key,
            deadline,
            buffer,
        } = *self;

        let body = ByteStream::from(buffer);
        let request = s3
            .put_object()
            .bucket(bucket)
            .key(&key)
            .content_type("text/plain")
            .body(body)
            .send();

        deadline.run(request).await??;
        debug!("Committed s3 object {}", key);

        Ok(())
    }

    async fn abort(self: Box<Self>) {
        debug!("Discarding {} buffered bytes for {}", self.buffer.len(), self.key);
    }
}

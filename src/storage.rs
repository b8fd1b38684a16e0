//! Object storage reads for generated diff files.
use anyhow::{Context, Result};
use aws_sdk_s3::error::DisplayErrorContext;
use std::sync::OnceLock;
use std::time::Instant;
use tokio::runtime::Handle;

/// Whole-object reads by bucket and key.
pub trait ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// S3-backed store for use from blocking code.
///
/// Holds a handle to the runtime that owns the SDK client; `get_object` must
/// be called off the async executor (e.g. inside `spawn_blocking`).
#[derive(Clone)]
pub struct S3ObjectStore {
    client: OnceLock<aws_sdk_s3::Client>,
    runtime: Handle,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, runtime: Handle) -> Self {
        Self {
            client: OnceLock::from(client),
            runtime,
        }
    }

    /// Defer loading the AWS configuration until the first read.
    pub fn lazy(runtime: Handle) -> Self {
        Self {
            client: OnceLock::new(),
            runtime,
        }
    }

    fn client(&self) -> &aws_sdk_s3::Client {
        self.client.get_or_init(|| {
            let config = self
                .runtime
                .block_on(aws_config::load_defaults(aws_config::BehaviorVersion::latest()));
            aws_sdk_s3::Client::new(&config)
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let start = Instant::now();
        let client = self.client();
        let bytes = self.runtime.block_on(async {
            let output = client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| anyhow::anyhow!("{}", DisplayErrorContext(&err)))
                .with_context(|| format!("get s3://{bucket}/{key}"))?;
            let body = output
                .body
                .collect()
                .await
                .with_context(|| format!("read body of s3://{bucket}/{key}"))?;
            Ok::<_, anyhow::Error>(body.into_bytes().to_vec())
        })?;

        tracing::info!(
            bucket,
            key,
            object_bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "object fetched"
        );
        Ok(bytes)
    }
}

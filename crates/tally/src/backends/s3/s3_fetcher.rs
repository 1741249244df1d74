//! 📥 S3Fetcher: one `GetObject` per key, body handed back as an async reader.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;

use crate::backends::Fetcher;
use crate::common::ObjectKey;
use crate::handlers::ObjectBody;

/// 📥 Opens object bodies. Cloneable, stateless per call, shared by every worker.
///
/// Transport: `GetObject` → `ByteStream::into_async_read()` → boxed `AsyncRead`.
/// Whoever ends up holding the box owns the connection until they drop it.
#[derive(Debug, Clone)]
pub(crate) struct S3Fetcher {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Fetcher {
    pub(crate) fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl Fetcher for S3Fetcher {
    async fn fetch(&self, key: &ObjectKey) -> Result<ObjectBody> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|err| anyhow!("{}", DisplayErrorContext(err)))
            .with_context(|| format!("GetObject failed for s3://{}/{}", self.bucket, key))?;

        Ok(Box::new(response.body.into_async_read()))
    }
}

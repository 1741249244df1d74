use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::InMemoryBucket;
use crate::backends::Fetcher;
use crate::common::ObjectKey;
use crate::handlers::ObjectBody;

/// 📥 Serves bodies of `size` zero bytes without ever allocating them.
#[derive(Debug)]
pub(crate) struct InMemoryFetcher {
    bucket: Arc<InMemoryBucket>,
}

impl InMemoryFetcher {
    pub(crate) fn new(bucket: Arc<InMemoryBucket>) -> Self {
        Self { bucket }
    }
}

#[async_trait]
impl Fetcher for InMemoryFetcher {
    async fn fetch(&self, key: &ObjectKey) -> Result<ObjectBody> {
        self.bucket.record_fetch(key);

        if let Some(delay) = self.bucket.slow_keys.get(key) {
            tokio::time::sleep(*delay).await;
        }
        if self.bucket.failing_keys.contains(key) {
            bail!("💥 in-memory fetch of '{}' failed, as requested", key);
        }

        let size = self
            .bucket
            .size_of(key)
            .ok_or_else(|| anyhow!("NoSuchKey: '{}' is not in the in-memory bucket", key))?;
        Ok(Box::new(tokio::io::repeat(0).take(size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ObjectRecord;

    #[tokio::test]
    async fn the_one_where_a_ten_byte_object_reads_ten_bytes() {
        let the_bucket = Arc::new(InMemoryBucket::new(vec![ObjectRecord::new("a", 10)], 10));
        let the_fetcher = InMemoryFetcher::new(Arc::clone(&the_bucket));

        let mut the_body = the_fetcher.fetch(&ObjectKey::new("a")).await.expect("💀 fetch");
        let mut the_bytes = Vec::new();
        the_body.read_to_end(&mut the_bytes).await.expect("💀 read");

        assert_eq!(the_bytes.len(), 10);
        assert_eq!(the_bucket.fetch_counts().get(&ObjectKey::new("a")), Some(&1));
    }

    #[tokio::test]
    async fn the_one_where_missing_and_cursed_keys_both_fail() {
        let the_bucket = Arc::new(
            InMemoryBucket::new(vec![ObjectRecord::new("cursed", 1)], 10)
                .with_failing_keys(["cursed"]),
        );
        let the_fetcher = InMemoryFetcher::new(the_bucket);

        assert!(the_fetcher.fetch(&ObjectKey::new("cursed")).await.is_err());
        assert!(the_fetcher.fetch(&ObjectKey::new("ghost")).await.is_err());
    }
}

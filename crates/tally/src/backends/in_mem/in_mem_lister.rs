use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Result, bail};
use async_trait::async_trait;

use super::InMemoryBucket;
use crate::backends::Lister;
use crate::common::Page;

/// 📚 Hands out the bucket's objects `page_size` at a time.
///
/// An empty bucket still yields one empty page, the way S3 answers an empty
/// listing with one empty response. Then `None`, forever.
#[derive(Debug)]
pub(crate) struct InMemoryLister {
    bucket: Arc<InMemoryBucket>,
    next_page: usize,
    exhausted: bool,
}

impl InMemoryLister {
    pub(crate) fn new(bucket: Arc<InMemoryBucket>) -> Self {
        Self {
            bucket,
            next_page: 0,
            exhausted: false,
        }
    }
}

#[async_trait]
impl Lister for InMemoryLister {
    async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.exhausted {
            return Ok(None);
        }

        let the_page_number = self.next_page + 1;
        if self.bucket.failing_page == Some(the_page_number) {
            bail!("💥 in-memory listing failed on page {}, as requested", the_page_number);
        }

        let page_size = self.bucket.page_size;
        let start = self.next_page * page_size;
        let visible = self.bucket.visible();
        let end = visible.len().min(start + page_size);
        let page: Page = visible.get(start..end).unwrap_or_default().to_vec();

        self.next_page = the_page_number;
        self.exhausted = visible.len() <= start + page_size;
        self.bucket.pages_served.fetch_add(1, Ordering::SeqCst);
        Ok(Some(page))
    }
}

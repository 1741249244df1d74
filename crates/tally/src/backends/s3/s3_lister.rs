//! 📚 S3Lister: pages through `ListObjectsV2` like a caffeinated librarian.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::{debug, trace};

use crate::backends::Lister;
use crate::common::{ObjectRecord, Page};

/// 📚 Walks a bucket listing one `ListObjectsV2` call at a time.
///
/// The continuation token is the whole state machine. `exhausted` flips once S3
/// says the listing is not truncated, or stops handing out tokens.
#[derive(Debug)]
pub(crate) struct S3Lister {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: Option<String>,
    continuation_token: Option<String>,
    exhausted: bool,
    pages_fetched: usize,
}

impl S3Lister {
    pub(crate) fn new(client: aws_sdk_s3::Client, bucket: String, prefix: Option<String>) -> Self {
        Self {
            client,
            bucket,
            prefix,
            continuation_token: None,
            exhausted: false,
            pages_fetched: 0,
        }
    }
}

#[async_trait]
impl Lister for S3Lister {
    async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.exhausted {
            return Ok(None);
        }

        let the_page_number = self.pages_fetched + 1;
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(self.prefix.clone())
            .set_continuation_token(self.continuation_token.take())
            .send()
            .await
            .map_err(|err| anyhow!("{}", DisplayErrorContext(err)))
            .with_context(|| {
                format!(
                    "💀 ListObjectsV2 failed for s3://{}/{} on page {}. \
                     Check: bucket name, region, credentials, and s3:ListBucket permission.",
                    self.bucket,
                    self.prefix.as_deref().unwrap_or(""),
                    the_page_number
                )
            })?;
        self.pages_fetched = the_page_number;

        // 🏁 "last page" is either IsTruncated=false or a missing/empty token, whichever shows up first
        let next_token = response
            .next_continuation_token()
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        let is_truncated = response.is_truncated().unwrap_or(false);
        self.exhausted = !is_truncated || next_token.is_none();
        self.continuation_token = next_token;

        let page: Page = response
            .contents()
            .iter()
            .filter_map(|object| {
                let Some(key) = object.key() else {
                    trace!("🤷 listing entry without a key, skipping");
                    return None;
                };
                // -- S3 says i64. negative sizes are a lie we refuse to add up.
                let size = object.size().unwrap_or(0).max(0) as u64;
                Some(ObjectRecord::new(key, size))
            })
            .collect();

        debug!(
            "📄 s3://{} page {}: {} objects, more to come: {}",
            self.bucket,
            the_page_number,
            page.len(),
            !self.exhausted
        );
        Ok(Some(page))
    }
}

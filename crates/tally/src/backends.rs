//! 🔌 Backends, where the real I/O happens.
//!
//! 🪣 A storage backend answers exactly two questions:
//! "what's in the bucket?" (paged, one producer) and
//! "give me that object" (shared by every worker, stateless per call).
//! So each backend comes in two halves: a [`Lister`] and a [`Fetcher`].
//!
//! 🎭 Need the real cloud? `S3`. Need a bucket that fits in a unit test? `InMemory`.
//! The supervisor never knows which one it got. Ignorance is a feature.
//! It's called "abstraction." 🦆

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::app_config::StorageConfig;
use crate::common::{ObjectKey, Page};
use crate::handlers::ObjectBody;

pub(crate) mod in_mem;
pub(crate) mod s3;

// 🎯 Re-export backend configs so callers can do `backends::S3StorageConfig`
// instead of spelunking into `backends::s3::s3_config::S3StorageConfig`.
pub use in_mem::{InMemoryObject, InMemoryStorageConfig};
pub use s3::S3StorageConfig;

pub(crate) use in_mem::{InMemoryBucket, InMemoryFetcher, InMemoryLister};
pub(crate) use s3::{S3Fetcher, S3Lister};

/// 📚 The producer half: pages through a bucket's listing.
///
/// # Contract
/// - `Ok(Some(page))` while there are pages. A page may be empty.
/// - `Ok(None)` once the backend said "that was the last page". Stays `None` after.
/// - `Err(..)` is fatal for the run. Nobody retries. Nobody asks twice.
/// - `&mut self` because listers carry a continuation token, and feelings. Mostly the token.
#[async_trait]
pub(crate) trait Lister: std::fmt::Debug + Send {
    async fn next_page(&mut self) -> Result<Option<Page>>;
}

/// 📥 The consumer half: opens one object's content stream.
///
/// Shared read-only across every worker, hence `&self` + `Sync`.
/// The returned body owns the connection; drop it and the connection is released.
#[async_trait]
pub(crate) trait Fetcher: std::fmt::Debug + Send + Sync {
    async fn fetch(&self, key: &ObjectKey) -> Result<ObjectBody>;
}

/// 🎭 The many faces of a Lister.
#[derive(Debug)]
pub(crate) enum ListerBackend {
    S3(S3Lister),
    InMemory(InMemoryLister),
}

#[async_trait]
impl Lister for ListerBackend {
    async fn next_page(&mut self) -> Result<Option<Page>> {
        match self {
            ListerBackend::S3(lister) => lister.next_page().await,
            ListerBackend::InMemory(lister) => lister.next_page().await,
        }
    }
}

/// 🎭 The many faces of a Fetcher.
#[derive(Debug)]
pub(crate) enum FetcherBackend {
    S3(S3Fetcher),
    InMemory(InMemoryFetcher),
}

#[async_trait]
impl Fetcher for FetcherBackend {
    async fn fetch(&self, key: &ObjectKey) -> Result<ObjectBody> {
        match self {
            FetcherBackend::S3(fetcher) => fetcher.fetch(key).await,
            FetcherBackend::InMemory(fetcher) => fetcher.fetch(key).await,
        }
    }
}

/// 🔗 Both halves of one connected backend.
#[derive(Debug)]
pub(crate) struct Storage {
    pub(crate) lister: ListerBackend,
    pub(crate) fetcher: Arc<FetcherBackend>,
}

impl Storage {
    /// 🧪 Wire both halves to the same in-memory bucket.
    pub(crate) fn in_memory(bucket: Arc<InMemoryBucket>) -> Self {
        Self {
            lister: ListerBackend::InMemory(InMemoryLister::new(Arc::clone(&bucket))),
            fetcher: Arc::new(FetcherBackend::InMemory(InMemoryFetcher::new(bucket))),
        }
    }
}

/// 🚀 Turn a storage config into a connected backend.
///
/// 💀 For S3 this is where credentials get resolved and the client built.
/// Any failure here is a setup failure, and setup failures end the run.
pub(crate) async fn connect(config: &StorageConfig) -> Result<Storage> {
    match config {
        StorageConfig::S3(s3_config) => {
            let client = s3::connect(s3_config).await?;
            Ok(Storage {
                lister: ListerBackend::S3(S3Lister::new(
                    client.clone(),
                    s3_config.bucket.clone(),
                    s3_config.prefix.clone(),
                )),
                fetcher: Arc::new(FetcherBackend::S3(S3Fetcher::new(
                    client,
                    s3_config.bucket.clone(),
                ))),
            })
        }
        StorageConfig::InMemory(mem_config) => Ok(Storage::in_memory(Arc::new(
            InMemoryBucket::from_config(mem_config),
        ))),
    }
}

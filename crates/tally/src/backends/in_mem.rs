//! # Previously, on Tally...
//!
//! 🎬 The cloud was expensive. The tests were slow. Someone needed a bucket
//! so simple it lives entirely in RAM, gone the moment you blink.
//!
//! `in_mem` provides an in-memory bucket, plus a [`Lister`] and [`Fetcher`]
//! over it. Bodies are synthesized zeros of the listed size, so a "10 GB" object
//! costs nothing until somebody reads it. For tests (which can also make pages
//! fail, keys fail, or keys hang) and for dry runs from a TOML file.
//!
//! ✅ No network calls. No disk I/O. No credentials. Just vibes and heap memory.

mod in_mem_fetcher;
mod in_mem_lister;

pub(crate) use in_mem_fetcher::InMemoryFetcher;
pub(crate) use in_mem_lister::InMemoryLister;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::Deserialize;

use crate::common::{ObjectKey, ObjectRecord};

/// 🔧 An in-memory bucket, as written in TOML.
#[derive(Debug, Deserialize, Clone)]
pub struct InMemoryStorageConfig {
    /// 📦 The objects, in listing order.
    #[serde(default)]
    pub objects: Vec<InMemoryObject>,
    #[serde(default)]
    pub prefix: Option<String>,
    /// 📄 Objects per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// 📦 One pretend object: a name and a size. The bytes are imaginary.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InMemoryObject {
    pub key: String,
    pub size: u64,
}

// -- 1000, same as a ListObjectsV2 page. method acting.
fn default_page_size() -> usize {
    1000
}

impl InMemoryStorageConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("💀 storage.in_memory.page_size must be at least 1.");
        }
        Ok(())
    }
}

/// 🪣 The bucket itself, shared by its lister and fetcher.
///
/// Besides the objects it keeps a little diary: how many pages were served and
/// which keys were fetched how often. Tests read the diary. Nobody else cares.
#[derive(Debug)]
pub(crate) struct InMemoryBucket {
    objects: Vec<ObjectRecord>,
    prefix: Option<String>,
    page_size: usize,
    /// 📚 `objects` filtered by `prefix`, rebuilt whenever either changes.
    visible: Vec<ObjectRecord>,
    /// 🔎 key → size for everything in `visible`.
    sizes: HashMap<ObjectKey, u64>,
    /// 💥 1-based page number whose listing call fails.
    failing_page: Option<usize>,
    failing_keys: HashSet<ObjectKey>,
    slow_keys: HashMap<ObjectKey, Duration>,
    pages_served: AtomicUsize,
    fetch_counts: Mutex<HashMap<ObjectKey, usize>>,
}

impl InMemoryBucket {
    pub(crate) fn from_config(config: &InMemoryStorageConfig) -> Self {
        Self::new(
            config
                .objects
                .iter()
                .map(|object| ObjectRecord::new(object.key.as_str(), object.size))
                .collect(),
            config.page_size,
        )
        .with_prefix(config.prefix.clone())
    }

    pub(crate) fn new(objects: Vec<ObjectRecord>, page_size: usize) -> Self {
        let mut bucket = Self {
            objects,
            prefix: None,
            // -- a zero page size would list forever. one is the floor.
            page_size: page_size.max(1),
            visible: Vec::new(),
            sizes: HashMap::new(),
            failing_page: None,
            failing_keys: HashSet::new(),
            slow_keys: HashMap::new(),
            pages_served: AtomicUsize::new(0),
            fetch_counts: Mutex::new(HashMap::new()),
        };
        bucket.reindex();
        bucket
    }

    pub(crate) fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self.reindex();
        self
    }

    fn reindex(&mut self) {
        let prefix = self.prefix.as_deref().unwrap_or("");
        self.visible = self
            .objects
            .iter()
            .filter(|record| record.key.as_str().starts_with(prefix))
            .cloned()
            .collect();
        self.sizes = self
            .visible
            .iter()
            .map(|record| (record.key.clone(), record.size))
            .collect();
    }

    #[cfg(test)]
    pub(crate) fn with_failing_page(mut self, page_number: usize) -> Self {
        self.failing_page = Some(page_number);
        self
    }

    #[cfg(test)]
    pub(crate) fn with_failing_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ObjectKey>,
    {
        self.failing_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[cfg(test)]
    pub(crate) fn with_slow_key(mut self, key: impl Into<ObjectKey>, delay: Duration) -> Self {
        self.slow_keys.insert(key.into(), delay);
        self
    }

    /// 📚 Objects visible under the configured prefix, in listing order.
    fn visible(&self) -> &[ObjectRecord] {
        &self.visible
    }

    /// 📏 Size of a visible object, or `None` if listing would never show it.
    fn size_of(&self, key: &ObjectKey) -> Option<u64> {
        self.sizes.get(key).copied()
    }

    #[cfg(test)]
    pub(crate) fn pages_served(&self) -> usize {
        self.pages_served.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// 📒 How many times each key was fetched. Missing keys were never fetched.
    #[cfg(test)]
    pub(crate) fn fetch_counts(&self) -> HashMap<ObjectKey, usize> {
        match self.fetch_counts.lock() {
            Ok(counts) => counts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record_fetch(&self, key: &ObjectKey) {
        let mut counts = match self.fetch_counts.lock() {
            Ok(counts) => counts,
            Err(poisoned) => poisoned.into_inner(),
        };
        *counts.entry(key.clone()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_prefix_hides_the_neighbors() {
        let the_bucket = InMemoryBucket::new(
            vec![
                ObjectRecord::new("logs/a", 1),
                ObjectRecord::new("img/b", 2),
                ObjectRecord::new("logs/c", 3),
            ],
            10,
        )
        .with_prefix(Some("logs/".to_string()));

        let the_keys: Vec<&str> = the_bucket.visible().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(the_keys, vec!["logs/a", "logs/c"]);
        assert_eq!(the_bucket.size_of(&ObjectKey::new("logs/c")), Some(3));
        assert!(the_bucket.size_of(&ObjectKey::new("img/b")).is_none());
    }

    #[test]
    fn the_one_where_config_becomes_a_bucket() {
        let the_config = InMemoryStorageConfig {
            objects: vec![
                InMemoryObject { key: "a".to_string(), size: 10 },
                InMemoryObject { key: "b".to_string(), size: 20 },
            ],
            prefix: None,
            page_size: 1,
        };
        assert!(the_config.validate().is_ok());

        let the_bucket = InMemoryBucket::from_config(&the_config);
        assert_eq!(the_bucket.visible().len(), 2);
        assert_eq!(the_bucket.page_size, 1);
    }

    #[test]
    fn the_one_where_a_zero_page_size_fails_validation() {
        let the_config = InMemoryStorageConfig {
            objects: vec![],
            prefix: None,
            page_size: 0,
        };
        assert!(the_config.validate().is_err());
    }
}

//! 📚 The Object Lister: the one producer in this whole operation.
//!
//! 🎬 *[a page of keys arrives. the queue has room for 1000. it has seen things.]*
//!
//! For every record on every page it does exactly two things, in this order:
//! 1. push the key onto the work queue (and wait, if the queue is full)
//! 2. add the record's size to the run total
//!
//! The total is therefore a *listing* total. Workers never touch it, so it can't
//! be skewed by a slow worker, a failed fetch, or a worker having a bad day.

use anyhow::{Context, Result};
use async_channel::Sender;
use tracing::{debug, info, trace};

use crate::backends::{Lister, ListerBackend};
use crate::common::ObjectKey;
use crate::progress::FetchProgress;
use crate::stats::RunStats;

#[derive(Debug)]
pub(crate) struct ObjectLister {
    lister: ListerBackend,
    progress: FetchProgress,
}

impl ObjectLister {
    pub(crate) fn new(lister: ListerBackend, progress: FetchProgress) -> Self {
        Self { lister, progress }
    }

    /// 🚰 Drain every page into `queue`, accumulating sizes into `stats`.
    ///
    /// Does NOT close the queue. Closing is the supervisor's call, made exactly
    /// once and only after this returns `Ok`.
    ///
    /// 💀 The first failed page ends the listing. Nothing after it is enqueued.
    pub(crate) async fn drain_into(
        &mut self,
        queue: &Sender<ObjectKey>,
        stats: &mut RunStats,
    ) -> Result<()> {
        let mut pages = 0usize;

        while let Some(page) = self
            .lister
            .next_page()
            .await
            .with_context(|| format!("💀 Listing failed after {} page(s). Aborting the run.", pages))?
        {
            pages += 1;
            debug!("📄 page {} brought {} objects", pages, page.len());
            self.progress.listed(page.len() as u64);

            for record in page {
                trace!("📬 enqueue {} ({} bytes)", record.key, record.size);
                queue.send(record.key).await.context(
                    "💀 The work queue closed while we were still listing. Every worker is gone.",
                )?;
                stats.record_listed(record.size);
            }
        }

        info!(
            "📚 listing complete: {} pages, {} objects, {} bytes",
            pages, stats.object_count, stats.total_bytes
        );
        Ok(())
    }
}

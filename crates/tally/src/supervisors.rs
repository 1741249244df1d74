//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where buckets hold millions of objects..."
//! 🎬 "One supervisor dared to count them all."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor drives one run, start to finish:
//!
//! ```text
//! Idle ──spawn N workers──▶ Draining ──listing done, close queue──▶ Closing ──join all──▶ Done
//! ```
//!
//! - Workers start first and block on the empty queue.
//! - The lister runs right here, on the supervisor's own task, so the run totals
//!   are plain integers owned by one writer.
//! - Closing the queue is the one and only "no more work" signal. Every worker sees it.
//! - Stats are finalized only after the join barrier says every worker is gone.
//!
//! ⚠️ DO NOT MAKE THE WORKERS PUB. THEY ARE THE SUPERVISOR'S PRIVATE MINIONS.

mod workers;

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app_config::AppConfig;
use crate::backends::Storage;
use crate::common::ObjectKey;
use crate::handlers::ObjectHandler;
use crate::lister::ObjectLister;
use crate::progress::FetchProgress;
use crate::stats::{FetchTally, RunStats};
use workers::{FetchWorker, Worker};

/// 📦 The Supervisor: because even async tasks need someone hovering over them
/// asking "is it done yet?"
pub(crate) struct Supervisor {
    app_config: AppConfig,
}

impl Supervisor {
    pub(crate) fn new(app_config: AppConfig) -> Self {
        Self { app_config }
    }

    /// 🚀 Run the whole pipeline against an already-connected backend.
    ///
    /// `stats` comes in already started, so its clock covers whatever setup
    /// the caller did before handing over (credentials, client, the works).
    ///
    /// 💀 A listing failure aborts the pool and comes back as `Err`; no stats.
    /// Fetch failures never come back at all; they're in `RunStats::fetch`.
    pub(crate) async fn run(
        &self,
        storage: Storage,
        handler: Arc<dyn ObjectHandler>,
        mut stats: RunStats,
    ) -> Result<RunStats> {
        let runtime = &self.app_config.runtime;
        let label = self.app_config.storage.label();

        let progress = FetchProgress::new(&label, runtime.show_progress);
        let tally = Arc::new(FetchTally::default());
        let (tx, rx) = async_channel::bounded::<ObjectKey>(runtime.queue_capacity);

        info!(
            "🧵 starting {} fetch workers (queue capacity {}) for {}",
            runtime.worker_count, runtime.queue_capacity, label
        );
        let handles: Vec<JoinHandle<Result<()>>> = (0..runtime.worker_count)
            .map(|id| {
                FetchWorker::new(
                    id,
                    rx.clone(),
                    Arc::clone(&storage.fetcher),
                    Arc::clone(&handler),
                    Arc::clone(&tally),
                    progress.clone(),
                    runtime.fetch_timeout(),
                )
                .start()
            })
            .collect();
        // -- the workers hold the only receivers now. if they all die, send() notices.
        drop(rx);

        let mut lister = ObjectLister::new(storage.lister, progress.clone());
        if let Err(err) = lister.drain_into(&tx, &mut stats).await {
            error!("💀 listing failed, aborting {} workers", handles.len());
            for handle in &handles {
                handle.abort();
            }
            progress.finish();
            return Err(err);
        }

        // 🏁 the one and only close
        tx.close();
        info!(
            "📪 queue closed after {} objects, waiting for workers to drain it",
            stats.object_count
        );

        for (id, joined) in join_all(handles).await.into_iter().enumerate() {
            joined
                .with_context(|| format!("💀 fetch worker {} panicked", id))?
                .with_context(|| format!("💀 fetch worker {} failed", id))?;
        }

        progress.finish();
        stats.finish(tally.snapshot());
        info!(
            "✅ all workers finished in {:?}: {} objects, {} bytes listed, {} fetch failures",
            stats.elapsed(),
            stats.object_count,
            stats.total_bytes,
            stats.fetch.failed
        );
        Ok(stats)
    }
}

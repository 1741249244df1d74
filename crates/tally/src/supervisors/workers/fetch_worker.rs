//! 🎬 *[a queue fills with keys. somewhere, a worker waits.]*
//! *[the clock on the wall reads 2:47am.]*
//!
//! 📥 The FetchWorker: receives a key, fetches the object, hands the body to the
//! handler, lets go of it, and asks for the next key. When the queue is closed
//! and empty, it clocks out. It does not notice anything else. It only fetches.
//!
//! 💀 Failures stay here. One bad key gets one warning and one tick on the
//! failure counter. The pool never hears about it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::Worker;
use crate::backends::{Fetcher, FetcherBackend};
use crate::common::ObjectKey;
use crate::handlers::ObjectHandler;
use crate::progress::FetchProgress;
use crate::stats::FetchTally;

pub(crate) struct FetchWorker {
    id: usize,
    rx: Receiver<ObjectKey>,
    fetcher: Arc<FetcherBackend>,
    handler: Arc<dyn ObjectHandler>,
    tally: Arc<FetchTally>,
    progress: FetchProgress,
    fetch_timeout: Option<Duration>,
}

impl std::fmt::Debug for FetchWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchWorker")
            .field("id", &self.id)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

impl FetchWorker {
    pub(crate) fn new(
        id: usize,
        rx: Receiver<ObjectKey>,
        fetcher: Arc<FetcherBackend>,
        handler: Arc<dyn ObjectHandler>,
        tally: Arc<FetchTally>,
        progress: FetchProgress,
        fetch_timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            rx,
            fetcher,
            handler,
            tally,
            progress,
            fetch_timeout,
        }
    }

    /// 🎯 One key, start to finish. Never fails; outcomes go to the tally.
    async fn process(&self, key: &ObjectKey) {
        let attempt = self.fetch_and_handle(key);
        let outcome = match self.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(outcome) => outcome,
                // -- the timed-out future (and any body it held) is dropped right here
                Err(_) => Err(anyhow!("timed out after {:?}", limit)),
            },
            None => attempt.await,
        };

        match outcome {
            Ok(bytes) => {
                trace!("✅ worker {} fetched {} ({} bytes)", self.id, key, bytes);
                self.tally.record_success(bytes);
            }
            Err(err) => {
                warn!("💀 worker {} failed to get object {}: {:#}", self.id, key, err);
                self.tally.record_failure();
            }
        }
        self.progress.processed();
    }

    async fn fetch_and_handle(&self, key: &ObjectKey) -> Result<u64> {
        let body = self.fetcher.fetch(key).await?;
        // -- the handler owns the body now; it's released when handle() returns, ok or not
        self.handler.handle(key, body).await
    }
}

impl Worker for FetchWorker {
    fn start(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            debug!("📥 fetch worker {} started draining the queue...", self.id);
            // -- recv() errors only once the queue is closed AND empty
            while let Ok(key) = self.rx.recv().await {
                self.process(&key).await;
            }
            debug!("🏁 fetch worker {}: queue closed and drained. Shutting down.", self.id);
            Ok(())
        })
    }
}

//! 🧮 tally: walks an S3 bucket, fetches every object with a pool of workers,
//! and tells you how many bytes were in there and how long it took to find out.
//!
//! 🎬 *[narrator voice]* "One lister. One queue. A hundred workers. Zero chill."
//!
//! ```text
//! lister ──send()──▶ [ bounded queue ] ──recv()──▶ worker × N ──▶ handler
//!    │                                                 │
//!    └── RunStats (listed totals)          FetchTally ◀┘ (per-key outcomes)
//! ```

pub mod app_config;
pub(crate) mod backends;
pub mod common;
pub mod handlers;
mod lister;
mod progress;
pub mod report;
pub mod stats;
mod supervisors;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::app_config::AppConfig;
use crate::handlers::{DiscardHandler, ObjectHandler};
use crate::stats::RunStats;
use crate::supervisors::Supervisor;

/// 🚀 Connect to the configured bucket and tally it, discarding every body.
pub async fn run(app_config: AppConfig) -> Result<RunStats> {
    run_with_handler(app_config, Arc::new(DiscardHandler)).await
}

/// 🚀 Same as [`run`], but every fetched body goes to `handler` instead of the void.
///
/// 💀 Returns `Err` for setup failures (bad config, no credentials) and for a
/// failed listing page. Per-object fetch failures are not errors; they are counted
/// in [`RunStats::fetch`].
pub async fn run_with_handler(
    app_config: AppConfig,
    handler: Arc<dyn ObjectHandler>,
) -> Result<RunStats> {
    app_config.validate()?;
    info!("🧮 tallying {}", app_config.storage.label());

    // ⏱️ the clock starts before credentials are resolved; setup counts toward elapsed
    let stats = RunStats::start();
    let storage = backends::connect(&app_config.storage)
        .await
        .with_context(|| format!("💀 Could not connect to {}", app_config.storage.label()))?;

    Supervisor::new(app_config)
        .run(storage, handler, stats)
        .await
}

//! 🧵 Workers: the backbone of tally, the unsung heroes, the ones who actually
//! do the fetching while the Supervisor takes all the credit in the sprint retro.
//!
//! ⚠️ "If you're reading this, the code review went poorly."

use anyhow::Result;
use tokio::task::JoinHandle;

mod fetch_worker;
pub(crate) use fetch_worker::FetchWorker;

/// 🏗️ A background worker, that does work. duh.
///
/// "What's the DEAL with lifetime annotations? You borrow something,
///  you give it back. It's not that hard, Jerry!" (Seinfeld, on Rust)
pub(crate) trait Worker {
    /// 🚀 Start the worker. Returns a JoinHandle because we trust
    /// but verify. Mostly verify.
    fn start(self) -> JoinHandle<Result<()>>;
}

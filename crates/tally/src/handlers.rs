//! 🍽️ Handlers: what a worker does with an object once it has one.
//!
//! Out of the box: nothing. The [`DiscardHandler`] reads every byte and throws
//! it away, which is exactly what an auditor with no opinions would do.
//! Want to checksum, scan, or copy the bytes instead? Implement [`ObjectHandler`]
//! and pass it to [`crate::run_with_handler`]. 🦆

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::common::ObjectKey;

/// 🌊 A fetched object's content stream.
///
/// Owns the underlying connection. Dropping it releases the connection, whether
/// the stream was read to the end, read halfway, or never touched at all.
pub type ObjectBody = Box<dyn AsyncRead + Send + Unpin>;

/// 🍽️ Consumes one object's body.
///
/// # Contract
/// - Called at most once per key, from whichever worker received the key.
/// - Takes the body by value; it is dropped when `handle` returns, on every path.
/// - Returns the number of bytes consumed. An `Err` is logged against the key
///   and counted as a failed fetch. It never stops the pool.
#[async_trait]
pub trait ObjectHandler: Send + Sync {
    async fn handle(&self, key: &ObjectKey, body: ObjectBody) -> Result<u64>;
}

/// 🗑️ Reads the whole body into the void.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardHandler;

#[async_trait]
impl ObjectHandler for DiscardHandler {
    async fn handle(&self, key: &ObjectKey, mut body: ObjectBody) -> Result<u64> {
        tokio::io::copy(&mut body, &mut tokio::io::sink())
            .await
            .with_context(|| format!("failed reading body of '{}'", key))
    }
}

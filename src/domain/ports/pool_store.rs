//! Pool Store Port
//!
//! Defines the durable byte-store holding the encoded pool document.
//! Implementations may use a local file or in-memory storage.

use async_trait::async_trait;
use std::io;

/// Whole-document storage for the pool.
///
/// This is an outbound port owned exclusively by the registry. Nothing
/// else reads or writes the stored document.
#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Read the whole document, or `None` if nothing has been stored yet.
    async fn load(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replace the whole document.
    ///
    /// Readers must observe either the previous or the new document,
    /// never a partial write.
    async fn replace(&self, bytes: &[u8]) -> io::Result<()>;

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}

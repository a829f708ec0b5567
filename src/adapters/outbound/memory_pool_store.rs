//! In-Memory Pool Store
//!
//! Implements PoolStore in process memory. Nothing survives a restart;
//! useful for ephemeral deployments and tests. Writes can be made to
//! fail on demand to exercise storage error paths.

use crate::domain::ports::PoolStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Pool store holding the document in memory.
#[derive(Debug, Default)]
pub struct MemoryPoolStore {
    document: RwLock<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl MemoryPoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `bytes`.
    pub fn with_document(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            document: RwLock::new(Some(bytes.into())),
            ..Self::default()
        }
    }

    /// Make subsequent `replace` calls fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Overwrite the document directly, bypassing the owning registry.
    pub fn overwrite(&self, bytes: impl Into<Vec<u8>>) {
        *self.document.write() = Some(bytes.into());
    }

    /// Number of successful replacements.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolStore for MemoryPoolStore {
    async fn load(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.document.read().clone())
    }

    async fn replace(&self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "write rejected"));
        }
        *self.document.write() = Some(bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

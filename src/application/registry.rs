//! Backend Registry
//!
//! Owns the pool: an in-memory copy guarded by a reader/writer lock and
//! the durable document behind a [`PoolStore`]. Every mutation is
//! written through to the store before the in-memory copy changes, and
//! every read reconciles with the store first.

use crate::codec;
use crate::domain::entities::{Backend, Pool, PoolViolation};
use crate::domain::errors::{RegistryError, StorageError};
use crate::domain::ports::PoolStore;
use crate::domain::value_objects::PortRange;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Concurrency-safe, durable pool registry.
///
/// Reads run concurrently. Writes are exclusive with each other and
/// with reads, which also serializes read-modify-write sequences.
pub struct Registry {
    store: Arc<dyn PoolStore>,
    cache: RwLock<Pool>,
}

impl Registry {
    /// Load the pool from `store`, or create an empty one over `range`.
    ///
    /// A stored pool keeps its own port bounds. If it was left marked
    /// running by a previous process, it is reset to stopped so the new
    /// process starts from a quiescent baseline.
    pub async fn open(store: Arc<dyn PoolStore>, range: PortRange) -> Result<Self, StorageError> {
        let pool = match store.load().await? {
            Some(bytes) => {
                let mut pool = codec::decode(&bytes)?;
                if pool.range() != Some(range) {
                    tracing::warn!(
                        "stored pool at {} uses ports {}-{}, ignoring configured {}",
                        store.describe(),
                        pool.lower_port,
                        pool.upper_port,
                        range
                    );
                }
                if pool.running {
                    tracing::info!("pool was left running by a previous process, marking stopped");
                    pool.running = false;
                    store.replace(&codec::encode(&pool)?).await?;
                }
                pool
            }
            None => {
                let pool = Pool::new(range);
                store.replace(&codec::encode(&pool)?).await?;
                tracing::info!("created empty pool at {} (ports {})", store.describe(), range);
                pool
            }
        };

        tracing::info!(
            "pool loaded from {}: backends={} alive={}",
            store.describe(),
            pool.backends.len(),
            pool.alive_count()
        );

        Ok(Self {
            store,
            cache: RwLock::new(pool),
        })
    }

    /// Current pool, reconciled with the durable copy.
    ///
    /// Every call reads and decodes the store, so edits made outside this
    /// process are seen by the next request. The in-memory copy is only
    /// the baseline those reads are compared against; it is never served
    /// on its own, including when the store cannot be read.
    pub async fn get_pool(&self) -> Result<Pool, StorageError> {
        {
            let cache = self.cache.read().await;
            let durable = self.load_durable().await?;
            if durable == *cache {
                return Ok(durable);
            }
        }

        let mut cache = self.cache.write().await;
        let durable = self.load_durable().await?;
        if durable != *cache {
            tracing::debug!("durable pool differs from cache, refreshing");
            *cache = durable.clone();
        }
        Ok(durable)
    }

    /// Replace the whole pool.
    ///
    /// The port bounds cannot change: a pool with different bounds is
    /// rejected. On failure the in-memory pool is left untouched.
    pub async fn set_pool(&self, pool: Pool) -> Result<Pool, RegistryError> {
        let mut cache = self.cache.write().await;
        if (pool.lower_port, pool.upper_port) != (cache.lower_port, cache.upper_port) {
            return Err(PoolViolation::BoundsChanged {
                lower: cache.lower_port,
                upper: cache.upper_port,
            }
            .into());
        }
        self.persist(&pool).await?;
        *cache = pool.clone();
        Ok(pool)
    }

    /// Append a backend, rejecting a taken or out-of-range port.
    pub async fn add_backend(&self, backend: Backend) -> Result<(), RegistryError> {
        self.update(|pool| {
            if pool.contains_port(backend.port) {
                return Err(PoolViolation::DuplicatePort(backend.port).into());
            }
            if let Some(range) = pool.range().filter(|r| !r.contains(backend.port)) {
                return Err(PoolViolation::PortOutOfRange {
                    port: backend.port,
                    range,
                }
                .into());
            }
            pool.backends.push(backend);
            Ok(())
        })
        .await
    }

    /// Record liveness for the backend on `port`.
    ///
    /// Only applies while that slot still points at `address`, so a
    /// probe that raced with a reallocation cannot mark the new tenant.
    /// Returns the previous flag, or `None` if nothing was updated.
    pub async fn set_alive(
        &self,
        port: u16,
        address: &str,
        alive: bool,
    ) -> Result<Option<bool>, StorageError> {
        self.update(|pool| {
            Ok(match pool.backend_mut(port) {
                Some(b) if b.address == address => Some(std::mem::replace(&mut b.alive, alive)),
                _ => None,
            })
        })
        .await
    }

    /// Mark whether the service is accepting traffic.
    pub async fn set_running(&self, running: bool) -> Result<(), StorageError> {
        self.update(|pool| {
            pool.running = running;
            Ok(())
        })
        .await
    }

    /// Serialized read-modify-write.
    ///
    /// `f` runs on the freshest durable pool while the writer lock is
    /// held. If it returns `Err`, nothing is written. An unchanged pool
    /// is not rewritten.
    pub async fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Pool) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut cache = self.cache.write().await;
        let before = self.load_durable().await?;

        let mut pool = before.clone();
        let out = f(&mut pool)?;

        if pool != before {
            self.persist(&pool).await?;
        }
        *cache = pool;
        Ok(out)
    }

    async fn load_durable(&self) -> Result<Pool, StorageError> {
        let bytes = self.store.load().await?.ok_or(StorageError::Missing)?;
        Ok(codec::decode(&bytes)?)
    }

    async fn persist(&self, pool: &Pool) -> Result<(), StorageError> {
        let bytes = codec::encode(pool)?;
        self.store.replace(&bytes).await?;
        Ok(())
    }
}

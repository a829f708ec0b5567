//! Round-Robin Balancer - request-time backend selection
//!
//! Holds the cursor and reads a fresh pool snapshot from the registry on
//! every call.

use crate::application::registry::Registry;
use crate::domain::entities::Backend;
use crate::domain::errors::SelectError;
use crate::domain::services::{LoadBalancer, RoundRobin};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Round-robin load balancer over the registry's pool.
pub struct RoundRobinBalancer {
    registry: Arc<Registry>,
    cursor: Mutex<usize>,
}

impl RoundRobinBalancer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            cursor: Mutex::new(0),
        }
    }

    /// Index of the next candidate backend.
    pub fn cursor(&self) -> usize {
        *self.cursor.lock()
    }
}

#[async_trait]
impl LoadBalancer for RoundRobinBalancer {
    async fn next_peer(&self) -> Result<Backend, SelectError> {
        let pool = self.registry.get_pool().await?;

        let index = {
            let mut cursor = self.cursor.lock();
            RoundRobin::pick(&pool.backends, &mut cursor)
        };

        match index {
            Some(i) => {
                let backend = pool.backends[i].clone();
                tracing::debug!("selected backend {} (slot {})", backend.address, i);
                Ok(backend)
            }
            None => {
                tracing::warn!(
                    "no alive backend among {} registered",
                    pool.backends.len()
                );
                Err(SelectError::NoBackendAvailable)
            }
        }
    }
}

//! Backend Allocator - registration use case
//!
//! Hands a port slot to a registering backend and, for brand-new slots,
//! schedules a delayed first probe so the liveness flag catches up
//! before the next full sweep.

use crate::application::registry::Registry;
use crate::domain::entities::slot_address;
use crate::domain::errors::AllocationError;
use crate::domain::ports::Prober;
use crate::domain::services::PortAllocator;
use std::sync::Arc;
use std::time::Duration;

/// Registers backends into the pool.
pub struct Allocator {
    registry: Arc<Registry>,
    prober: Arc<dyn Prober>,
    initial_probe_delay: Duration,
}

impl Allocator {
    pub fn new(registry: Arc<Registry>, prober: Arc<dyn Prober>, initial_probe_delay: Duration) -> Self {
        Self {
            registry,
            prober,
            initial_probe_delay,
        }
    }

    /// Allocate a port for a backend served under `base_url`
    /// (e.g. `http://localhost`). The backend must then listen on
    /// `base_url:port`.
    pub async fn allocate(&self, base_url: &str) -> Result<u16, AllocationError> {
        let allocation = self
            .registry
            .update(|pool| PortAllocator::allocate(pool, base_url))
            .await?;

        let port = allocation.port();
        let address = slot_address(base_url, port);

        if allocation.is_new() {
            tracing::info!("registered new backend {}", address);
            self.schedule_initial_probe(port, address);
        } else {
            tracing::info!("reused dead slot {} for {}", port, address);
        }

        Ok(port)
    }

    /// Fire-and-forget probe of a new backend after the initial delay.
    fn schedule_initial_probe(&self, port: u16, address: String) {
        let registry = self.registry.clone();
        let prober = self.prober.clone();
        let delay = self.initial_probe_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!("{}: initial probe sent", address);

            let alive = match prober.probe(&address).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("initial probe of {} failed: {}", address, e);
                    false
                }
            };

            match registry.set_alive(port, &address, alive).await {
                Ok(Some(_)) => tracing::debug!("{} initial liveness: {}", address, alive),
                Ok(None) => tracing::debug!("{} left the pool before its initial probe", address),
                Err(e) => tracing::error!("failed to record initial probe of {}: {}", address, e),
            }
        });
    }
}

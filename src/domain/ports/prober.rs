//! Reachability Probe Port
//!
//! Abstracts the outbound check used to estimate backend liveness.

use async_trait::async_trait;

/// Checks whether a backend address answers at all.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `address` with a bounded timeout.
    ///
    /// Returns `Err` with a short reason when the backend is unreachable.
    async fn probe(&self, address: &str) -> Result<(), String>;
}

//! Load Balancer Service
//!
//! Pure domain logic for choosing the next backend in round-robin order.
//! The cursor lives with the caller; this module only decides.

use crate::domain::entities::Backend;
use crate::domain::errors::SelectError;
use async_trait::async_trait;

/// Capability exposed to the request dispatch layer.
///
/// Round robin is the only strategy today; others would implement the
/// same contract.
#[async_trait]
pub trait LoadBalancer: Send + Sync {
    /// Pick the backend the next request should be forwarded to.
    async fn next_peer(&self) -> Result<Backend, SelectError>;
}

/// Round-robin selection over an ordered backend list.
pub struct RoundRobin;

impl RoundRobin {
    /// Pick the first alive backend at or after `cursor`.
    ///
    /// Scans forward from `cursor` (clamped into range by modulo) for at
    /// most one full pass. On success the cursor moves to the slot after
    /// the chosen backend and the chosen index is returned. When nothing
    /// is alive the cursor is left at its clamped starting position.
    ///
    /// # Example
    /// ```ignore
    /// let mut cursor = 0;
    /// let first = RoundRobin::pick(&backends, &mut cursor);
    /// let second = RoundRobin::pick(&backends, &mut cursor);
    /// ```
    pub fn pick(backends: &[Backend], cursor: &mut usize) -> Option<usize> {
        let len = backends.len();
        if len == 0 {
            *cursor = 0;
            return None;
        }

        let start = *cursor % len;
        *cursor = start;

        for step in 0..len {
            let index = (start + step) % len;
            if backends[index].alive {
                *cursor = (index + 1) % len;
                return Some(index);
            }
        }

        None
    }
}

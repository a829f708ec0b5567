//! Port Allocation Service
//!
//! Pure domain logic deciding which port slot a registering backend gets.

use crate::domain::entities::{slot_address, Backend, Pool};
use crate::domain::errors::AllocationError;

/// Outcome of a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// A dead backend's slot was taken over; its address was rewritten.
    Reused { port: u16 },
    /// A free port was found and a new alive backend appended.
    New { port: u16 },
}

impl Allocation {
    pub fn port(&self) -> u16 {
        match self {
            Self::Reused { port } | Self::New { port } => *port,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New { .. })
    }
}

/// Port allocator over a pool.
pub struct PortAllocator;

impl PortAllocator {
    /// Register `base_url` into `pool`, mutating it in place.
    ///
    /// Preference order:
    /// 1. the first dead backend, whose address becomes `base_url:port`
    /// 2. the lowest port in range not yet registered
    ///
    /// Fails when the pool is not running or already holds one backend
    /// per port in its range, dead or alive.
    pub fn allocate(pool: &mut Pool, base_url: &str) -> Result<Allocation, AllocationError> {
        if !pool.running {
            return Err(AllocationError::NotRunning);
        }

        let exhausted = AllocationError::Exhausted {
            lower: pool.lower_port,
            upper: pool.upper_port,
        };
        let range = match pool.range() {
            Some(range) if pool.backends.len() < range.len() => range,
            _ => return Err(exhausted),
        };

        if let Some(dead) = pool.backends.iter_mut().find(|b| !b.alive) {
            dead.address = slot_address(base_url, dead.port);
            return Ok(Allocation::Reused { port: dead.port });
        }

        let port = range
            .iter()
            .find(|&p| !pool.contains_port(p))
            .ok_or(exhausted)?;

        pool.backends.push(Backend::on_port(base_url, port));
        Ok(Allocation::New { port })
    }
}

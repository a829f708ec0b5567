//! rrproxy Library
//!
//! Round-robin HTTP load balancer over a durable pool of port-addressed
//! backends. This module exposes the components for use in integration
//! tests and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod codec;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{Allocator, Registry, RoundRobinBalancer};
pub use config::load_config;
pub use domain::entities::{Backend, Pool};
pub use domain::ports::{PoolStore, Prober};
pub use domain::services::LoadBalancer;
pub use domain::value_objects::PortRange;
pub use infrastructure::{HealthChecker, ShutdownController};

//! Domain Layer
//!
//! Pool entities, invariants and the pure selection/allocation rules.
//! Storage and probing are reached only through the ports.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{Backend, Pool, PoolViolation};
pub use errors::{AllocationError, CodecError, RegistryError, SelectError, StorageError};
pub use value_objects::PortRange;

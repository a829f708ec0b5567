//! Application Layer
//!
//! Use cases wiring the pool rules to storage and probing: the registry,
//! request-time selection and backend registration.

pub mod allocator;
pub mod registry;
pub mod round_robin;

pub use allocator::Allocator;
pub use registry::Registry;
pub use round_robin::RoundRobinBalancer;

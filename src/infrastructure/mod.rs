//! Infrastructure Layer
//!
//! Background tasks and process lifecycle.

pub mod health_checker;
pub mod shutdown;

pub use health_checker::{HealthCheckConfig, HealthCheckResult, HealthChecker, SweepOutcome};
pub use shutdown::{shutdown_signal, ShutdownController};

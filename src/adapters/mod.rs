//! Adapters Layer
//!
//! Inbound adapters serve HTTP traffic; outbound adapters implement the
//! domain ports.

pub mod inbound;
pub mod outbound;

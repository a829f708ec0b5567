//! Error taxonomy for pool storage, selection and allocation.

use crate::domain::entities::PoolViolation;
use std::io;

/// The pool document could not be turned into bytes or back.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode pool: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed pool document: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("pool document violates invariants: {0}")]
    Invalid(#[from] PoolViolation),
}

/// Durable read/write failure. Always surfaced to the caller of the
/// registry operation that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("pool store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("pool document is missing from the store")]
    Missing,
}

/// Registry mutation failure.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("rejected pool update: {0}")]
    Rejected(#[from] PoolViolation),
}

/// The selector could not pick a backend.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("no backend available to handle the request")]
    NoBackendAvailable,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A new backend could not be registered.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("can't register now, load balancer is not running")]
    NotRunning,
    #[error("all ports in {lower}-{upper} are occupied")]
    Exhausted { lower: u16, upper: u16 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

//! Pool Codec
//!
//! Serializes the pool to the durable JSON document and back. Only the
//! registry calls into this module.
//!
//! ```json
//! {
//!   "is_alive": false,
//!   "port_lower_limit": 8081,
//!   "port_upper_limit": 8090,
//!   "backends": [{"url": "http://localhost:8081", "port": 8081, "is_alive": true}]
//! }
//! ```
//!
//! Absent fields fall back to defaults so older documents keep loading:
//! a backend without `is_alive` is alive, a pool without `is_alive` is
//! stopped, a pool without `backends` is empty.

use crate::domain::entities::Pool;
use crate::domain::errors::CodecError;

/// Encode a pool into its durable representation.
///
/// A pool that breaks its own invariants is refused rather than written.
pub fn encode(pool: &Pool) -> Result<Vec<u8>, CodecError> {
    pool.validate()?;
    serde_json::to_vec(pool).map_err(CodecError::Encode)
}

/// Decode and validate a durable pool document.
pub fn decode(bytes: &[u8]) -> Result<Pool, CodecError> {
    let pool: Pool = serde_json::from_slice(bytes).map_err(CodecError::Decode)?;
    pool.validate()?;
    Ok(pool)
}

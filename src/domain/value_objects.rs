//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Inclusive range of ports a pool may hand out to backends.
///
/// The bounds are fixed for the lifetime of a pool. A range always
/// contains at least one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    lower: u16,
    upper: u16,
}

impl PortRange {
    /// Build a range, rejecting inverted bounds.
    pub fn new(lower: u16, upper: u16) -> Result<Self, InvalidPortRange> {
        if lower > upper {
            return Err(InvalidPortRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Parse a `"lower,upper"` pair.
    ///
    /// # Examples
    /// ```
    /// use rrproxy::domain::value_objects::PortRange;
    ///
    /// let range = PortRange::parse("9000, 9001").unwrap();
    /// assert_eq!(range.len(), 2);
    /// assert!(PortRange::parse("9001,9000").is_none());
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let (lower, upper) = s.split_once(',')?;
        let lower = lower.trim().parse().ok()?;
        let upper = upper.trim().parse().ok()?;
        Self::new(lower, upper).ok()
    }

    pub fn lower(&self) -> u16 {
        self.lower
    }

    pub fn upper(&self) -> u16 {
        self.upper
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.lower..=self.upper).contains(&port)
    }

    /// Number of ports in the range (never zero).
    pub fn len(&self) -> usize {
        usize::from(self.upper - self.lower) + 1
    }

    /// Always `false`: construction guarantees at least one port.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Ports in ascending order.
    pub fn iter(&self) -> RangeInclusive<u16> {
        self.lower..=self.upper
    }
}

impl Default for PortRange {
    /// Ports 8081 through 8090.
    fn default() -> Self {
        Self {
            lower: 8081,
            upper: 8090,
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower, self.upper)
    }
}

/// Lower bound above upper bound.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid port range: lower bound {lower} is above upper bound {upper}")]
pub struct InvalidPortRange {
    pub lower: u16,
    pub upper: u16,
}

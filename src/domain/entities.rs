//! Domain Entities - Core business objects
//!
//! These entities represent the backend pool the proxy routes across.
//! They carry the durable field names directly so the codec and the
//! HTTP API share one representation.

use crate::domain::value_objects::PortRange;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// A registered upstream server that can receive forwarded requests.
///
/// The forwarding target is derived from `address` on demand and is
/// never stored alongside the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    /// Origin URL requests are forwarded to (e.g. `http://localhost:8081`)
    #[serde(rename = "url")]
    pub address: String,
    /// Port slot occupied in the pool
    pub port: u16,
    /// Last known reachability
    #[serde(rename = "is_alive", default = "default_alive")]
    pub alive: bool,
}

fn default_alive() -> bool {
    true
}

impl Backend {
    /// Create a new backend; it starts out alive.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            alive: true,
        }
    }

    /// Create a backend at `base_url:port`.
    pub fn on_port(base_url: &str, port: u16) -> Self {
        Self::new(slot_address(base_url, port), port)
    }

    /// Forwarding target for a request path (with optional query), or
    /// `None` if the address does not form a valid URL.
    pub fn forward_url(&self, path_and_query: &str) -> Option<Url> {
        let path = if path_and_query.starts_with('/') {
            path_and_query.to_string()
        } else {
            format!("/{}", path_and_query)
        };
        Url::parse(&format!("{}{}", self.address.trim_end_matches('/'), path)).ok()
    }
}

/// Address for a backend occupying `port` under `base_url`.
pub fn slot_address(base_url: &str, port: u16) -> String {
    format!("{}:{}", base_url.trim_end_matches('/'), port)
}

/// The full backend pool: port bounds, service state and the ordered
/// backend list.
///
/// Backend order is the round-robin order. Mutations append or rewrite
/// in place and never reorder existing entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Whether the owning service is accepting traffic
    #[serde(rename = "is_alive", default)]
    pub running: bool,
    #[serde(rename = "port_lower_limit")]
    pub lower_port: u16,
    #[serde(rename = "port_upper_limit")]
    pub upper_port: u16,
    #[serde(default)]
    pub backends: Vec<Backend>,
}

impl Pool {
    /// Empty, stopped pool over `range`.
    pub fn new(range: PortRange) -> Self {
        Self {
            running: false,
            lower_port: range.lower(),
            upper_port: range.upper(),
            backends: Vec::new(),
        }
    }

    /// Port bounds, or `None` if the stored bounds are inverted.
    pub fn range(&self) -> Option<PortRange> {
        PortRange::new(self.lower_port, self.upper_port).ok()
    }

    pub fn contains_port(&self, port: u16) -> bool {
        self.backends.iter().any(|b| b.port == port)
    }

    pub fn backend(&self, port: u16) -> Option<&Backend> {
        self.backends.iter().find(|b| b.port == port)
    }

    pub fn backend_mut(&mut self, port: u16) -> Option<&mut Backend> {
        self.backends.iter_mut().find(|b| b.port == port)
    }

    /// Whether every port slot in the range is taken.
    pub fn is_full(&self) -> bool {
        match self.range() {
            Some(range) => self.backends.len() >= range.len(),
            None => true,
        }
    }

    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.alive).count()
    }

    /// Check the pool invariants: valid bounds, ports unique and in range.
    pub fn validate(&self) -> Result<(), PoolViolation> {
        let range = self.range().ok_or(PoolViolation::InvertedBounds {
            lower: self.lower_port,
            upper: self.upper_port,
        })?;

        for (i, backend) in self.backends.iter().enumerate() {
            if !range.contains(backend.port) {
                return Err(PoolViolation::PortOutOfRange {
                    port: backend.port,
                    range,
                });
            }
            if self.backends[..i].iter().any(|b| b.port == backend.port) {
                return Err(PoolViolation::DuplicatePort(backend.port));
            }
        }
        Ok(())
    }
}

/// A broken pool invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolViolation {
    #[error("port bounds are inverted ({lower} > {upper})")]
    InvertedBounds { lower: u16, upper: u16 },
    #[error("port {0} is already registered")]
    DuplicatePort(u16),
    #[error("port {port} is outside {range}")]
    PortOutOfRange { port: u16, range: PortRange },
    #[error("port bounds are fixed at {lower}-{upper}")]
    BoundsChanged { lower: u16, upper: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(lower: u16, upper: u16, ports: &[u16]) -> Pool {
        let mut pool = Pool::new(PortRange::new(lower, upper).unwrap());
        for &port in ports {
            pool.backends.push(Backend::on_port("http://localhost", port));
        }
        pool
    }

    #[test]
    fn test_backend_new_is_alive() {
        let backend = Backend::new("http://localhost:9000", 9000);
        assert!(backend.alive);
        assert_eq!(backend.port, 9000);
    }

    #[test]
    fn test_on_port_builds_address() {
        let backend = Backend::on_port("http://h", 9000);
        assert_eq!(backend.address, "http://h:9000");

        let trailing = Backend::on_port("http://h/", 9001);
        assert_eq!(trailing.address, "http://h:9001");
    }

    #[test]
    fn test_forward_url() {
        let backend = Backend::on_port("http://127.0.0.1", 9000);
        let url = backend.forward_url("/items?page=2").unwrap();
        assert_eq!(url.port(), Some(9000));
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.path(), "/items");
        assert_eq!(url.query(), Some("page=2"));

        let prefixed = Backend::new("http://h:9000/app/", 9000);
        assert_eq!(
            prefixed.forward_url("x").unwrap().as_str(),
            "http://h:9000/app/x"
        );

        let broken = Backend::new("not a url", 9000);
        assert!(broken.forward_url("/").is_none());
    }

    #[test]
    fn test_new_pool_is_empty_and_stopped() {
        let pool = pool(9000, 9001, &[]);
        assert!(!pool.running);
        assert!(pool.backends.is_empty());
        assert!(!pool.is_full());
    }

    #[test]
    fn test_is_full() {
        assert!(pool(9000, 9001, &[9000, 9001]).is_full());
        assert!(!pool(9000, 9001, &[9001]).is_full());
    }

    #[test]
    fn test_lookup_by_port() {
        let mut pool = pool(9000, 9002, &[9000, 9002]);
        assert!(pool.contains_port(9002));
        assert!(!pool.contains_port(9001));
        pool.backend_mut(9002).unwrap().alive = false;
        assert!(!pool.backend(9002).unwrap().alive);
        assert_eq!(pool.alive_count(), 1);
    }

    #[test]
    fn test_validate_ok() {
        assert!(pool(9000, 9002, &[9002, 9000]).validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_port() {
        let result = pool(9000, 9002, &[9000, 9000]).validate();
        assert_eq!(result, Err(PoolViolation::DuplicatePort(9000)));
    }

    #[test]
    fn test_validate_out_of_range() {
        let result = pool(9000, 9001, &[9005]).validate();
        assert!(matches!(
            result,
            Err(PoolViolation::PortOutOfRange { port: 9005, .. })
        ));
    }

    #[test]
    fn test_validate_inverted_bounds() {
        let mut pool = pool(9000, 9001, &[]);
        pool.lower_port = 9500;
        assert!(matches!(
            pool.validate(),
            Err(PoolViolation::InvertedBounds { .. })
        ));
        assert!(pool.is_full());
    }

    #[test]
    fn test_equality_compares_every_backend_field() {
        let a = pool(9000, 9001, &[9000]);

        let mut other_address = a.clone();
        other_address.backends[0].address = "http://elsewhere:9000".to_string();
        assert_ne!(a, other_address);

        let mut other_liveness = a.clone();
        other_liveness.backends[0].alive = false;
        assert_ne!(a, other_liveness);

        let mut other_running = a.clone();
        other_running.running = true;
        assert_ne!(a, other_running);

        assert_eq!(a, a.clone());
    }
}

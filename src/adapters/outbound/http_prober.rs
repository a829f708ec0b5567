//! HTTP Reachability Prober
//!
//! Implements Prober with a plain HTTP GET. Any response, whatever its
//! status, means the backend is reachable; only transport failures and
//! timeouts count as down.

use crate::domain::ports::Prober;
use async_trait::async_trait;
use std::time::Duration;

/// reqwest-backed prober with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, address: &str) -> Result<(), String> {
        match self.client.get(address).send().await {
            Ok(resp) => {
                tracing::trace!("probe {} answered {}", address, resp.status());
                Ok(())
            }
            Err(e) if e.is_timeout() => Err("probe timeout".to_string()),
            Err(e) => Err(format!("request failed: {}", e)),
        }
    }
}

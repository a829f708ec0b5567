use crate::domain::value_objects::PortRange;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Listeners
    pub listen_addr: String,
    pub api_listen_addr: String,

    // Pool storage
    pub pool_path: String,
    pub port_range: PortRange,

    // Health probing
    pub sweep_interval_secs: u64,
    pub startup_poll_secs: u64,
    pub probe_timeout_secs: u64,
    pub initial_probe_delay_secs: u64,

    pub debug: bool,
}

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RRPROXY_PORT_RANGE must be \"lower,upper\" with lower <= upper, got {0:?}")]
    InvalidPortRange(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            api_listen_addr: "0.0.0.0:8079".to_string(),
            pool_path: "pool.json".to_string(),
            port_range: PortRange::default(),
            sweep_interval_secs: 60,
            startup_poll_secs: 3,
            probe_timeout_secs: 5,
            initial_probe_delay_secs: 5,
            debug: false,
        }
    }
}

impl Config {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn startup_poll(&self) -> Duration {
        Duration::from_secs(self.startup_poll_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn initial_probe_delay(&self) -> Duration {
        Duration::from_secs(self.initial_probe_delay_secs)
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    Ok(load_config_from(|key| std::env::var(key).ok())?)
}

/// Build the configuration from a variable lookup. Unparseable numbers
/// fall back to their defaults; a malformed port range is an error.
pub fn load_config_from<F>(var: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let listen_addr = var("RRPROXY_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

    let api_listen_addr = var("RRPROXY_API_LISTEN_ADDR").unwrap_or(defaults.api_listen_addr);

    let pool_path = var("RRPROXY_POOL_PATH").unwrap_or(defaults.pool_path);

    let port_range = match var("RRPROXY_PORT_RANGE") {
        Some(raw) => PortRange::parse(&raw).ok_or(ConfigError::InvalidPortRange(raw))?,
        None => defaults.port_range,
    };

    let secs = |key: &str, default: u64| {
        var(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    };

    let sweep_interval_secs = secs("RRPROXY_SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs);
    let startup_poll_secs = secs("RRPROXY_STARTUP_POLL_SECS", defaults.startup_poll_secs);
    let probe_timeout_secs = secs("RRPROXY_PROBE_TIMEOUT_SECS", defaults.probe_timeout_secs);
    let initial_probe_delay_secs = secs(
        "RRPROXY_INITIAL_PROBE_DELAY_SECS",
        defaults.initial_probe_delay_secs,
    );

    let debug = var("DEBUG").is_some();

    Ok(Config {
        listen_addr,
        api_listen_addr,
        pool_path,
        port_range,
        sweep_interval_secs,
        startup_poll_secs,
        probe_timeout_secs,
        initial_probe_delay_secs,
        debug,
    })
}

//! rrproxy - Round-Robin HTTP Load Balancer
//!
//! This is the composition root that wires together all the components.

use rrproxy::adapters::inbound::{ApiServer, ProxyServer};
use rrproxy::adapters::outbound::{FilePoolStore, HttpProber};
use rrproxy::application::{Allocator, Registry, RoundRobinBalancer};
use rrproxy::config::load_config;
use rrproxy::infrastructure::{shutdown_signal, HealthCheckConfig, HealthChecker, ShutdownController};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting rrproxy listen={} api={} ports={} pool={}",
        cfg.listen_addr,
        cfg.api_listen_addr,
        cfg.port_range,
        cfg.pool_path
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters
    let store = Arc::new(FilePoolStore::new(&cfg.pool_path));
    let prober = Arc::new(HttpProber::new(cfg.probe_timeout())?);

    // 2. Application services
    let registry = Arc::new(Registry::open(store, cfg.port_range).await?);
    let balancer = Arc::new(RoundRobinBalancer::new(registry.clone()));
    let allocator = Arc::new(Allocator::new(
        registry.clone(),
        prober.clone(),
        cfg.initial_probe_delay(),
    ));

    // 3. Background prober
    let shutdown = ShutdownController::new();
    let checker = HealthChecker::new(
        HealthCheckConfig {
            interval: cfg.sweep_interval(),
            idle_interval: cfg.startup_poll(),
        },
        registry.clone(),
        prober,
    );
    let checker_handle = checker.start(shutdown.clone());

    // 4. Inbound adapters
    let proxy = ProxyServer::new(cfg.listen_addr.clone(), balancer)?;
    let api = ApiServer::new(cfg.api_listen_addr.clone(), registry.clone(), allocator);

    registry.set_running(true).await?;
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let served = tokio::try_join!(proxy.run(shutdown.clone()), api.run(shutdown.clone()));

    // Stop the prober even when a listener failed
    shutdown.shutdown();
    if let Err(e) = checker_handle.await {
        tracing::error!("health checker task failed: {}", e);
    }
    registry.set_running(false).await?;
    tracing::info!("rrproxy stopped");

    served.map(|_| ())
}

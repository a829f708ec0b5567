//! Active Health Checker
//!
//! Periodically probes every backend in the pool and writes the liveness
//! flags back through the registry. Probing is best-effort: failures are
//! logged and the next sweep tries again.

use crate::application::registry::Registry;
use crate::domain::entities::Backend;
use crate::domain::errors::StorageError;
use crate::domain::ports::Prober;
use crate::infrastructure::shutdown::ShutdownController;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Health check configuration.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Interval between full sweeps while the service is running
    pub interval: Duration,
    /// Poll interval while waiting for the service to start, and the
    /// retry delay after a failed pool read
    pub idle_interval: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            idle_interval: Duration::from_secs(3),
        }
    }
}

/// Result of a single probe.
#[derive(Debug, Clone)]
pub enum HealthCheckResult {
    Success { latency_ms: u64 },
    Failure { error: String, latency_ms: u64 },
}

impl HealthCheckResult {
    pub fn is_success(&self) -> bool {
        matches!(self, HealthCheckResult::Success { .. })
    }
}

/// What one tick of the loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The service is not running yet; nothing was probed.
    Waiting,
    /// Running, but no backend is registered.
    Empty,
    /// Every backend was probed.
    Swept { alive: usize, dead: usize },
}

/// Background prober keeping the registry's liveness flags current.
pub struct HealthChecker {
    config: HealthCheckConfig,
    registry: Arc<Registry>,
    prober: Arc<dyn Prober>,
}

impl HealthChecker {
    pub fn new(config: HealthCheckConfig, registry: Arc<Registry>, prober: Arc<dyn Prober>) -> Self {
        Self {
            config,
            registry,
            prober,
        }
    }

    /// Start the health check loop. It runs until `shutdown` fires.
    pub fn start(self, shutdown: ShutdownController) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut stop = shutdown.subscribe();

            while !shutdown.is_shutdown() {
                let wait = match self.sweep().await {
                    Ok(SweepOutcome::Waiting) => {
                        tracing::info!("waiting for server to start");
                        self.config.idle_interval
                    }
                    Ok(SweepOutcome::Empty) => {
                        tracing::info!("no backend instances registered");
                        self.config.interval
                    }
                    Ok(SweepOutcome::Swept { alive, dead }) => {
                        tracing::info!("sweep done: alive={} dead={}", alive, dead);
                        self.config.interval
                    }
                    Err(e) => {
                        tracing::error!("health sweep failed: {}", e);
                        self.config.idle_interval
                    }
                };

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = stop.recv() => break,
                }
            }

            tracing::info!("health checker stopped");
        })
    }

    /// Run one sweep: read the pool, probe every backend concurrently,
    /// record the results in a single registry write.
    pub async fn sweep(&self) -> Result<SweepOutcome, StorageError> {
        let pool = self.registry.get_pool().await?;

        if !pool.running {
            return Ok(SweepOutcome::Waiting);
        }
        if pool.backends.is_empty() {
            return Ok(SweepOutcome::Empty);
        }

        tracing::debug!("probing {} backends", pool.backends.len());

        let results = join_all(
            pool.backends
                .iter()
                .map(|b| Self::check_backend(self.prober.as_ref(), b)),
        )
        .await;

        let probed: Vec<(&Backend, HealthCheckResult)> =
            pool.backends.iter().zip(results).collect();

        let transitions = self
            .registry
            .update(|current| {
                let mut transitions = Vec::new();
                for (target, result) in &probed {
                    let alive = result.is_success();
                    // skip slots reallocated while the probe was in flight
                    if let Some(b) = current
                        .backend_mut(target.port)
                        .filter(|b| b.address == target.address)
                    {
                        if b.alive != alive {
                            transitions.push((b.address.clone(), alive));
                        }
                        b.alive = alive;
                    }
                }
                Ok::<_, StorageError>(transitions)
            })
            .await?;

        for (address, alive) in transitions {
            if alive {
                tracing::info!("backend {} is now alive", address);
            } else {
                tracing::warn!("backend {} is now dead", address);
            }
        }

        for (backend, result) in &probed {
            if let HealthCheckResult::Failure { error, latency_ms } = result {
                tracing::debug!(
                    "probe of {} failed after {}ms: {}",
                    backend.address,
                    latency_ms,
                    error
                );
            }
        }

        let alive = probed.iter().filter(|(_, r)| r.is_success()).count();
        Ok(SweepOutcome::Swept {
            alive,
            dead: probed.len() - alive,
        })
    }

    /// Probe a single backend.
    async fn check_backend(prober: &dyn Prober, backend: &Backend) -> HealthCheckResult {
        let start = Instant::now();
        let result = prober.probe(&backend.address).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => HealthCheckResult::Success { latency_ms },
            Err(error) => HealthCheckResult::Failure { error, latency_ms },
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::MemoryPoolStore;
    use crate::domain::value_objects::PortRange;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use tracing_test::traced_test;

    /// Prober whose reachable set can change between sweeps.
    #[derive(Default)]
    struct ScriptedProber {
        reachable: Mutex<HashSet<String>>,
        delay: Duration,
    }

    impl ScriptedProber {
        fn reachable(addresses: &[&str]) -> Self {
            Self {
                reachable: Mutex::new(addresses.iter().map(|s| s.to_string()).collect()),
                delay: Duration::ZERO,
            }
        }

        fn set_reachable(&self, addresses: &[&str]) {
            *self.reachable.lock() = addresses.iter().map(|s| s.to_string()).collect();
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, address: &str) -> Result<(), String> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.reachable.lock().contains(address) {
                Ok(())
            } else {
                Err("connection refused".to_string())
            }
        }
    }

    async fn registry_with(running: bool, ports: &[u16]) -> (Arc<MemoryPoolStore>, Arc<Registry>) {
        let store = Arc::new(MemoryPoolStore::new());
        let registry = Registry::open(store.clone(), PortRange::new(9000, 9009).unwrap())
            .await
            .unwrap();
        for &port in ports {
            registry
                .add_backend(Backend::on_port("http://localhost", port))
                .await
                .unwrap();
        }
        registry.set_running(running).await.unwrap();
        (store, Arc::new(registry))
    }

    fn fast_config() -> HealthCheckConfig {
        HealthCheckConfig {
            interval: Duration::from_millis(20),
            idle_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_health_check_config_default() {
        let config = HealthCheckConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.idle_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_health_check_result_is_success() {
        let success = HealthCheckResult::Success { latency_ms: 10 };
        assert!(success.is_success());

        let failure = HealthCheckResult::Failure {
            error: "test".to_string(),
            latency_ms: 10,
        };
        assert!(!failure.is_success());
    }

    #[tokio::test]
    async fn test_sweep_waits_when_not_running() {
        let (_store, registry) = registry_with(false, &[9000]).await;
        let checker = HealthChecker::new(
            fast_config(),
            registry.clone(),
            Arc::new(ScriptedProber::default()),
        );

        assert_eq!(checker.sweep().await.unwrap(), SweepOutcome::Waiting);
        assert!(registry.get_pool().await.unwrap().backends[0].alive);
    }

    #[tokio::test]
    async fn test_sweep_empty_pool() {
        let (_store, registry) = registry_with(true, &[]).await;
        let checker =
            HealthChecker::new(fast_config(), registry, Arc::new(ScriptedProber::default()));

        assert_eq!(checker.sweep().await.unwrap(), SweepOutcome::Empty);
    }

    #[tokio::test]
    async fn test_sweep_marks_unreachable_dead_and_recovers() {
        let (_store, registry) = registry_with(true, &[9000, 9001]).await;
        let prober = Arc::new(ScriptedProber::reachable(&["http://localhost:9001"]));
        let checker = HealthChecker::new(fast_config(), registry.clone(), prober.clone());

        let outcome = checker.sweep().await.unwrap();
        assert_eq!(outcome, SweepOutcome::Swept { alive: 1, dead: 1 });

        let pool = registry.get_pool().await.unwrap();
        assert!(!pool.backend(9000).unwrap().alive);
        assert!(pool.backend(9001).unwrap().alive);

        prober.set_reachable(&["http://localhost:9000", "http://localhost:9001"]);
        checker.sweep().await.unwrap();
        assert_eq!(registry.get_pool().await.unwrap().alive_count(), 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_sweep_logs_liveness_transitions() {
        let (_store, registry) = registry_with(true, &[9000]).await;
        let prober = Arc::new(ScriptedProber::default());
        let checker = HealthChecker::new(fast_config(), registry, prober.clone());

        checker.sweep().await.unwrap();
        assert!(logs_contain("backend http://localhost:9000 is now dead"));

        prober.set_reachable(&["http://localhost:9000"]);
        checker.sweep().await.unwrap();
        assert!(logs_contain("backend http://localhost:9000 is now alive"));
    }

    #[tokio::test]
    async fn test_sweep_probes_concurrently() {
        let ports: Vec<u16> = (9000..9010).collect();
        let (_store, registry) = registry_with(true, &ports).await;
        let prober = Arc::new(ScriptedProber {
            reachable: Mutex::new(HashSet::new()),
            delay: Duration::from_millis(100),
        });
        let checker = HealthChecker::new(fast_config(), registry, prober);

        let started = Instant::now();
        checker.sweep().await.unwrap();
        // ten sequential probes would take a second
        assert!(started.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_sweep_reports_storage_error() {
        let (store, registry) = registry_with(true, &[9000]).await;
        let checker = HealthChecker::new(
            fast_config(),
            registry,
            Arc::new(ScriptedProber::default()),
        );

        store.set_fail_writes(true);
        assert!(matches!(checker.sweep().await, Err(StorageError::Io(_))));
    }

    #[tokio::test]
    async fn test_sweep_matches_probe_to_each_backend() {
        let (_store, registry) = registry_with(true, &[9000, 9001, 9002]).await;
        let prober = Arc::new(ScriptedProber::reachable(&[
            "http://localhost:9000",
            "http://localhost:9002",
        ]));
        let checker = HealthChecker::new(fast_config(), registry.clone(), prober);

        let outcome = checker.sweep().await.unwrap();
        assert_eq!(outcome, SweepOutcome::Swept { alive: 2, dead: 1 });

        let flags: Vec<(u16, bool)> = registry
            .get_pool()
            .await
            .unwrap()
            .backends
            .iter()
            .map(|b| (b.port, b.alive))
            .collect();
        assert_eq!(flags, vec![(9000, true), (9001, false), (9002, true)]);
    }

    #[tokio::test]
    async fn test_loop_updates_then_stops_on_shutdown() {
        let (_store, registry) = registry_with(true, &[9000]).await;
        let checker = HealthChecker::new(
            fast_config(),
            registry.clone(),
            Arc::new(ScriptedProber::default()),
        );
        let shutdown = ShutdownController::new();

        let handle = checker.start(shutdown.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!registry.get_pool().await.unwrap().backends[0].alive);

        shutdown.shutdown();
        let joined = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(joined.is_ok());
    }

    #[tokio::test]
    async fn test_loop_survives_storage_errors() {
        let (store, registry) = registry_with(true, &[9000]).await;
        let checker = HealthChecker::new(
            fast_config(),
            registry.clone(),
            Arc::new(ScriptedProber::default()),
        );
        let shutdown = ShutdownController::new();

        store.set_fail_writes(true);
        let handle = checker.start(shutdown.clone());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!handle.is_finished());

        store.set_fail_writes(false);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!registry.get_pool().await.unwrap().backends[0].alive);

        shutdown.shutdown();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}

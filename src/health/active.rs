//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend in the pool
//! - Update backend liveness from probe results
//! - Stop cleanly on the shutdown signal

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::probe::{Probe, TcpProbe};
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::pool::ServerPool;

/// Background task running one probe cycle per interval.
pub struct HealthMonitor<P = TcpProbe> {
    pool: Arc<ServerPool>,
    probe: P,
    interval: Duration,
}

impl HealthMonitor<TcpProbe> {
    pub fn new(pool: Arc<ServerPool>, config: &HealthCheckConfig) -> Self {
        Self::with_probe(pool, TcpProbe::new(config.timeout()), config.interval())
    }
}

impl<P: Probe> HealthMonitor<P> {
    pub fn with_probe(pool: Arc<ServerPool>, probe: P, interval: Duration) -> Self {
        Self {
            pool,
            probe,
            interval,
        }
    }

    /// Run until shutdown. The first cycle starts one interval after launch.
    ///
    /// A cycle is awaited inside the loop, so a slow cycle delays the next tick
    /// instead of overlapping with it.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(interval = ?self.interval, "Health monitor starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run a single probe cycle over the whole pool.
    pub async fn check_all(&self) {
        tracing::info!("Starting health check...");
        self.pool.health_check(&self.probe).await;
        tracing::info!("Health check completed");
    }
}

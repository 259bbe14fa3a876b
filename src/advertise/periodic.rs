//! Periodic advertisement loop
//!
//! [`PeriodicAdvertise::launch`] writes a pre-flight `Warning`, runs one full
//! pass on the caller's task, then spawns the ticking loop into the caller's
//! [`JoinSet`]. The loop runs a pass per tick until the shutdown signal
//! flips to `true` (or its sender is dropped). Shutdown is only observed
//! between passes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::DEFAULT_ADVERTISE_INTERVAL_SECS;
use crate::metrics::health::{self, HealthComponent, HealthLevel, HealthRegistry};
use crate::server::ManagedServer;

use super::{AdvertiseError, Advertiser};

/// Health message shown until the first pass finishes
pub const FIRST_ATTEMPT_MESSAGE: &str = "First attempt to advertise to the director...";

/// Runs [`Advertiser::advertise`] on a fixed period and reports the outcome
/// as [`HealthComponent::Federation`] health
#[derive(Clone)]
pub struct PeriodicAdvertise {
    advertiser: Advertiser,
    servers: Arc<[Arc<dyn ManagedServer>]>,
    health: HealthRegistry,
    interval: Duration,
}

impl PeriodicAdvertise {
    /// Report to the global registry every 60 seconds
    pub fn new(advertiser: Advertiser, servers: Vec<Arc<dyn ManagedServer>>) -> Self {
        Self {
            advertiser,
            servers: servers.into(),
            health: health::global(),
            interval: Duration::from_secs(DEFAULT_ADVERTISE_INTERVAL_SECS),
        }
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the first pass now, then keep advertising in the background
    ///
    /// When this returns, the federation health entry reflects the first
    /// pass. Later failures only show up in health status and logs.
    pub async fn launch(
        self,
        shutdown: watch::Receiver<bool>,
        tasks: &mut JoinSet<crate::error::Result<()>>,
    ) {
        self.health.set_status(
            HealthComponent::Federation,
            HealthLevel::Warning,
            FIRST_ATTEMPT_MESSAGE,
        );
        // The outcome already went to health status and the log.
        let _ = self.run_pass().await;

        tasks.spawn(self.run(shutdown));
    }

    /// One pass over every server, reflected into health status
    pub async fn run_pass(&self) -> Result<(), AdvertiseError> {
        let result = self.advertiser.advertise(&self.servers).await;

        match &result {
            Ok(()) => {
                self.health
                    .set_status(HealthComponent::Federation, HealthLevel::Ok, "");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Server failed to advertise to the director");
                self.health.set_status(
                    HealthComponent::Federation,
                    HealthLevel::Critical,
                    format!("Server failed to advertise to the director: {e}"),
                );
            }
        }

        result
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) -> crate::error::Result<()> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender dropped: nobody can ask us to stop any more.
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let _ = self.run_pass().await;
                }
            }
        }

        tracing::info!("Periodic advertisement loop has been terminated");
        Ok(())
    }
}

/// Start advertising `servers` every 60 seconds, reporting to the global
/// health registry
pub async fn launch_periodic_advertise(
    advertiser: Advertiser,
    servers: Vec<Arc<dyn ManagedServer>>,
    shutdown: watch::Receiver<bool>,
    tasks: &mut JoinSet<crate::error::Result<()>>,
) {
    PeriodicAdvertise::new(advertiser, servers)
        .launch(shutdown, tasks)
        .await;
}

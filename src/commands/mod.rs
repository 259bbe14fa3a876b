//! Command implementations for the CLI
//!
//! - `run`: advertise periodically and serve health status until Ctrl-C
//! - `once`: advertise every configured server a single time

use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};

use crate::advertise::{Advertiser, PeriodicAdvertise};
use crate::config::Config;
use crate::error::{Error, ErrorClass, Result};
use crate::metrics::{self, health};
use crate::status;

/// Advertise on a fixed period until Ctrl-C
///
/// A background task that exits early ends the run as if Ctrl-C was
/// pressed, so a dead status endpoint is never left unnoticed.
pub async fn run(config: Config) -> Result<()> {
    if let Err(e) = metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {}", e);
    }

    let servers = config.build_servers();
    if servers.is_empty() {
        tracing::warn!("No [[servers]] configured; advertisement passes will be empty");
    }

    let advertiser = Advertiser::from_config(&config)?;
    let registry = health::global();
    let listener = status::bind(config.server.status_address).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    let status_shutdown = {
        let mut rx = shutdown_rx.clone();
        async move {
            let _ = rx.wait_for(|stop| *stop).await;
        }
    };
    tasks.spawn(status::serve(listener, registry.clone(), status_shutdown));

    PeriodicAdvertise::new(advertiser, servers)
        .with_health(registry)
        .with_interval(config.advertise_interval())
        .launch(shutdown_rx, &mut tasks)
        .await;

    tracing::info!(
        interval_secs = config.advertise.interval_secs,
        "Periodic advertisement started; press Ctrl-C to stop"
    );

    let mut first_err = None;
    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => tracing::info!("Shutdown signal received, stopping..."),
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        },
        Some(joined) = tasks.join_next() => {
            tracing::error!("Background task stopped before shutdown was requested");
            record_exit(joined, &mut first_err);
        }
    }
    let _ = shutdown_tx.send(true);

    while let Some(joined) = tasks.join_next().await {
        record_exit(joined, &mut first_err);
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn record_exit(joined: std::result::Result<Result<()>, JoinError>, first_err: &mut Option<Error>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Background task failed");
            first_err.get_or_insert(e);
        }
        Err(e) => {
            tracing::error!(error = %e, "Background task panicked");
            first_err.get_or_insert(Error::with_source("background task panicked", e));
        }
    }
}

/// Advertise every configured server once
pub async fn once(config: Config) -> Result<()> {
    let servers = config.build_servers();
    let advertiser = Advertiser::from_config(&config)?;

    match advertiser.advertise(&servers).await {
        Ok(()) => {
            tracing::info!("Advertised {} servers to the director", servers.len());
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                category = e.category().as_str(),
                recoverable = e.is_recoverable(),
                "Advertisement failed: {}",
                e
            );
            Err(e.into())
        }
    }
}

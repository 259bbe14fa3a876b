//! pelican-advertise - director advertisement for federated storage servers
//!
//! Origins and caches in a federation must keep telling the director that
//! they exist, where they serve data and which namespaces they cover. This
//! crate runs that announcement on a fixed period and publishes the outcome
//! as component health.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`advertise`] - Periodic loop, per-pass orchestration and the wire protocol
//! - [`server`] - Managed server contract and advertisement payload
//! - [`federation`] - Director endpoint lookup
//! - [`token`] - Advertisement bearer tokens
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Component health registry and Prometheus metrics
//! - [`status`] - HTTP health status endpoint
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use pelican_advertise::advertise::{Advertiser, PeriodicAdvertise};
//! use pelican_advertise::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let advertiser = Advertiser::from_config(&config)?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let mut tasks = tokio::task::JoinSet::new();
//!     PeriodicAdvertise::new(advertiser, config.build_servers())
//!         .launch(shutdown_rx, &mut tasks)
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod advertise;
pub mod commands;
pub mod config;
pub mod error;
pub mod federation;
pub mod metrics;
pub mod server;
pub mod status;
pub mod token;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::advertise::{launch_periodic_advertise, AdvertiseError, Advertiser, PeriodicAdvertise};
    pub use crate::config::{Config, ConfigProvider};
    pub use crate::error::{Error, ErrorCategory, ErrorClass, Result};
    pub use crate::metrics::health::{HealthComponent, HealthLevel, HealthRegistry};
    pub use crate::server::{ManagedServer, ServerAdvertisement, ServerType};
}

// Direct re-exports for convenience
pub use server::{ManagedServer, ServerType};

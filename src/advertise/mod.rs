//! Director advertisement
//!
//! Origins and caches announce themselves to the federation's director so it
//! can route clients to them. This module runs that announcement.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              PeriodicAdvertise               │
//! │  pre-flight Warning → pass → tick → pass ... │
//! │          (stops on shutdown signal)          │
//! └──────────────────────┬───────────────────────┘
//!                        │ once per pass
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │          Advertiser::advertise               │
//! │  every server in order, first error wins     │
//! └──────────────────────┬───────────────────────┘
//!                        │ once per server
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │          Advertiser::advertise_one           │
//! │  name → ads → payload → director → token →   │
//! │  POST /api/v1.0/director/register<Role>      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pelican_advertise::advertise::{launch_periodic_advertise, Advertiser};
//!
//! let advertiser = Advertiser::from_config(&config)?;
//! let mut tasks = tokio::task::JoinSet::new();
//! launch_periodic_advertise(advertiser, servers, shutdown_rx, &mut tasks).await;
//! ```

pub mod error;
pub mod periodic;
mod transport;

pub use error::{AdvertiseError, DirectorResponse};
pub use periodic::{launch_periodic_advertise, PeriodicAdvertise};

use reqwest::Client;
use std::sync::Arc;

use crate::config::{Config, ConfigProvider, ConfiguredServiceName, ServiceNameResolver};
use crate::federation::{self, FederationDiscovery};
use crate::server::ManagedServer;
use crate::token::{self, AdvertiseTokenProvider};

// ============================================================================
// Advertiser
// ============================================================================

/// Advertises managed servers to the director
///
/// Cloning is cheap; all collaborators are shared.
#[derive(Clone)]
pub struct Advertiser {
    config: Arc<dyn ConfigProvider>,
    names: Arc<dyn ServiceNameResolver>,
    federation: Arc<dyn FederationDiscovery>,
    tokens: Arc<dyn AdvertiseTokenProvider>,
    http_client: Client,
}

impl Advertiser {
    pub fn builder() -> AdvertiserBuilder {
        AdvertiserBuilder::default()
    }

    /// Wire every collaborator from configuration
    pub fn from_config(config: &Config) -> Result<Self, crate::error::Error> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let tokens = token::from_config(config).ok_or_else(|| {
            crate::error::Error::config("one of advertise.token or advertise.token_file must be set")
        })?;

        Ok(Self {
            config: Arc::new(config.clone()),
            names: Arc::new(ConfiguredServiceName::from_config(config)),
            federation: federation::from_config(config, http_client.clone()),
            tokens,
            http_client,
        })
    }

    /// Advertise every server once, in order
    ///
    /// Every server is attempted even after a failure. Only the first error
    /// is returned; the rest are logged here and then dropped.
    pub async fn advertise(&self, servers: &[Arc<dyn ManagedServer>]) -> Result<(), AdvertiseError> {
        tracing::debug!("About to advertise {} servers", servers.len());

        let mut first_err = None;
        for server in servers {
            if let Err(e) = self.advertise_one(server.as_ref()).await {
                tracing::warn!(
                    server_type = %server.server_type(),
                    error = %e,
                    "Server advertisement failed"
                );
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Advertiser`], used when collaborators don't come from
/// [`Config`]
#[derive(Default)]
pub struct AdvertiserBuilder {
    config: Option<Arc<dyn ConfigProvider>>,
    names: Option<Arc<dyn ServiceNameResolver>>,
    federation: Option<Arc<dyn FederationDiscovery>>,
    tokens: Option<Arc<dyn AdvertiseTokenProvider>>,
    http_client: Option<Client>,
}

impl AdvertiserBuilder {
    pub fn config(mut self, config: Arc<dyn ConfigProvider>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn service_names(mut self, names: Arc<dyn ServiceNameResolver>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn federation(mut self, federation: Arc<dyn FederationDiscovery>) -> Self {
        self.federation = Some(federation);
        self
    }

    pub fn tokens(mut self, tokens: Arc<dyn AdvertiseTokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<Advertiser, BuildError> {
        Ok(Advertiser {
            config: self.config.ok_or(BuildError::Missing("config"))?,
            names: self.names.ok_or(BuildError::Missing("service_names"))?,
            federation: self.federation.ok_or(BuildError::Missing("federation"))?,
            tokens: self.tokens.ok_or(BuildError::Missing("tokens"))?,
            http_client: self.http_client.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("advertiser is missing its {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::StaticFederation;
    use crate::token::StaticToken;

    #[test]
    fn test_builder_requires_collaborators() {
        let result = Advertiser::builder()
            .config(Arc::new(Config::default()))
            .build();
        assert_eq!(result.err(), Some(BuildError::Missing("service_names")));
    }

    #[test]
    fn test_builder_complete() {
        let result = Advertiser::builder()
            .config(Arc::new(Config::default()))
            .service_names(Arc::new(ConfiguredServiceName::new(Some("site".into()), "")))
            .federation(Arc::new(StaticFederation::default()))
            .tokens(Arc::new(StaticToken::new("t")))
            .build();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_from_config_requires_token() {
        let err = Advertiser::from_config(&Config::default()).err().unwrap();
        assert!(err.to_string().contains("advertise.token"));

        let mut config = Config::default();
        config.advertise.token = Some("abc".into());
        assert!(Advertiser::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_empty_server_list() {
        let advertiser = Advertiser::builder()
            .config(Arc::new(Config::default()))
            .service_names(Arc::new(ConfiguredServiceName::new(None, "")))
            .federation(Arc::new(StaticFederation::default()))
            .tokens(Arc::new(StaticToken::new("t")))
            .build()
            .unwrap();

        assert!(advertiser.advertise(&[]).await.is_ok());
    }
}

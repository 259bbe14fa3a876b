//! Federation metadata lookup
//!
//! The advertisement transport needs the director's endpoint before every
//! attempt. It gets it from a [`FederationDiscovery`] implementation:
//! either a fixed value from configuration or the federation's
//! `/.well-known/pelican-configuration` document.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;

const WELL_KNOWN_PATH: &str = "/.well-known/pelican-configuration";

/// Federation-wide service endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationInfo {
    #[serde(default)]
    pub director_endpoint: String,
    #[serde(default)]
    pub namespace_registration_endpoint: String,
    #[serde(default)]
    pub jwks_uri: String,
}

impl FederationInfo {
    pub fn with_director(director_endpoint: impl Into<String>) -> Self {
        Self {
            director_endpoint: director_endpoint.into(),
            ..Default::default()
        }
    }
}

/// Source of [`FederationInfo`]
#[async_trait]
pub trait FederationDiscovery: Send + Sync {
    async fn federation_info(&self) -> anyhow::Result<FederationInfo>;
}

/// Fixed federation metadata
#[derive(Debug, Clone, Default)]
pub struct StaticFederation {
    info: FederationInfo,
}

impl StaticFederation {
    pub fn new(info: FederationInfo) -> Self {
        Self { info }
    }
}

#[async_trait]
impl FederationDiscovery for StaticFederation {
    async fn federation_info(&self) -> anyhow::Result<FederationInfo> {
        Ok(self.info.clone())
    }
}

/// Fetches federation metadata from the discovery URL
///
/// The first answer naming a director is kept for the lifetime of the
/// client. Failures and answers without a director endpoint are not cached,
/// so the next attempt retries the fetch.
pub struct DiscoveryClient {
    discovery_url: String,
    http_client: Client,
    cached: RwLock<Option<FederationInfo>>,
}

impl DiscoveryClient {
    pub fn new(discovery_url: impl Into<String>, http_client: Client) -> Self {
        Self {
            discovery_url: discovery_url.into(),
            http_client,
            cached: RwLock::new(None),
        }
    }

    fn well_known_url(&self) -> String {
        format!("{}{}", self.discovery_url.trim_end_matches('/'), WELL_KNOWN_PATH)
    }

    async fn fetch(&self) -> anyhow::Result<FederationInfo> {
        let url = self.well_known_url();
        tracing::debug!(url = %url, "Discovering federation metadata");

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.with_context(|| {
                format!("federation discovery at {url} returned {status} with an unreadable body")
            })?;
            anyhow::bail!("federation discovery at {url} returned {status}: {body}");
        }

        Ok(response.json::<FederationInfo>().await?)
    }
}

#[async_trait]
impl FederationDiscovery for DiscoveryClient {
    async fn federation_info(&self) -> anyhow::Result<FederationInfo> {
        if let Some(info) = self.cached.read().await.as_ref() {
            return Ok(info.clone());
        }

        let info = self.fetch().await?;
        if info.director_endpoint.is_empty() {
            tracing::warn!(url = %self.discovery_url, "Federation discovery returned no director endpoint");
        } else {
            *self.cached.write().await = Some(info.clone());
        }
        Ok(info)
    }
}

/// Pick the discovery strategy described by `config`
///
/// An explicit director URL wins over discovery. With neither set, the
/// returned source yields an empty director endpoint, which fails each
/// advertisement attempt without sending anything.
pub fn from_config(config: &Config, http_client: Client) -> Arc<dyn FederationDiscovery> {
    let director = config
        .federation
        .director_url
        .as_deref()
        .filter(|u| !u.is_empty());

    match (director, config.federation.discovery_url.as_deref()) {
        (Some(director), _) => Arc::new(StaticFederation::new(FederationInfo::with_director(director))),
        (None, Some(discovery)) if !discovery.is_empty() => {
            Arc::new(DiscoveryClient::new(discovery, http_client))
        }
        _ => {
            tracing::warn!("Neither federation.director_url nor federation.discovery_url is set");
            Arc::new(StaticFederation::default())
        }
    }
}

//! Managed servers and their advertisements
//!
//! A managed server is a locally-run origin or cache on whose behalf this
//! crate advertises to the director. The [`ManagedServer`] trait is the
//! contract the advertisement loop consumes; [`ConfiguredServer`] is the
//! implementation built from the `[[servers]]` config section.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

// ============================================================================
// Server Type
// ============================================================================

/// Role of a managed server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerType {
    Origin,
    Cache,
}

impl ServerType {
    /// Exact role name, as used in the registration path
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Origin => "Origin",
            Self::Cache => "Cache",
        }
    }

    /// Director endpoint path for registering this role
    pub fn registration_path(&self) -> String {
        format!("/api/v1.0/director/register{}", self.as_str())
    }

    /// `User-Agent` header value sent with advertisements
    pub fn user_agent(&self, version: &str) -> String {
        format!("pelican-{}/{}", self.as_str().to_lowercase(), version)
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerType {
    type Err = InvalidServerType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "origin" => Ok(Self::Origin),
            "cache" => Ok(Self::Cache),
            _ => Err(InvalidServerType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid server type: {0} (expected Origin or Cache)")]
pub struct InvalidServerType(pub String);

// ============================================================================
// Advertisement Payload
// ============================================================================

/// What a namespace allows clients to do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NamespaceCaps {
    pub public_reads: bool,
    pub reads: bool,
    pub writes: bool,
    pub listings: bool,
}

/// A data-path prefix served by a managed server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceAd {
    pub path: String,
    #[serde(default)]
    pub caps: NamespaceCaps,
}

impl NamespaceAd {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            caps: NamespaceCaps::default(),
        }
    }

    pub fn with_caps(mut self, caps: NamespaceCaps) -> Self {
        self.caps = caps;
        self
    }
}

/// Body of a registration request, built fresh for every attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerAdvertisement {
    pub name: String,
    #[serde(rename = "type")]
    pub server_type: ServerType,
    #[serde(rename = "data-url")]
    pub data_url: String,
    #[serde(rename = "web-url", default, skip_serializing_if = "String::is_empty")]
    pub web_url: String,
    pub namespaces: Vec<NamespaceAd>,
}

// ============================================================================
// Managed Server
// ============================================================================

/// A server this process advertises to the director
#[async_trait]
pub trait ManagedServer: Send + Sync {
    fn server_type(&self) -> ServerType;

    /// Pull the director's current view of this server's namespaces
    async fn refresh_namespace_ads(&self) -> anyhow::Result<()>;

    /// Build an advertisement from the current namespace snapshot
    fn create_advertisement(
        &self,
        name: &str,
        data_url: &str,
        web_url: &str,
    ) -> anyhow::Result<ServerAdvertisement>;
}

/// Server whose namespaces come from local configuration
///
/// Namespace refresh is a no-op: the configured list is authoritative.
#[derive(Debug)]
pub struct ConfiguredServer {
    server_type: ServerType,
    namespaces: RwLock<Vec<NamespaceAd>>,
}

impl ConfiguredServer {
    pub fn new(server_type: ServerType, namespaces: Vec<NamespaceAd>) -> Self {
        Self {
            server_type,
            namespaces: RwLock::new(namespaces),
        }
    }

    /// Replace the namespace list used by future advertisements
    pub fn set_namespaces(&self, namespaces: Vec<NamespaceAd>) {
        *self.namespaces.write().unwrap_or_else(PoisonError::into_inner) = namespaces;
    }

    pub fn namespaces(&self) -> Vec<NamespaceAd> {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ManagedServer for ConfiguredServer {
    fn server_type(&self) -> ServerType {
        self.server_type
    }

    async fn refresh_namespace_ads(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn create_advertisement(
        &self,
        name: &str,
        data_url: &str,
        web_url: &str,
    ) -> anyhow::Result<ServerAdvertisement> {
        if data_url.is_empty() {
            anyhow::bail!("{} URL is not configured", self.server_type);
        }

        Ok(ServerAdvertisement {
            name: name.to_string(),
            server_type: self.server_type,
            data_url: data_url.to_string(),
            web_url: web_url.to_string(),
            namespaces: self.namespaces(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_path() {
        assert_eq!(
            ServerType::Origin.registration_path(),
            "/api/v1.0/director/registerOrigin"
        );
        assert_eq!(
            ServerType::Cache.registration_path(),
            "/api/v1.0/director/registerCache"
        );
    }

    #[test]
    fn test_user_agent() {
        assert_eq!(ServerType::Origin.user_agent("7.10.0"), "pelican-origin/7.10.0");
        assert_eq!(ServerType::Cache.user_agent("7.10.0"), "pelican-cache/7.10.0");
    }

    #[test]
    fn test_server_type_from_str() {
        assert_eq!("Origin".parse::<ServerType>().unwrap(), ServerType::Origin);
        assert_eq!("cache".parse::<ServerType>().unwrap(), ServerType::Cache);
        assert!("director".parse::<ServerType>().is_err());
    }

    #[test]
    fn test_advertisement_json() {
        let server = ConfiguredServer::new(
            ServerType::Origin,
            vec![NamespaceAd::new("/foo").with_caps(NamespaceCaps {
                public_reads: true,
                ..Default::default()
            })],
        );

        let ad = server
            .create_advertisement("origin-1", "https://origin:8443", "")
            .unwrap();
        let json = serde_json::to_value(&ad).unwrap();

        assert_eq!(json["name"], "origin-1");
        assert_eq!(json["type"], "Origin");
        assert_eq!(json["data-url"], "https://origin:8443");
        assert!(json.get("web-url").is_none());
        assert_eq!(json["namespaces"][0]["path"], "/foo");
        assert_eq!(json["namespaces"][0]["caps"]["PublicReads"], true);
    }

    #[test]
    fn test_advertisement_requires_data_url() {
        let server = ConfiguredServer::new(ServerType::Cache, vec![]);
        let err = server.create_advertisement("cache-1", "", "").unwrap_err();
        assert!(err.to_string().contains("Cache URL is not configured"));
    }

    #[test]
    fn test_set_namespaces_snapshot() {
        let server = ConfiguredServer::new(ServerType::Origin, vec![NamespaceAd::new("/a")]);
        let before = server.create_advertisement("o", "https://o", "").unwrap();

        server.set_namespaces(vec![NamespaceAd::new("/b")]);
        let after = server.create_advertisement("o", "https://o", "").unwrap();

        assert_eq!(before.namespaces[0].path, "/a");
        assert_eq!(after.namespaces[0].path, "/b");
    }
}

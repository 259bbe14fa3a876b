//! Advertisement tokens
//!
//! Every registration request carries a bearer token scoped to
//! advertisement. Tokens are fetched per attempt and never cached here.

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::server::ManagedServer;

/// Supplies the bearer token for one advertisement attempt
#[async_trait]
pub trait AdvertiseTokenProvider: Send + Sync {
    async fn advertisement_token(&self, server: &dyn ManagedServer) -> anyhow::Result<String>;
}

/// The same token for every server
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl AdvertiseTokenProvider for StaticToken {
    async fn advertisement_token(&self, _server: &dyn ManagedServer) -> anyhow::Result<String> {
        if self.0.is_empty() {
            anyhow::bail!("advertisement token is empty");
        }
        Ok(self.0.clone())
    }
}

/// Reads the token from a file on every attempt, so rotation on disk is
/// picked up without restarting
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AdvertiseTokenProvider for TokenFile {
    async fn advertisement_token(&self, server: &dyn ManagedServer) -> anyhow::Result<String> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read token file {}", self.path.display()))?;

        let token = contents.trim();
        if token.is_empty() {
            anyhow::bail!(
                "token file {} for {} is empty",
                self.path.display(),
                server.server_type()
            );
        }

        Ok(token.to_string())
    }
}

/// Pick the token source described by `config`: a token file wins over a
/// literal token. Returns `None` when neither is configured.
pub fn from_config(config: &Config) -> Option<Arc<dyn AdvertiseTokenProvider>> {
    if let Some(path) = &config.advertise.token_file {
        return Some(Arc::new(TokenFile::new(path.clone())));
    }

    config
        .advertise
        .token
        .as_ref()
        .map(|t| Arc::new(StaticToken::new(t.clone())) as Arc<dyn AdvertiseTokenProvider>)
}

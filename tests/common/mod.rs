//! Common test utilities: fixed collaborators and scripted servers

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pelican_advertise::advertise::Advertiser;
use pelican_advertise::config::{ConfigProvider, ServiceNameResolver};
use pelican_advertise::federation::{FederationInfo, StaticFederation};
use pelican_advertise::server::{ManagedServer, NamespaceAd, ServerAdvertisement, ServerType};
use pelican_advertise::token::StaticToken;

pub const TEST_VERSION: &str = "7.0.0-test";
pub const TEST_TOKEN: &str = "test-token";
pub const ORIGIN_URL: &str = "https://origin.example.org:8443";
pub const CACHE_URL: &str = "https://cache.example.org:8442";
pub const WEB_URL: &str = "https://web.example.org:8444";

/// Configuration with fixed URLs and version
pub struct FixedConfig;

impl ConfigProvider for FixedConfig {
    fn origin_url(&self) -> String {
        ORIGIN_URL.to_string()
    }

    fn cache_url(&self) -> String {
        CACHE_URL.to_string()
    }

    fn external_web_url(&self) -> String {
        WEB_URL.to_string()
    }

    fn version(&self) -> String {
        TEST_VERSION.to_string()
    }
}

/// Resolver that always returns the same name
pub struct FixedName(pub &'static str);

#[async_trait]
impl ServiceNameResolver for FixedName {
    async fn service_name(&self, _server_type: ServerType) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

/// Server whose namespace refresh can be scripted to fail
pub struct TestServer {
    server_type: ServerType,
    refresh_error: Option<&'static str>,
    refreshes: AtomicUsize,
}

impl TestServer {
    pub fn ok(server_type: ServerType) -> Arc<Self> {
        Arc::new(Self {
            server_type,
            refresh_error: None,
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn failing(server_type: ServerType, error: &'static str) -> Arc<Self> {
        Arc::new(Self {
            server_type,
            refresh_error: Some(error),
            refreshes: AtomicUsize::new(0),
        })
    }

    /// How many times an attempt reached this server
    pub fn attempts(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManagedServer for TestServer {
    fn server_type(&self) -> ServerType {
        self.server_type
    }

    async fn refresh_namespace_ads(&self) -> anyhow::Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        match self.refresh_error {
            Some(msg) => Err(anyhow::anyhow!(msg)),
            None => Ok(()),
        }
    }

    fn create_advertisement(
        &self,
        name: &str,
        data_url: &str,
        web_url: &str,
    ) -> anyhow::Result<ServerAdvertisement> {
        Ok(ServerAdvertisement {
            name: name.to_string(),
            server_type: self.server_type,
            data_url: data_url.to_string(),
            web_url: web_url.to_string(),
            namespaces: vec![NamespaceAd::new("/test")],
        })
    }
}

/// Resolver that counts calls and fails every one of them, optionally
/// running a hook first (used to observe state mid-pass)
pub struct FailingResolver {
    calls: AtomicUsize,
    hook: Mutex<Option<Box<dyn FnMut(usize) + Send>>>,
}

impl FailingResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            hook: Mutex::new(None),
        })
    }

    /// Run `hook` with the 1-based call number on every call
    pub fn with_hook(hook: impl FnMut(usize) + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            hook: Mutex::new(Some(Box::new(hook))),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceNameResolver for FailingResolver {
    async fn service_name(&self, _server_type: ServerType) -> anyhow::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = self.hook.lock().unwrap().as_mut() {
            hook(call);
        }
        Err(anyhow::anyhow!("resolver down"))
    }
}

/// Advertiser talking to `director_endpoint` with fixed collaborators
pub fn advertiser_for(director_endpoint: &str) -> Advertiser {
    Advertiser::builder()
        .config(Arc::new(FixedConfig))
        .service_names(Arc::new(FixedName("test-server")))
        .federation(Arc::new(StaticFederation::new(FederationInfo::with_director(
            director_endpoint,
        ))))
        .tokens(Arc::new(StaticToken::new(TEST_TOKEN)))
        .build()
        .unwrap()
}

/// Advertiser whose service-name step is handled by `resolver`
pub fn advertiser_with_resolver(resolver: Arc<dyn ServiceNameResolver>) -> Advertiser {
    Advertiser::builder()
        .config(Arc::new(FixedConfig))
        .service_names(resolver)
        .federation(Arc::new(StaticFederation::new(FederationInfo::with_director(
            "http://127.0.0.1:1",
        ))))
        .tokens(Arc::new(StaticToken::new(TEST_TOKEN)))
        .build()
        .unwrap()
}

pub fn as_managed(servers: &[Arc<TestServer>]) -> Vec<Arc<dyn ManagedServer>> {
    servers
        .iter()
        .map(|s| s.clone() as Arc<dyn ManagedServer>)
        .collect()
}

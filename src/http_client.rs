//! HTTP Client builder module
//!
//! One [`Client`] is built at startup from [`Config`] and shared by the
//! password-grant `POST` to the token endpoint and the bearer `GET` to the
//! profile endpoint. The config picks the TLS backend, an optional
//! http/https/socks5 proxy with basic auth, and the per-request timeout. A
//! request that hits the timeout fails like any other transport error, which
//! the login flow reports as an unreachable server.

use anyhow::Context;
use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::model::config::{Config, TlsBackend};

/// Proxy configuration
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Proxy URL, supports http/https/socks5
    pub url: String,
    /// Proxy authentication username
    pub username: Option<String>,
    /// Proxy authentication password
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Create proxy configuration from URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Proxy settings from config, if a proxy URL is set
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.proxy_url.as_deref().filter(|u| !u.trim().is_empty())?;
        let mut proxy = Self::new(url);
        if let (Some(username), Some(password)) = (&config.proxy_username, &config.proxy_password) {
            proxy = proxy.with_auth(username, password);
        }
        Some(proxy)
    }
}

/// Build HTTP Client
///
/// # Arguments
/// * `proxy` - Optional proxy configuration
/// * `timeout_secs` - Timeout in seconds
pub fn build_client(
    proxy: Option<&ProxyConfig>,
    timeout_secs: u64,
    tls_backend: TlsBackend,
) -> anyhow::Result<Client> {
    let mut builder = Client::builder().timeout(Duration::from_secs(timeout_secs));

    if tls_backend == TlsBackend::Rustls {
        builder = builder.use_rustls_tls();
    }

    if let Some(proxy_config) = proxy {
        let mut proxy = Proxy::all(&proxy_config.url)
            .with_context(|| format!("Invalid proxy URL: {}", proxy_config.url))?;

        if let (Some(username), Some(password)) = (&proxy_config.username, &proxy_config.password) {
            proxy = proxy.basic_auth(username, password);
        }

        builder = builder.proxy(proxy);
        tracing::debug!("HTTP Client using proxy: {}", proxy_config.url);
    }

    builder.build().context("Failed to build HTTP client")
}

/// Build the client described by the config
pub fn build_client_from_config(config: &Config) -> anyhow::Result<Client> {
    let proxy = ProxyConfig::from_config(config);
    build_client(proxy.as_ref(), config.request_timeout_secs, config.tls_backend)
}

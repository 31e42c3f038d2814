use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    #[default]
    Rustls,
    NativeTls,
}

/// Login client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend base URL, e.g. http://localhost:8000
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Password-grant token endpoint path
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Current-user profile endpoint path
    #[serde(default = "default_profile_path")]
    pub profile_path: String,

    /// Landing route used when the incoming request carries no redirect target
    #[serde(default = "default_redirect")]
    pub default_redirect: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub tls_backend: TlsBackend,

    /// HTTP proxy URL (optional)
    /// Supported formats: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Proxy authentication username (optional)
    #[serde(default)]
    pub proxy_username: Option<String>,

    /// Proxy authentication password (optional)
    #[serde(default)]
    pub proxy_password: Option<String>,

    /// Where the session token and role are persisted
    #[serde(default = "default_session_file")]
    pub session_file: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_token_path() -> String {
    "/auth/token".to_string()
}

fn default_profile_path() -> String {
    "/auth/me".to_string()
}

fn default_redirect() -> String {
    "/dashboard".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_session_file() -> String {
    "session.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_path: default_token_path(),
            profile_path: default_profile_path(),
            default_redirect: default_redirect(),
            request_timeout_secs: default_request_timeout_secs(),
            tls_backend: TlsBackend::default(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            session_file: default_session_file(),
        }
    }
}

impl Config {
    /// Get default config file path
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// Full URL of the token endpoint
    pub fn token_url(&self) -> String {
        join_url(&self.base_url, &self.token_path)
    }

    /// Full URL of the profile endpoint
    pub fn profile_url(&self) -> String {
        join_url(&self.base_url, &self.profile_path)
    }

    /// Load configuration from file
    ///
    /// A missing file yields the defaults; the login client never writes it.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

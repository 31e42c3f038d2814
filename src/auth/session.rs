//! Session persistence
//!
//! [`SessionStore`] is the key/value store the rest of the application reads
//! the session from. [`SessionMaterializer`] replaces its contents with a
//! freshly obtained token, then tries to resolve and record the user's role.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use reqwest::Client;

use super::error::{AuthError, ProfileError};
use super::types::{SessionState, UserProfile};

/// Session entry holding the bearer token
pub const TOKEN_KEY: &str = "token";
/// Session entry holding the role name
pub const ROLE_KEY: &str = "userRole";

/// String key/value session storage
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    /// Drop every entry
    fn clear(&self) -> anyhow::Result<()>;
}

/// Read the current session back, if a token is stored
pub fn read_session(store: &dyn SessionStore) -> Option<SessionState> {
    let token = store.get(TOKEN_KEY)?;
    Some(SessionState {
        token,
        user_role: store.get(ROLE_KEY),
    })
}

/// Store backed by a JSON object on disk
///
/// Every write rewrites the whole file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Open the store, loading existing entries
    ///
    /// - Missing or empty file: starts empty
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session file: {}", path.display()))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse session file: {}", path.display()))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(entries).context("Failed to serialize session")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;
        tracing::debug!("Wrote session file: {}", self.path.display());
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut entries = self.entries.lock();
        if entries.is_empty() && !self.path.exists() {
            return Ok(());
        }
        entries.clear();
        self.persist(&entries)
    }
}

/// Writes the session for a freshly issued token
pub struct SessionMaterializer {
    client: Client,
    profile_url: String,
    store: Arc<dyn SessionStore>,
}

impl SessionMaterializer {
    pub fn new(client: Client, profile_url: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            profile_url: profile_url.into(),
            store,
        }
    }

    /// Replace the stored session with `token`, then add the role if one can
    /// be resolved
    ///
    /// Only a failure to write the token is returned; anything that goes wrong
    /// with the role is logged and leaves the session without one.
    pub async fn materialize(&self, token: &str) -> Result<SessionState, AuthError> {
        self.store
            .clear()
            .and_then(|()| self.store.set(TOKEN_KEY, token))
            .map_err(|e| {
                tracing::error!("Failed to persist session token: {:#}", e);
                AuthError::Storage(e.to_string())
            })?;
        tracing::info!("Session token stored");

        let user_role = match self.fetch_role(token).await {
            Ok(role) => match self.store.set(ROLE_KEY, &role) {
                Ok(()) => {
                    tracing::info!("User role: {}", role);
                    Some(role)
                }
                Err(e) => {
                    tracing::warn!("Failed to persist user role: {:#}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Continuing without user role: {}", e);
                None
            }
        };

        Ok(SessionState {
            token: token.to_string(),
            user_role,
        })
    }

    async fn fetch_role(&self, token: &str) -> Result<String, ProfileError> {
        let response = self
            .client
            .get(&self.profile_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProfileError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfileError::Status(status.as_u16()));
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| ProfileError::Body(e.to_string()))?;

        profile
            .role_name()
            .map(|s| s.to_string())
            .ok_or(ProfileError::MissingRole)
    }
}

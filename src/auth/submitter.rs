//! Credential submitter
//!
//! Exchanges a username/password pair for a bearer token at the
//! password-grant token endpoint.

use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Client;

use super::error::AuthError;
use super::types::{Credentials, PasswordGrantForm, TokenResponse, rejection_message};

/// Clears the busy flag when dropped
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A token obtained by [`CredentialSubmitter::submit`]
///
/// The submitter stays busy until this is dropped, so a caller can keep
/// further submissions out while it finishes the login.
#[derive(Debug)]
pub struct Submission<'a> {
    pub token: TokenResponse,
    _busy: BusyGuard<'a>,
}

pub struct CredentialSubmitter {
    client: Client,
    token_url: String,
    busy: AtomicBool,
}

impl CredentialSubmitter {
    pub fn new(client: Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Mark a submission as in flight
    ///
    /// Returns `None` if one already is. The flag stays set until the
    /// returned guard is dropped.
    fn begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: &self.busy })
    }

    /// Exchange credentials for a token
    ///
    /// Fails with [`AuthError::Busy`] without sending anything while another
    /// submission is in flight. On error the busy flag is already cleared.
    pub async fn submit(&self, credentials: &Credentials) -> Result<Submission<'_>, AuthError> {
        let guard = self.begin().ok_or(AuthError::Busy)?;
        let token = self.exchange(credentials).await?;
        Ok(Submission { token, _busy: guard })
    }

    async fn exchange(&self, credentials: &Credentials) -> Result<TokenResponse, AuthError> {
        validate(credentials)?;

        tracing::debug!("POST {} for user {}", self.token_url, credentials.username);

        let response = self
            .client
            .post(&self.token_url)
            .form(&PasswordGrantForm::new(credentials))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Token endpoint unreachable: {}", e);
                AuthError::Unreachable
            })?;

        let status = response.status();
        tracing::debug!("Token endpoint responded {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = rejection_message(&body);
            tracing::info!("Credentials rejected ({}): {}", status, message);
            return Err(AuthError::Rejected(message));
        }

        let body = response.text().await.map_err(|e| {
            tracing::warn!("Failed to read token response body: {}", e);
            AuthError::Unreachable
        })?;

        serde_json::from_str::<TokenResponse>(&body).map_err(|e| {
            tracing::warn!("Token response is not a token: {}", e);
            AuthError::InvalidResponse(e.to_string())
        })
    }
}

fn validate(credentials: &Credentials) -> Result<(), AuthError> {
    if credentials.username.trim().is_empty() {
        return Err(AuthError::MissingField("username"));
    }
    if credentials.password.is_empty() {
        return Err(AuthError::MissingField("password"));
    }
    Ok(())
}

//! Login flow state machine
//!
//! ```text
//! Idle -> Submitting -> Rejected | Unreachable      (user may retry)
//! Idle -> Submitting -> TokenAcquired -> SessionReady -> Redirecting -> Done
//! ```
//!
//! One submission runs at a time. `Done` is terminal: later submissions are
//! ignored. [`LoginFlow::teardown`] abandons a token request still in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::Notify;

use crate::model::config::Config;

use super::error::AuthError;
use super::redirect::{Navigator, RedirectIntent};
use super::session::{SessionMaterializer, SessionStore};
use super::submitter::CredentialSubmitter;
use super::types::{Credentials, SessionState};

type LoginListener = Box<dyn Fn(&SessionState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Submitting,
    Rejected,
    Unreachable,
    TokenAcquired,
    SessionReady,
    Redirecting,
    Done,
}

/// Result of a submission that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Session stored and navigation triggered
    Redirected(String),
    /// Nothing was sent: a submission was in flight, the flow is done or was torn down
    Ignored,
}

struct FormState {
    state: FlowState,
    form: Credentials,
    error: Option<String>,
}

pub struct LoginFlow {
    submitter: CredentialSubmitter,
    materializer: SessionMaterializer,
    intent: RedirectIntent,
    navigator: Arc<dyn Navigator>,
    listener: Option<LoginListener>,
    server: String,
    inner: Mutex<FormState>,
    torn_down: AtomicBool,
    cancel: Notify,
}

impl LoginFlow {
    /// Create a flow for a login page entered with `query`
    pub fn new(
        config: &Config,
        client: Client,
        store: Arc<dyn SessionStore>,
        query: &str,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let intent = RedirectIntent::from_query(query, &config.default_redirect);
        tracing::debug!("Redirect intent: {:?}", intent);

        Self {
            submitter: CredentialSubmitter::new(client.clone(), config.token_url()),
            materializer: SessionMaterializer::new(client, config.profile_url(), store),
            intent,
            navigator,
            listener: None,
            server: config.base_url.clone(),
            inner: Mutex::new(FormState {
                state: FlowState::Idle,
                form: Credentials::default(),
                error: None,
            }),
            torn_down: AtomicBool::new(false),
            cancel: Notify::new(),
        }
    }

    /// Called with the new session before navigation
    pub fn with_login_listener(
        mut self,
        listener: impl Fn(&SessionState) + Send + Sync + 'static,
    ) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn set_username(&self, username: impl Into<String>) {
        self.inner.lock().form.username = username.into();
    }

    pub fn set_password(&self, password: impl Into<String>) {
        self.inner.lock().form.password = password.into();
    }

    pub fn username(&self) -> String {
        self.inner.lock().form.username.clone()
    }

    #[cfg(test)]
    pub fn has_password(&self) -> bool {
        !self.inner.lock().form.password.is_empty()
    }

    pub fn state(&self) -> FlowState {
        self.inner.lock().state
    }

    /// Message to show the user after a failed attempt
    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.submitter.is_busy()
    }

    pub fn intent(&self) -> &RedirectIntent {
        &self.intent
    }

    /// Stop acting on responses that arrive from now on
    ///
    /// A pending token request is dropped; once the token is in hand the
    /// session is still written but navigation is skipped.
    pub fn teardown(&self) {
        self.torn_down.store(true, Ordering::Release);
        self.cancel.notify_waiters();
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Resolves once the flow is torn down
    async fn cancelled(&self) {
        let notified = self.cancel.notified();
        if self.is_torn_down() {
            return;
        }
        notified.await;
    }

    fn transition(&self, next: FlowState) {
        let mut inner = self.inner.lock();
        tracing::debug!("Login flow: {:?} -> {:?}", inner.state, next);
        inner.state = next;
    }

    /// Run the handshake with the current form values
    pub async fn submit(&self) -> Result<SubmitOutcome, AuthError> {
        if self.is_torn_down() || self.state() == FlowState::Done {
            return Ok(SubmitOutcome::Ignored);
        }

        if self.is_busy() {
            tracing::debug!("Login already in flight, ignoring submission");
            return Ok(SubmitOutcome::Ignored);
        }

        let credentials = {
            let mut inner = self.inner.lock();
            inner.error = None;
            inner.form.clone()
        };

        self.transition(FlowState::Submitting);
        tracing::info!("Logging in as {}", credentials.username);

        // Holds the busy flag until this call returns
        let submission = tokio::select! {
            result = self.submitter.submit(&credentials) => match result {
                Ok(submission) => submission,
                Err(AuthError::Busy) => {
                    tracing::debug!("Login already in flight, ignoring submission");
                    return Ok(SubmitOutcome::Ignored);
                }
                Err(e) => return Err(self.fail(e)),
            },
            () = self.cancelled() => {
                tracing::info!("Login flow torn down, abandoning token request");
                return Ok(SubmitOutcome::Ignored);
            }
        };
        if self.is_torn_down() {
            tracing::info!("Login flow torn down, discarding token");
            return Ok(SubmitOutcome::Ignored);
        }
        self.transition(FlowState::TokenAcquired);

        let session = match self.materializer.materialize(&submission.token.access_token).await {
            Ok(session) => session,
            Err(e) => return Err(self.fail(e)),
        };
        self.transition(FlowState::SessionReady);

        if let Some(listener) = &self.listener {
            listener(&session);
        }

        if self.is_torn_down() {
            tracing::info!("Login flow torn down, skipping navigation");
            return Ok(SubmitOutcome::Ignored);
        }

        let destination = self.intent.resolve();
        self.transition(FlowState::Redirecting);
        tracing::info!("Login succeeded, navigating to {}", destination);
        self.navigator.navigate(&destination);

        {
            let mut inner = self.inner.lock();
            inner.form.password.clear();
            inner.state = FlowState::Done;
        }

        Ok(SubmitOutcome::Redirected(destination))
    }

    /// Record a failed attempt and hand the error back
    ///
    /// The username is kept and the password cleared, except for a missing
    /// field where nothing was sent.
    fn fail(&self, error: AuthError) -> AuthError {
        let message = error.user_message(&self.server);
        let mut inner = self.inner.lock();

        inner.state = match &error {
            AuthError::MissingField(_) => FlowState::Idle,
            AuthError::Unreachable => FlowState::Unreachable,
            _ => FlowState::Rejected,
        };
        if !matches!(error, AuthError::MissingField(_)) {
            inner.form.password.clear();
        }
        inner.error = Some(message);

        error
    }
}

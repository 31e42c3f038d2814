//! In-process token/profile endpoints for tests
//!
//! Token endpoint behaviour by username:
//! - `alice`: password `secret` succeeds, anything else is a 401 with a JSON detail
//! - `plain`: 401 with a non-JSON body
//! - `garbled`: 200 with a non-JSON body
//! - `slow`: held until [`MockBackend::release`] is called, then succeeds
//! - anyone else: succeeds with token `tok-<username>`
//!
//! Profile endpoint behaviour by token: `tok-alice` is an Admin, `tok-norole`
//! has a null role, `tok-emptyrole` has an empty role name, `tok-broken` gets
//! a 500, anything else is an Agent.
//!
//! Also provides session stores for exercising the flow without a file.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Notify;

use super::session::SessionStore;

/// Process-local store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Store whose writes always fail
pub struct ReadOnlyStore;

impl SessionStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
        anyhow::bail!("session storage is read-only")
    }

    fn clear(&self) -> anyhow::Result<()> {
        anyhow::bail!("session storage is read-only")
    }
}

#[derive(Default)]
struct MockState {
    token_calls: AtomicUsize,
    profile_calls: AtomicUsize,
    last_token_form: Mutex<Option<HashMap<String, String>>>,
    last_authorization: Mutex<Option<String>>,
    gate: Notify,
}

pub struct MockBackend {
    base_url: String,
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/auth/token", post(handle_token))
            .route("/auth/me", get(handle_me))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_url(&self) -> String {
        format!("{}/auth/token", self.base_url)
    }

    pub fn profile_url(&self) -> String {
        format!("{}/auth/me", self.base_url)
    }

    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.state.profile_calls.load(Ordering::SeqCst)
    }

    pub fn last_token_form(&self) -> Option<HashMap<String, String>> {
        self.state.last_token_form.lock().clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().clone()
    }

    /// Let a held `slow` token request complete
    pub fn release(&self) {
        self.state.gate.notify_one();
    }

    /// Wait until the token endpoint has received `n` requests
    pub async fn wait_for_token_calls(&self, n: usize) {
        for _ in 0..500 {
            if self.token_calls() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("token endpoint never reached {} calls", n);
    }
}

/// Base URL on which nothing is listening
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn handle_token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_token_form.lock() = Some(form.clone());

    let username = form.get("username").cloned().unwrap_or_default();
    let password = form.get("password").cloned().unwrap_or_default();

    match username.as_str() {
        "alice" if password != "secret" => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "bad credentials"})),
        )
            .into_response(),
        "plain" => (StatusCode::UNAUTHORIZED, "nope").into_response(),
        "garbled" => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            "not json",
        )
            .into_response(),
        "slow" => {
            state.gate.notified().await;
            token_json("slow")
        }
        other => token_json(other),
    }
}

fn token_json(username: &str) -> Response {
    Json(json!({
        "access_token": format!("tok-{}", username),
        "token_type": "bearer"
    }))
    .into_response()
}

async fn handle_me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.profile_calls.fetch_add(1, Ordering::SeqCst);

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    *state.last_authorization.lock() = authorization.clone();

    let token = match authorization.as_deref().and_then(|v| v.strip_prefix("Bearer ")) {
        Some(t) => t.to_string(),
        None => return StatusCode::UNAUTHORIZED.into_response(),
    };

    match token.as_str() {
        "tok-alice" => Json(json!({
            "id": 1,
            "username": "alice",
            "role": {"id": 1, "name": "Admin"}
        }))
        .into_response(),
        "tok-norole" => Json(json!({"id": 2, "username": "norole", "role": null})).into_response(),
        "tok-emptyrole" => Json(json!({"id": 3, "role": {"id": 3, "name": ""}})).into_response(),
        "tok-broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => Json(json!({"id": 9, "role": {"id": 2, "name": "Agent"}})).into_response(),
    }
}

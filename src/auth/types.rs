//! Login flow data types

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generic rejection message when the server gives no usable detail
pub const DEFAULT_REJECTION_MESSAGE: &str = "Invalid credentials";

/// Username/password pair entered by the user
///
/// Never persisted
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[cfg(test)]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Password-grant form body for the token endpoint
#[derive(Debug, Serialize)]
pub struct PasswordGrantForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub grant_type: &'static str,
    pub scope: &'static str,
}

impl<'a> PasswordGrantForm<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self {
            username: &credentials.username,
            password: &credentials.password,
            grant_type: "password",
            scope: "",
        }
    }
}

/// Token endpoint success body
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Opaque bearer credential
    pub access_token: String,
}

/// Token endpoint failure body
#[derive(Debug, Deserialize)]
pub struct ErrorDetailResponse {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorDetailResponse {
    /// User-facing message carried by `detail`, if any
    ///
    /// `detail` is either a plain string or a list of validation errors
    /// shaped like `{"msg": "..."}`.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Array(items) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .filter(|m| !m.is_empty())
                    .collect();
                if msgs.is_empty() {
                    None
                } else {
                    Some(msgs.join("; "))
                }
            }
            _ => None,
        }
    }
}

/// Message to show for a non-success token response body
pub fn rejection_message(body: &str) -> String {
    serde_json::from_str::<ErrorDetailResponse>(body)
        .ok()
        .and_then(|r| r.message())
        .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub name: Option<String>,
}

/// Profile endpoint body; only the role is of interest here
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub role: Option<Role>,
}

impl UserProfile {
    /// Non-empty role name, if the profile carries one
    pub fn role_name(&self) -> Option<&str> {
        self.role
            .as_ref()
            .and_then(|r| r.name.as_deref())
            .filter(|n| !n.is_empty())
    }
}

/// What a successful login leaves in the session store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub token: String,
    pub user_role: Option<String>,
}

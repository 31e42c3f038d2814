//! Login error types

use std::fmt;

/// Errors that end a submission attempt
///
/// None of them is fatal: the user can always retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Username or password left empty
    MissingField(&'static str),

    /// A submission is already in flight
    Busy,

    /// Server explicitly rejected the credentials
    Rejected(String),

    /// Transport-level failure (connection refused, DNS, timeout)
    Unreachable,

    /// Server answered with success but the body was not a token
    InvalidResponse(String),

    /// Token could not be written to the session store
    Storage(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingField(field) => write!(f, "Missing required field: {}", field),
            AuthError::Busy => write!(f, "A login attempt is already in progress"),
            AuthError::Rejected(msg) => write!(f, "Credentials rejected: {}", msg),
            AuthError::Unreachable => write!(f, "Server unreachable"),
            AuthError::InvalidResponse(msg) => write!(f, "Invalid token response: {}", msg),
            AuthError::Storage(msg) => write!(f, "Session storage error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    /// Message shown to the user
    ///
    /// `server` is the backend base URL, mentioned when it cannot be reached.
    pub fn user_message(&self, server: &str) -> String {
        match self {
            AuthError::MissingField("username") => "Username is required".to_string(),
            AuthError::MissingField("password") => "Password is required".to_string(),
            AuthError::MissingField(field) => format!("{} is required", field),
            AuthError::Busy => "Login already in progress".to_string(),
            AuthError::Rejected(msg) => msg.clone(),
            AuthError::Unreachable => format!(
                "Unable to reach the server. Check that the backend is running at {}",
                server
            ),
            AuthError::InvalidResponse(_) => "Unexpected response from the server".to_string(),
            AuthError::Storage(_) => "Unable to save the session".to_string(),
        }
    }
}

/// Why the role lookup produced nothing; logged only
#[derive(Debug)]
pub enum ProfileError {
    Transport(String),
    Status(u16),
    Body(String),
    MissingRole,
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::Transport(msg) => write!(f, "profile request failed: {}", msg),
            ProfileError::Status(status) => write!(f, "profile endpoint returned {}", status),
            ProfileError::Body(msg) => write!(f, "profile body unreadable: {}", msg),
            ProfileError::MissingRole => write!(f, "profile has no role name"),
        }
    }
}

impl std::error::Error for ProfileError {}

//! Password-grant login handshake
//!
//! Exchanges credentials for a bearer token, stores the session (token and,
//! when available, the user's role) and resumes navigation where the user
//! was headed before being sent to login.

pub mod error;
pub mod flow;
pub mod redirect;
pub mod session;
pub mod submitter;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use error::AuthError;
pub use flow::{LoginFlow, SubmitOutcome};
pub use redirect::Navigator;
pub use session::FileSessionStore;

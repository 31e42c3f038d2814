//! Post-login redirect resolution
//!
//! The login page is reached with a query such as
//! `?redirect=/tickets&ticket=42&action=view`. After login the user resumes at
//! `redirect`, carrying over `ticket` and `action` when they were given.

use std::collections::HashMap;

/// Incoming parameter naming the destination
pub const REDIRECT_PARAM: &str = "redirect";

/// Parameters carried over to the destination, in output order
pub const PRESERVED_PARAMS: [&str; 2] = ["ticket", "action"];

/// Parse a query string into a map
///
/// Accepts an optional leading `?`. `+` decodes to a space and percent
/// escapes are decoded; the first occurrence of a key wins.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut params = HashMap::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        params.entry(key).or_insert_with(|| decode_component(value));
    }

    params
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    match urlencoding::decode(&s) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s,
    }
}

/// Where to go after login, captured when the login page is entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectIntent {
    destination: String,
    preserved: Vec<(&'static str, String)>,
}

impl RedirectIntent {
    /// Capture the intent from incoming parameters
    ///
    /// Empty values count as absent.
    pub fn from_params(params: &HashMap<String, String>, default_destination: &str) -> Self {
        let destination = params
            .get(REDIRECT_PARAM)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| default_destination.to_string());

        let preserved = PRESERVED_PARAMS
            .iter()
            .filter_map(|&name| {
                params
                    .get(name)
                    .filter(|v| !v.is_empty())
                    .map(|v| (name, v.clone()))
            })
            .collect();

        Self {
            destination,
            preserved,
        }
    }

    pub fn from_query(query: &str, default_destination: &str) -> Self {
        Self::from_params(&parse_query(query), default_destination)
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Destination URL with the preserved parameters appended
    pub fn resolve(&self) -> String {
        resolve(&self.destination, &self.preserved)
    }
}

/// Build `base?k=v&...` from the given params, or `base` when there are none
///
/// A destination that already has a query gets the params appended to it.
pub fn resolve(base_destination: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return base_destination.to_string();
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if !base_destination.contains('?') {
        "?"
    } else if base_destination.ends_with(['?', '&']) {
        ""
    } else {
        "&"
    };

    format!("{}{}{}", base_destination, separator, query)
}

/// Performs the route change once the session is ready
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: &str);
}

//! Origin validation for WebSocket upgrades
//!
//! An origin is admitted when either of two independent predicates holds:
//! - it contains one of the configured development substrings (e.g. `localhost`)
//! - it equals, ignoring ASCII case, one of the configured allowed origins

use crate::config::ServerOptions;

/// Decides whether an upgrade request with a given `Origin` header may proceed
#[derive(Debug, Clone, Default)]
pub struct OriginValidator {
    allowed_origins: Vec<String>,
    dev_substrings: Vec<String>,
}

impl OriginValidator {
    /// Create a validator from an exact allow-list and a list of development substrings
    pub fn new(allowed_origins: Vec<String>, dev_substrings: Vec<String>) -> Self {
        Self {
            allowed_origins,
            dev_substrings,
        }
    }

    /// Create a validator from the server options
    pub fn from_options(options: &ServerOptions) -> Self {
        Self::new(options.allowed_origins.clone(), options.dev_origin_substrings.clone())
    }

    /// Returns true if the origin is admitted. The empty origin never is.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return false;
        }
        self.matches_dev_substring(origin) || self.matches_allow_list(origin)
    }

    /// Upgrade-time gate: evaluates the origin header and logs the decision.
    ///
    /// A missing header is treated as the empty origin.
    pub fn check(&self, origin: Option<&str>, path: &str) -> bool {
        let origin = origin.unwrap_or("");
        let allowed = self.origin_allowed(origin);
        if allowed {
            tracing::info!("allowed cross-origin websocket: Origin={:?}", origin);
        } else {
            tracing::warn!("blocked cross-origin websocket: Origin={:?} Path={}", origin, path);
        }
        allowed
    }

    fn matches_dev_substring(&self, origin: &str) -> bool {
        self.dev_substrings
            .iter()
            .any(|s| !s.is_empty() && origin.contains(s.as_str()))
    }

    fn matches_allow_list(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|a| a.eq_ignore_ascii_case(origin))
    }
}

//! Shared HTTP client for remote sources.
//!
//! One [`reqwest::Client`] is built per federation and cloned into every
//! [`HttpSource`](crate::sources::HttpSource), so connection pools are shared.

use std::time::Duration;

use crate::config::FederationConfig;
use crate::error::SearchError;

/// User-Agent sent when the config does not override it.
pub const DEFAULT_USER_AGENT: &str = concat!("osfed-search/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for querying remote sources.
///
/// The client has:
/// - Request timeout equal to the per-source deadline
/// - The configured User-Agent (or [`DEFAULT_USER_AGENT`])
/// - Brotli and gzip decompression
/// - At most 10 redirects
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &FederationConfig) -> Result<reqwest::Client, SearchError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.source_timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

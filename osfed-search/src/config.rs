//! Federation configuration with sensible defaults.
//!
//! [`FederationConfig`] controls page defaults, per-round batch sizes,
//! per-source deadlines and the cursor store. The defaults keep one request
//! bounded while still letting sequential page requests reuse cursor state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SearchError;

/// Configuration for the federated pagination engine.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Page size used when a request carries no parseable `count`.
    pub default_count: usize,
    /// Upper bound on items requested from a single source in one round.
    pub max_batch_size: usize,
    /// Fixed per-round batch size when probing a source with no known total.
    pub probe_batch_size: usize,
    /// Deadline for one source query, in seconds.
    pub source_timeout_seconds: u64,
    /// How long cached cursors stay reusable, in seconds.
    pub cursor_ttl_seconds: u64,
    /// Maximum number of source-set buckets held by the cursor store.
    pub max_cursor_buckets: u64,
    /// Maximum cursor entries kept per source-set bucket.
    pub max_cursors_per_bucket: usize,
    /// Hard cap on fetch rounds for a single request.
    pub max_rounds: usize,
    /// Custom User-Agent for remote sources. `None` uses the crate default.
    pub user_agent: Option<String>,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            default_count: 20,
            max_batch_size: 100,
            probe_batch_size: 20,
            source_timeout_seconds: 30,
            cursor_ttl_seconds: 15 * 60,
            max_cursor_buckets: 1024,
            max_cursors_per_bucket: 64,
            max_rounds: 10_000,
            user_agent: None,
        }
    }
}

impl FederationConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Every size, deadline and capacity must be greater than 0.
    pub fn validate(&self) -> Result<(), SearchError> {
        let checks: [(&str, bool); 8] = [
            ("default_count", self.default_count == 0),
            ("max_batch_size", self.max_batch_size == 0),
            ("probe_batch_size", self.probe_batch_size == 0),
            ("source_timeout_seconds", self.source_timeout_seconds == 0),
            ("cursor_ttl_seconds", self.cursor_ttl_seconds == 0),
            ("max_cursor_buckets", self.max_cursor_buckets == 0),
            ("max_cursors_per_bucket", self.max_cursors_per_bucket == 0),
            ("max_rounds", self.max_rounds == 0),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, invalid)| *invalid) {
            return Err(SearchError::Config(format!(
                "{field} must be greater than 0"
            )));
        }
        Ok(())
    }

    /// Per-source query deadline.
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }

    /// Cursor time-to-live.
    pub fn cursor_ttl(&self) -> Duration {
        Duration::from_secs(self.cursor_ttl_seconds)
    }
}

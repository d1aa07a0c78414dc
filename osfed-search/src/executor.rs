//! Single-source query execution with a deadline, and concurrent fan-out.
//!
//! A failing or slow source never aborts a round: its error is turned into
//! a [`SourceFailure`] and the round continues with the other sources.

use std::time::Duration;

use crate::config::FederationConfig;
use crate::error::SearchError;
use crate::source::{SharedSource, Source, SourceRequest};
use crate::types::{ResultBatch, SourceFailure};

/// Outcome of one source query.
pub type QueryOutcome = Result<ResultBatch, SourceFailure>;

/// Runs source queries under a per-source deadline.
#[derive(Debug, Clone, Copy)]
pub struct SourceQueryExecutor {
    timeout: Duration,
}

impl SourceQueryExecutor {
    /// Executor giving every source `timeout` to answer.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Executor using the configured source deadline.
    pub fn from_config(config: &FederationConfig) -> Self {
        Self::new(config.source_timeout())
    }

    /// Per-source deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query one source.
    ///
    /// Errors and deadline expiry are returned as a [`SourceFailure`]
    /// carrying the source identity and a help link: the error's own when
    /// it has one, else the source's.
    pub async fn execute(&self, source: &dyn Source, request: &SourceRequest) -> QueryOutcome {
        let identity = source.identity();
        tracing::trace!(
            source = %identity,
            start_index = request.start_index,
            count = request.count,
            params = %request.params.to_query_string(),
            "querying source"
        );

        let result = match tokio::time::timeout(self.timeout, source.query(request)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(format!(
                "{identity} did not answer within {}s",
                self.timeout.as_secs_f64()
            ))),
        };

        match result {
            Ok(batch) => {
                tracing::debug!(
                    source = %identity,
                    start_index = request.start_index,
                    requested = request.count,
                    returned = batch.items.len(),
                    total = ?batch.total_results,
                    "source answered"
                );
                Ok(batch)
            }
            Err(err) => {
                tracing::warn!(source = %identity, error = %err, "source query failed");
                let help_link = err
                    .help_link()
                    .or_else(|| source.help_link())
                    .map(str::to_owned);
                Err(SourceFailure {
                    source: identity.to_owned(),
                    message: err.to_string(),
                    help_link,
                })
            }
        }
    }

    /// Query several sources concurrently and wait for all of them.
    ///
    /// Outcomes are returned in the order of `requests`.
    pub async fn fan_out(&self, requests: &[(SharedSource, SourceRequest)]) -> Vec<QueryOutcome> {
        let futures: Vec<_> = requests
            .iter()
            .map(|(source, request)| self.execute(source.as_ref(), request))
            .collect();
        futures::future::join_all(futures).await
    }
}

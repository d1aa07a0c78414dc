//! Trait definition for queryable sources.
//!
//! Every endpoint taking part in a federated request implements
//! [`Source`]: a stable identity, what it knows about its own size, the
//! index its items start at, and a query operation for one window.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SearchError;
use crate::params::{QueryParameters, COUNT, START_INDEX, START_PAGE};
use crate::types::{ResultBatch, SourceExtent};

/// A window of one source, expressed in the source's own index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    /// Source-native index of the first item to return.
    pub start_index: u64,
    /// Number of items to return.
    pub count: usize,
    /// Free parameters plus the resolved `count` and `startIndex`.
    pub params: QueryParameters,
}

impl SourceRequest {
    /// Build a request for `count` items from `start_index`, carrying the
    /// free parameters of `params`.
    pub fn new(params: &QueryParameters, start_index: u64, count: usize) -> Self {
        let mut resolved = params.without_pagination();
        resolved.set(COUNT, count.to_string());
        resolved.set(START_INDEX, start_index.to_string());
        resolved.set(START_PAGE, "1");
        Self {
            start_index,
            count,
            params: resolved,
        }
    }
}

/// A queryable source of result items.
///
/// Sources are shared read-only between concurrent requests, so
/// implementations must be `Send + Sync` and must not rely on per-request
/// mutation.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable identity used for cursor-cache keys and equality.
    fn identity(&self) -> &str;

    /// What the source declares about its size.
    fn extent(&self) -> SourceExtent;

    /// Index of the source's first item (OpenSearch `indexOffset`).
    fn index_offset(&self) -> u64 {
        1
    }

    /// Help link copied into failure annotations for this source.
    fn help_link(&self) -> Option<&str> {
        None
    }

    /// Fetch one window of items.
    ///
    /// Items must come back in the order the federation sorts by; the
    /// merge relies on it.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport or format failures. The
    /// federation turns these into per-source annotations.
    async fn query(&self, request: &SourceRequest) -> Result<ResultBatch, SearchError>;
}

/// Shared handle on a source.
pub type SharedSource = Arc<dyn Source>;

impl fmt::Debug for dyn Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("identity", &self.identity())
            .field("extent", &self.extent())
            .finish()
    }
}

//! # osfed-search
//!
//! Federated pagination for OpenSearch-style sources.
//!
//! Given several independently paginated sources, each with its own item
//! count and index offset, this crate serves one merged, sorted result set
//! through the usual `count` / `startPage` / `startIndex` contract.
//!
//! ## Design
//!
//! - Sources implement [`Source`]; in-memory, file-backed and HTTP
//!   (URL-template) sources are provided in [`sources`]
//! - Every round queries all sources concurrently, each under a deadline
//! - Batches are merged under a total order and deduplicated by identifier;
//!   a source's cursor only advances by the items the page consumed
//! - Cursor state is cached per source set and free-parameter signature in
//!   a TTL store, so sequential pages resume instead of re-reading sources
//! - Graceful degradation: a failing source is reported on the page, the
//!   others still answer
//!
//! ## Logging
//!
//! Free query parameters (user search terms) are only logged at trace level.

pub mod config;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod http;
pub mod orchestrator;
pub mod params;
pub mod source;
pub mod sources;
pub mod types;
pub mod window;

use std::sync::Arc;

pub use config::FederationConfig;
pub use cursor::{CursorState, CursorStore, MokaCursorStore, SourceCursor, SourceSetKey};
pub use error::{Result, SearchError};
pub use executor::SourceQueryExecutor;
pub use orchestrator::compare::{ItemComparer, SortCriterion, SortDirection, SortField};
pub use orchestrator::controller::{FederatedSearch, Variant};
pub use orchestrator::merge::MultiSourceMerger;
pub use params::{ParamSignature, QueryParameters};
pub use source::{SharedSource, Source, SourceRequest};
pub use types::{Item, MergedItem, MergedPage, ResultBatch, SourceExtent, SourceFailure};
pub use window::PaginationWindow;

/// Build one merged page without keeping cursor state between calls.
///
/// Hosts serving more than one request should construct a
/// [`FederatedSearch`] once and reuse it, so that sequential pages resume
/// from cached cursors.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid, `sources` is
/// empty, or two sources share an identity. Individual source failures are
/// reported in [`MergedPage::failures`] instead.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> osfed_search::Result<()> {
/// use std::sync::Arc;
/// use osfed_search::sources::MemorySource;
/// use osfed_search::{FederationConfig, Item, QueryParameters, SharedSource};
///
/// let sources: Vec<SharedSource> = vec![
///     Arc::new(MemorySource::new("a", vec![Item::new("a1", "Sea ice")])),
///     Arc::new(MemorySource::new("b", vec![Item::new("b1", "Glaciers")])),
/// ];
/// let params = QueryParameters::from_query_string("count=10&startPage=1");
/// let page = osfed_search::get_page(&sources, &params, &FederationConfig::default()).await?;
/// for merged in &page.items {
///     println!("{}: {}", merged.source, merged.item.title);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn get_page(
    sources: &[SharedSource],
    params: &QueryParameters,
    config: &FederationConfig,
) -> Result<MergedPage> {
    config.validate()?;
    let store = Arc::new(MokaCursorStore::from_config(config));
    FederatedSearch::new(config.clone(), store)?
        .page(sources, params, None)
        .await
}

//! In-process source over a list of items.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::SearchError;
use crate::orchestrator::compare::ItemComparer;
use crate::params::SEARCH_TERMS;
use crate::source::{Source, SourceRequest};
use crate::types::{Item, ResultBatch, SourceExtent};

/// A source serving windows of an in-memory item list.
///
/// Items are served in the order given; use [`MemorySource::sorted_by`]
/// when they are not already in merge order. A `searchTerms` parameter
/// keeps only items whose title contains the terms (case-insensitive).
#[derive(Debug)]
pub struct MemorySource {
    identity: String,
    items: Vec<Item>,
    index_offset: u64,
    unbounded: bool,
    max_page_size: Option<usize>,
    queries: AtomicUsize,
}

impl MemorySource {
    /// Bounded source with 1-based indices.
    pub fn new(identity: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            identity: identity.into(),
            items,
            index_offset: 1,
            unbounded: false,
            max_page_size: None,
            queries: AtomicUsize::new(0),
        }
    }

    /// Builder: first index of the source (OpenSearch `indexOffset`).
    pub fn with_index_offset(mut self, index_offset: u64) -> Self {
        self.index_offset = index_offset;
        self
    }

    /// Builder: declare no total and report none in batches.
    pub fn unbounded(mut self) -> Self {
        self.unbounded = true;
        self
    }

    /// Builder: never return more than `max` items per query, like servers
    /// that cap `count`.
    pub fn with_max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = Some(max);
        self
    }

    /// Builder: sort the items with `comparer`.
    pub fn sorted_by(mut self, comparer: &ItemComparer) -> Self {
        self.items.sort_by(|a, b| comparer.compare(a, b));
        self
    }

    /// Number of queries answered so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the source holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn matching<'a>(&'a self, terms: Option<&str>) -> Vec<&'a Item> {
        match terms.map(str::trim).filter(|t| !t.is_empty()) {
            Some(terms) => {
                let needle = terms.to_lowercase();
                self.items
                    .iter()
                    .filter(|item| item.title.to_lowercase().contains(&needle))
                    .collect()
            }
            None => self.items.iter().collect(),
        }
    }
}

#[async_trait]
impl Source for MemorySource {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn extent(&self) -> SourceExtent {
        if self.unbounded {
            SourceExtent::Unbounded
        } else {
            SourceExtent::Bounded(self.items.len() as u64)
        }
    }

    fn index_offset(&self) -> u64 {
        self.index_offset
    }

    async fn query(&self, request: &SourceRequest) -> Result<ResultBatch, SearchError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let matching = self.matching(request.params.get(SEARCH_TERMS));
        let skip = usize::try_from(request.start_index.saturating_sub(self.index_offset))
            .unwrap_or(usize::MAX);
        let take = self
            .max_page_size
            .map_or(request.count, |max| request.count.min(max));
        let items = matching.iter().skip(skip).take(take).map(|i| (*i).clone()).collect();
        let total = (!self.unbounded).then_some(matching.len() as u64);
        Ok(ResultBatch::new(items, total))
    }
}

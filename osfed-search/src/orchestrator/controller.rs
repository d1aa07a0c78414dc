//! Federated pagination controller.
//!
//! Drives the round loop for one request: resume from the closest cached
//! cursor, seek to the start of page 1, then materialise pages one at a
//! time until the requested page is assembled. Every round fans out to the
//! sources concurrently, merges the batches, advances each source's cursor
//! by its consumed count and stores the new cursor state.
//!
//! Two variants share the loop. The fixed multi-source variant sizes each
//! round by the number of items still wanted and reports the sum of the
//! sources' totals. The unbounded variant serves a single source of unknown
//! size, probes it with a fixed batch size and reports an incremental total.

use std::collections::HashSet;
use std::slice;
use std::sync::Arc;
use std::time::Instant;

use crate::config::FederationConfig;
use crate::cursor::{CursorState, CursorStore, MokaCursorStore, SourceCursor, SourceSetKey};
use crate::error::SearchError;
use crate::executor::SourceQueryExecutor;
use crate::params::{ParamSignature, QueryParameters};
use crate::source::{SharedSource, SourceRequest};
use crate::types::{MergedPage, SourceExtent, SourceFailure};
use crate::window::PaginationWindow;

use super::compare::ItemComparer;
use super::merge::{Candidate, MergeOutcome, MultiSourceMerger, RoundBatch};

/// Which flavour of the round loop serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Any number of sources with declared or reported totals.
    Fixed,
    /// One source whose size is unknown in advance.
    Unbounded,
}

impl Variant {
    fn batch_size(self, need: u64, config: &FederationConfig) -> usize {
        match self {
            Self::Fixed => usize::try_from(need)
                .unwrap_or(usize::MAX)
                .min(config.max_batch_size),
            Self::Unbounded => config.probe_batch_size,
        }
    }
}

/// Builds merged pages over sets of sources.
///
/// One instance is shared by all requests of a host; the cursor store is
/// the only state shared between requests.
pub struct FederatedSearch {
    config: FederationConfig,
    store: Arc<dyn CursorStore>,
    executor: SourceQueryExecutor,
}

impl std::fmt::Debug for FederatedSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedSearch")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Per-request bookkeeping.
struct Run<'a> {
    variant: Variant,
    sources: &'a [SharedSource],
    params: &'a QueryParameters,
    key: SourceSetKey,
    signature: ParamSignature,
    merger: MultiSourceMerger,
    rounds: usize,
    failures: Vec<SourceFailure>,
    /// A source failed; cursor states from here on miss its progress.
    degraded: bool,
}

impl<'a> Run<'a> {
    fn new(
        variant: Variant,
        sources: &'a [SharedSource],
        params: &'a QueryParameters,
        comparer: &ItemComparer,
    ) -> Self {
        Self {
            variant,
            sources,
            params,
            key: SourceSetKey::of(sources),
            signature: params.signature(),
            merger: MultiSourceMerger::new(comparer),
            rounds: 0,
            failures: Vec::new(),
            degraded: false,
        }
    }

    fn record_failure(&mut self, failure: SourceFailure) {
        self.degraded = true;
        let known = self
            .failures
            .iter()
            .any(|f| f.source == failure.source && f.message == failure.message);
        if !known {
            self.failures.push(failure);
        }
    }

    fn finish(
        self,
        window: PaginationWindow,
        page: Vec<Candidate>,
        total_results: u64,
        exhausted: bool,
        started: Instant,
    ) -> MergedPage {
        let page = MergedPage {
            items: page.into_iter().map(Candidate::into_merged).collect(),
            total_results,
            start_index: window.skip() + 1,
            items_per_page: window.count,
            rounds: self.rounds,
            exhausted,
            elapsed: started.elapsed(),
            failures: self.failures,
        };
        tracing::debug!(
            variant = ?self.variant,
            items = page.items.len(),
            total = page.total_results,
            rounds = page.rounds,
            failures = page.failures.len(),
            elapsed_ms = page.elapsed.as_millis() as u64,
            "federated page assembled"
        );
        page
    }
}

struct Step {
    items: Vec<Candidate>,
    exhausted: bool,
}

impl FederatedSearch {
    /// Controller with an injected cursor store.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` is invalid.
    pub fn new(config: FederationConfig, store: Arc<dyn CursorStore>) -> Result<Self, SearchError> {
        config.validate()?;
        let executor = SourceQueryExecutor::from_config(&config);
        Ok(Self {
            config,
            store,
            executor,
        })
    }

    /// Controller with an in-memory [`MokaCursorStore`] sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` is invalid.
    pub fn with_moka_store(config: FederationConfig) -> Result<Self, SearchError> {
        let store = Arc::new(MokaCursorStore::from_config(&config));
        Self::new(config, store)
    }

    /// Active configuration.
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Cursor store shared by all requests.
    pub fn store(&self) -> &Arc<dyn CursorStore> {
        &self.store
    }

    /// Build the page described by `params` over `sources`.
    ///
    /// A single [`SourceExtent::Unbounded`] source is served by the
    /// unbounded variant, anything else by the fixed variant. `comparer`
    /// defaults to newest-first by sort key.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] when `sources` is empty or holds two
    /// sources with the same identity. Source failures do not fail the
    /// request; they are reported in [`MergedPage::failures`].
    pub async fn page(
        &self,
        sources: &[SharedSource],
        params: &QueryParameters,
        comparer: Option<&ItemComparer>,
    ) -> Result<MergedPage, SearchError> {
        match sources {
            [only] if only.extent() == SourceExtent::Unbounded => {
                self.page_unbounded(only, params, comparer).await
            }
            _ => self.page_fixed(sources, params, comparer).await,
        }
    }

    /// Build a page with the fixed multi-source variant.
    ///
    /// # Errors
    ///
    /// Same as [`FederatedSearch::page`].
    pub async fn page_fixed(
        &self,
        sources: &[SharedSource],
        params: &QueryParameters,
        comparer: Option<&ItemComparer>,
    ) -> Result<MergedPage, SearchError> {
        self.run(Variant::Fixed, sources, params, comparer).await
    }

    /// Build a page from one source of unknown size.
    ///
    /// # Errors
    ///
    /// Same as [`FederatedSearch::page`].
    pub async fn page_unbounded(
        &self,
        source: &SharedSource,
        params: &QueryParameters,
        comparer: Option<&ItemComparer>,
    ) -> Result<MergedPage, SearchError> {
        self.run(Variant::Unbounded, slice::from_ref(source), params, comparer)
            .await
    }

    async fn run(
        &self,
        variant: Variant,
        sources: &[SharedSource],
        params: &QueryParameters,
        comparer: Option<&ItemComparer>,
    ) -> Result<MergedPage, SearchError> {
        let started = Instant::now();
        check_sources(sources)?;

        let default_comparer = ItemComparer::default();
        let comparer = comparer.unwrap_or(&default_comparer);
        let window = PaginationWindow::from_params(params, self.config.default_count);
        let mut run = Run::new(variant, sources, params, comparer);

        tracing::debug!(
            ?variant,
            sources = sources.len(),
            start_index = window.start_index,
            start_page = window.start_page,
            count = window.count,
            "federated page request"
        );

        if window.is_count_only() {
            let state = self.refresh_totals(&mut run).await;
            let total = summed_total(&state, false);
            return Ok(run.finish(window, Vec::new(), total, false, started));
        }

        let base = window.base();
        let target = window.skip();
        let mut state = match self.store.lookup(&run.key, &run.signature, target) {
            Some(state) if state.matches(&run.key) => {
                tracing::debug!(resumed = state.position, target, "resuming from cached cursor");
                state
            }
            _ => CursorState::initial(sources),
        };
        let mut exhausted = state.all_drained();

        // Seek to the first item of page 1.
        while !exhausted && state.position < base {
            let need = base - state.position;
            exhausted = self.step(&mut run, &mut state, Vec::new(), need).await.exhausted;
        }

        let mut page = Vec::new();
        if state.position >= base {
            let mut page_no = window.page_of(state.position);
            loop {
                if page_no == 1 && base > 0 && state.position == base {
                    self.remember(&run, &state);
                }

                let page_end = window.page_end(page_no);
                let collecting = page_no == window.start_page;
                while !exhausted && state.position < page_end {
                    let need = page_end - state.position;
                    let previous = if collecting {
                        std::mem::take(&mut page)
                    } else {
                        Vec::new()
                    };
                    let step = self.step(&mut run, &mut state, previous, need).await;
                    if collecting {
                        page = step.items;
                    }
                    exhausted = step.exhausted;
                }

                if collecting || exhausted {
                    break;
                }
                page_no += 1;
            }
        }

        let exhausted = exhausted || state.all_drained();
        let total = match variant {
            Variant::Fixed => summed_total(&state, exhausted),
            Variant::Unbounded => incremental_total(&state, exhausted),
        };
        Ok(run.finish(window, page, total, exhausted, started))
    }

    /// One round: fetch, merge, advance, store.
    async fn step(
        &self,
        run: &mut Run<'_>,
        state: &mut CursorState,
        previous: Vec<Candidate>,
        need: u64,
    ) -> Step {
        if run.rounds >= self.config.max_rounds {
            tracing::warn!(rounds = run.rounds, "round limit reached, returning partial page");
            return Step {
                items: previous,
                exhausted: true,
            };
        }

        let size = run.variant.batch_size(need, &self.config);
        let requests: Vec<(SharedSource, SourceRequest)> = run
            .sources
            .iter()
            .filter_map(|source| {
                let cursor = state.source(source.identity())?;
                (!cursor.is_drained()).then(|| {
                    let request = SourceRequest::new(run.params, cursor.offset, size);
                    (Arc::clone(source), request)
                })
            })
            .collect();

        run.rounds += 1;
        let outcomes = self.executor.fan_out(&requests).await;

        let mut batches = Vec::with_capacity(outcomes.len());
        for ((source, request), outcome) in requests.iter().zip(outcomes) {
            match outcome {
                Ok(batch) => {
                    let consumed_before = state
                        .source(source.identity())
                        .map_or(0, SourceCursor::consumed);
                    batches.push(RoundBatch::new(
                        source.identity(),
                        request.start_index,
                        request.count,
                        batch.items,
                        batch.total_results,
                        consumed_before,
                    ));
                }
                Err(failure) => run.record_failure(failure),
            }
        }

        let limit = previous
            .len()
            .saturating_add(usize::try_from(need).unwrap_or(usize::MAX));
        let outcome = run.merger.merge_after(&state.yielded, previous, &batches, limit);
        advance(state, &batches, &outcome);
        self.remember(run, state);

        tracing::debug!(
            round = run.rounds,
            position = state.position,
            accepted = outcome.accepted,
            consumed = outcome.total_consumed(),
            "round merged"
        );

        Step {
            exhausted: outcome.total_consumed() == 0 || state.all_drained(),
            items: outcome.items,
        }
    }

    /// Cache `state` unless a source failed earlier in this request.
    fn remember(&self, run: &Run<'_>, state: &CursorState) {
        if run.degraded {
            tracing::debug!(position = state.position, "source failure in request, cursor not cached");
            return;
        }
        self.store.store(&run.key, &run.signature, state);
    }

    /// One count-0 round asking every source for its current total.
    async fn refresh_totals(&self, run: &mut Run<'_>) -> CursorState {
        let mut state = CursorState::initial(run.sources);
        let requests: Vec<(SharedSource, SourceRequest)> = run
            .sources
            .iter()
            .map(|source| {
                let request = SourceRequest::new(run.params, source.index_offset(), 0);
                (Arc::clone(source), request)
            })
            .collect();

        run.rounds += 1;
        let outcomes = self.executor.fan_out(&requests).await;
        for ((source, _), outcome) in requests.iter().zip(outcomes) {
            match outcome {
                Ok(batch) => {
                    if let (Some(total), Some(cursor)) =
                        (batch.total_results, state.source_mut(source.identity()))
                    {
                        cursor.total = Some(total);
                    }
                }
                Err(failure) => run.record_failure(failure),
            }
        }
        state
    }
}

/// Apply a merge outcome to the cursor state.
fn advance(state: &mut CursorState, batches: &[RoundBatch], outcome: &MergeOutcome) {
    for batch in batches {
        let Some(cursor) = state.source_mut(&batch.origin) else {
            continue;
        };
        let consumed = outcome.consumed_from(&batch.origin);
        cursor.offset += consumed;
        if let Some(total) = batch.total_results {
            cursor.total = Some(total);
        }
        if batch.complete && consumed == batch.items.len() as u64 {
            cursor.exhausted = true;
        }
    }
    state.position += outcome.accepted as u64;
    state
        .yielded
        .extend(outcome.items.iter().map(|c| c.item.id.clone()));
}

/// Sum of the best known total of every source.
fn summed_total(state: &CursorState, exhausted: bool) -> u64 {
    state
        .sources
        .values()
        .map(|cursor| {
            let consumed = cursor.consumed();
            match cursor.total {
                Some(total) => total.max(consumed),
                None if exhausted || cursor.exhausted => consumed,
                None => consumed + 1,
            }
        })
        .sum()
}

/// Items yielded so far, plus one while more may exist.
fn incremental_total(state: &CursorState, exhausted: bool) -> u64 {
    let observed = state.position + u64::from(!exhausted);
    let reported = state.sources.values().filter_map(|c| c.total).max();
    reported.map_or(observed, |reported| reported.max(observed))
}

fn check_sources(sources: &[SharedSource]) -> Result<(), SearchError> {
    if sources.is_empty() {
        return Err(SearchError::Config("at least one source is required".into()));
    }
    let mut seen = HashSet::new();
    for source in sources {
        if !seen.insert(source.identity()) {
            return Err(SearchError::Config(format!(
                "duplicate source identity: {}",
                source.identity()
            )));
        }
    }
    Ok(())
}

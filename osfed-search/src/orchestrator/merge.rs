//! Merging of per-source round batches into the accumulating page.
//!
//! Items are ordered by a strict total order: the active [`ItemComparer`],
//! then the identity of the originating source, then the item's
//! source-native index. Each source is expected to answer in comparer
//! order, so a batch that may continue past its last item bounds how far
//! the merge can safely go: a fresh item is only eligible when it sorts at
//! or before the last fetched item of every source that may still hold
//! more. Eligible items are deduplicated, sorted and truncated, and the
//! merger reports how many items of each source were consumed so the
//! caller advances that source's cursor by exactly that much.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::compare::ItemComparer;
use super::dedup::deduplicate;
use crate::types::{Item, MergedItem};

/// An item tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Identity of the originating source.
    pub origin: String,
    /// Source-native index of the item.
    pub position: u64,
    /// The item.
    pub item: Item,
}

impl Candidate {
    /// Tag `item` as fetched from `origin` at `position`.
    pub fn new(origin: impl Into<String>, position: u64, item: Item) -> Self {
        Self {
            origin: origin.into(),
            position,
            item,
        }
    }

    /// Convert into the page representation.
    pub fn into_merged(self) -> MergedItem {
        MergedItem {
            source: self.origin,
            item: self.item,
        }
    }
}

/// Items fetched from one source in one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundBatch {
    /// Identity of the source.
    pub origin: String,
    /// Source-native index of the first item.
    pub start_index: u64,
    /// Number of items requested.
    pub requested: usize,
    /// Items in source order.
    pub items: Vec<Item>,
    /// Total reported by the source for this query.
    pub total_results: Option<u64>,
    /// The source holds nothing past the last item of this batch.
    pub complete: bool,
}

impl RoundBatch {
    /// Build a batch, deciding completeness from the reply.
    ///
    /// A batch is complete when it is empty, when it reaches the total the
    /// source reports, or, for sources reporting no total, when it is short
    /// of the request. `consumed_before` is how many items of the source
    /// were consumed before this batch.
    pub fn new(
        origin: impl Into<String>,
        start_index: u64,
        requested: usize,
        items: Vec<Item>,
        total_results: Option<u64>,
        consumed_before: u64,
    ) -> Self {
        let fetched = items.len() as u64;
        let complete = items.is_empty()
            || match total_results {
                Some(total) => consumed_before + fetched >= total,
                None => items.len() < requested,
            };
        Self {
            origin: origin.into(),
            start_index,
            requested,
            items,
            total_results,
            complete,
        }
    }

    fn last(&self) -> Option<Candidate> {
        let item = self.items.last()?;
        let position = self.start_index + self.items.len() as u64 - 1;
        Some(Candidate::new(self.origin.clone(), position, item.clone()))
    }

    fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.items
            .iter()
            .zip(self.start_index..)
            .map(|(item, position)| Candidate::new(self.origin.clone(), position, item.clone()))
    }
}

/// Result of one merge.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// The accumulated page after this round, in merged order.
    pub items: Vec<Candidate>,
    /// Fresh items consumed per source identity, a prefix of each batch.
    pub consumed: BTreeMap<String, u64>,
    /// Fresh items newly accepted into the page.
    pub accepted: usize,
    /// The page was already full and could not change.
    pub unchanged: bool,
}

impl MergeOutcome {
    /// Items consumed across all sources.
    pub fn total_consumed(&self) -> u64 {
        self.consumed.values().sum()
    }

    /// Items consumed from `origin`.
    pub fn consumed_from(&self, origin: &str) -> u64 {
        self.consumed.get(origin).copied().unwrap_or(0)
    }
}

/// Merges round batches under one comparer.
#[derive(Debug, Clone)]
pub struct MultiSourceMerger {
    comparer: ItemComparer,
}

impl MultiSourceMerger {
    /// Merger ordering items with `comparer`.
    pub fn new(comparer: &ItemComparer) -> Self {
        Self {
            comparer: comparer.clone(),
        }
    }

    /// Total order over candidates.
    pub fn order(&self, a: &Candidate, b: &Candidate) -> Ordering {
        self.comparer
            .compare(&a.item, &b.item)
            .then_with(|| a.origin.cmp(&b.origin))
            .then_with(|| a.position.cmp(&b.position))
    }

    /// Merge `batches` into `previous`, keeping at most `limit` items.
    pub fn merge(&self, previous: Vec<Candidate>, batches: &[RoundBatch], limit: usize) -> MergeOutcome {
        self.merge_after(&BTreeSet::new(), previous, batches, limit)
    }

    /// Like [`merge`](Self::merge), but fresh items whose identifier is in
    /// `yielded` are dropped as duplicates of items the stream already
    /// produced before `previous`.
    pub fn merge_after(
        &self,
        yielded: &BTreeSet<String>,
        previous: Vec<Candidate>,
        batches: &[RoundBatch],
        limit: usize,
    ) -> MergeOutcome {
        if self.is_settled(&previous, batches, limit) {
            tracing::trace!(items = previous.len(), "page settled, skipping merge");
            return MergeOutcome {
                items: previous,
                unchanged: true,
                ..MergeOutcome::default()
            };
        }

        let frontiers: Vec<Candidate> = batches
            .iter()
            .filter(|b| !b.complete)
            .filter_map(RoundBatch::last)
            .collect();

        let mut eligible: Vec<Candidate> = batches
            .iter()
            .flat_map(RoundBatch::candidates)
            .filter(|c| frontiers.iter().all(|f| self.order(c, f).is_le()))
            .collect();
        eligible.sort_by(|a, b| self.order(a, b));

        let need = limit.saturating_sub(previous.len());
        let kept = deduplicate(
            previous
                .iter()
                .map(|c| c.item.id.as_str())
                .chain(yielded.iter().map(String::as_str)),
            eligible.clone(),
        );

        // The first kept item that does not fit bounds consumption; everything
        // before it was either accepted or a duplicate.
        let cut = kept.get(need).cloned();
        let taken: Vec<Candidate> = kept.into_iter().take(need).collect();

        let mut consumed: BTreeMap<String, u64> = BTreeMap::new();
        for candidate in &eligible {
            if let Some(cut) = &cut {
                if self.order(candidate, cut).is_ge() {
                    break;
                }
            }
            *consumed.entry(candidate.origin.clone()).or_default() += 1;
        }

        let accepted = taken.len();
        let mut items = previous;
        items.extend(taken);
        items.sort_by(|a, b| self.order(a, b));

        MergeOutcome {
            items,
            consumed,
            accepted,
            unchanged: false,
        }
    }

    /// The page is full and no fresh item can outrank its last item.
    fn is_settled(&self, previous: &[Candidate], batches: &[RoundBatch], limit: usize) -> bool {
        if previous.len() < limit {
            return false;
        }
        let Some(last) = previous.last() else {
            return true;
        };
        batches.iter().all(|batch| {
            batch
                .candidates()
                .next()
                .map_or(true, |first| self.order(last, &first).is_le())
        })
    }
}

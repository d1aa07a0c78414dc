//! Cursor state and the time-bounded cursor store.
//!
//! A cursor records, for one set of sources and one free-parameter
//! signature, how far each source has been consumed after the merged stream
//! yielded `position` items, and which identifiers it yielded so a resumed
//! stream drops the same duplicates a fresh one would. Sequential page
//! requests resume from the closest cursor at or before their start instead
//! of re-reading every source from its first item.
//!
//! [`MokaCursorStore`] buckets entries by source-set hash in a [`moka`]
//! cache (capacity and TTL eviction); each bucket has its own lock, so
//! requests over unrelated source sets never contend.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use moka::sync::Cache;

use crate::config::FederationConfig;
use crate::params::ParamSignature;
use crate::source::SharedSource;

/// Order-independent key of a set of sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSetKey {
    /// Hash of the sorted identities.
    hash: u64,
    /// Sorted identities, so hash collisions never mix buckets.
    identities: Vec<String>,
}

impl SourceSetKey {
    /// Build a key from source identities in any order.
    ///
    /// `[a, b]` and `[b, a]` produce the same key.
    pub fn new<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut identities: Vec<String> = identities
            .into_iter()
            .map(|id| id.as_ref().to_owned())
            .collect();
        identities.sort();
        let mut hasher = DefaultHasher::new();
        for id in &identities {
            id.hash(&mut hasher);
        }
        Self {
            hash: hasher.finish(),
            identities,
        }
    }

    /// Key of the given sources.
    pub fn of(sources: &[SharedSource]) -> Self {
        Self::new(sources.iter().map(|s| s.identity()))
    }

    /// Bucket hash.
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Sorted identities.
    pub fn identities(&self) -> &[String] {
        &self.identities
    }
}

/// Progress through a single source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCursor {
    /// The source's first index.
    pub native_offset: u64,
    /// Next source-native index to fetch.
    pub offset: u64,
    /// Latest known total (reported, else declared).
    pub total: Option<u64>,
    /// The source has no further items.
    pub exhausted: bool,
}

impl SourceCursor {
    /// Cursor at the first item of a source.
    pub fn start(native_offset: u64, declared_total: Option<u64>) -> Self {
        Self {
            native_offset,
            offset: native_offset,
            total: declared_total,
            exhausted: false,
        }
    }

    /// Items consumed from this source so far.
    pub fn consumed(&self) -> u64 {
        self.offset.saturating_sub(self.native_offset)
    }

    /// Items left according to the latest known total.
    pub fn remaining(&self) -> Option<u64> {
        self.total.map(|total| total.saturating_sub(self.consumed()))
    }

    /// Nothing more should be fetched from this source.
    pub fn is_drained(&self) -> bool {
        self.exhausted || self.remaining() == Some(0)
    }
}

/// Resumable state of a merged stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorState {
    /// Items already yielded from the merged stream.
    pub position: u64,
    /// Per-source progress keyed by identity.
    pub sources: BTreeMap<String, SourceCursor>,
    /// Identifiers of every item yielded so far; later copies are duplicates.
    pub yielded: BTreeSet<String>,
}

impl CursorState {
    /// State before anything has been fetched.
    pub fn initial(sources: &[SharedSource]) -> Self {
        Self {
            position: 0,
            yielded: BTreeSet::new(),
            sources: sources
                .iter()
                .map(|s| {
                    let cursor = SourceCursor::start(s.index_offset(), s.extent().declared_total());
                    (s.identity().to_owned(), cursor)
                })
                .collect(),
        }
    }

    /// Cursor of one source.
    pub fn source(&self, identity: &str) -> Option<&SourceCursor> {
        self.sources.get(identity)
    }

    /// Mutable cursor of one source.
    pub fn source_mut(&mut self, identity: &str) -> Option<&mut SourceCursor> {
        self.sources.get_mut(identity)
    }

    /// Every source is drained.
    pub fn all_drained(&self) -> bool {
        self.sources.values().all(SourceCursor::is_drained)
    }

    /// Whether this state covers exactly the sources of `key`.
    pub fn matches(&self, key: &SourceSetKey) -> bool {
        self.sources.len() == key.identities.len()
            && key.identities.iter().all(|id| self.sources.contains_key(id))
    }
}

/// Storage for resumable cursor states.
///
/// Implementations are shared between concurrent requests. `store` is a
/// read-modify-write of one bucket and must be atomic with respect to
/// other callers on the same key.
pub trait CursorStore: Send + Sync {
    /// Closest state at or before `position` for this source set and
    /// free-parameter signature.
    fn lookup(
        &self,
        key: &SourceSetKey,
        signature: &ParamSignature,
        position: u64,
    ) -> Option<CursorState>;

    /// Insert `state`, replacing an entry with the same signature and
    /// position, and extend the bucket's lifetime.
    fn store(&self, key: &SourceSetKey, signature: &ParamSignature, state: &CursorState);

    /// Forget every state for a source set.
    fn invalidate(&self, key: &SourceSetKey);
}

#[derive(Debug, Clone)]
struct CachedCursor {
    identities: Vec<String>,
    signature: ParamSignature,
    state: CursorState,
    stored_at: Instant,
}

type Bucket = Arc<Mutex<Vec<CachedCursor>>>;

/// In-memory cursor store with TTL, backed by [`moka`].
pub struct MokaCursorStore {
    buckets: Cache<u64, Bucket>,
    ttl: Duration,
    max_per_bucket: usize,
}

impl MokaCursorStore {
    /// Store holding at most `max_buckets` source sets and `max_per_bucket`
    /// cursors per set, each reusable for `ttl`.
    pub fn new(ttl: Duration, max_buckets: u64, max_per_bucket: usize) -> Self {
        Self {
            buckets: Cache::builder()
                .max_capacity(max_buckets)
                .time_to_live(ttl)
                .build(),
            ttl,
            max_per_bucket: max_per_bucket.max(1),
        }
    }

    /// Store sized from a [`FederationConfig`].
    pub fn from_config(config: &FederationConfig) -> Self {
        Self::new(
            config.cursor_ttl(),
            config.max_cursor_buckets,
            config.max_cursors_per_bucket,
        )
    }

    /// Number of live cursor entries across all buckets.
    pub fn cursor_count(&self) -> usize {
        self.buckets
            .iter()
            .map(|(_, bucket)| {
                let entries = bucket.lock().unwrap_or_else(PoisonError::into_inner);
                entries
                    .iter()
                    .filter(|e| e.stored_at.elapsed() < self.ttl)
                    .count()
            })
            .sum()
    }
}

impl std::fmt::Debug for MokaCursorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCursorStore")
            .field("buckets", &self.buckets.entry_count())
            .field("ttl", &self.ttl)
            .field("max_per_bucket", &self.max_per_bucket)
            .finish()
    }
}

impl CursorStore for MokaCursorStore {
    fn lookup(
        &self,
        key: &SourceSetKey,
        signature: &ParamSignature,
        position: u64,
    ) -> Option<CursorState> {
        let bucket = self.buckets.get(&key.hash)?;
        let entries = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let found = entries
            .iter()
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .filter(|e| e.identities == key.identities && &e.signature == signature)
            .filter(|e| e.state.position <= position)
            .max_by_key(|e| e.state.position)
            .map(|e| e.state.clone());
        match &found {
            Some(state) => tracing::trace!(
                requested = position,
                resumed = state.position,
                "cursor store hit"
            ),
            None => tracing::trace!(requested = position, "cursor store miss"),
        }
        found
    }

    fn store(&self, key: &SourceSetKey, signature: &ParamSignature, state: &CursorState) {
        let bucket = self
            .buckets
            .get_with(key.hash, || Arc::new(Mutex::new(Vec::new())));
        {
            let mut entries = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            entries.retain(|e| e.stored_at.elapsed() < self.ttl);

            let entry = CachedCursor {
                identities: key.identities.clone(),
                signature: signature.clone(),
                state: state.clone(),
                stored_at: Instant::now(),
            };
            match entries.iter_mut().find(|e| {
                e.identities == entry.identities
                    && e.signature == entry.signature
                    && e.state.position == entry.state.position
            }) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }

            if entries.len() > self.max_per_bucket {
                entries.sort_by_key(|e| std::cmp::Reverse(e.stored_at));
                entries.truncate(self.max_per_bucket);
            }
        }
        // Re-inserting restarts the bucket's time-to-live.
        self.buckets.insert(key.hash, bucket);
    }

    fn invalidate(&self, key: &SourceSetKey) {
        self.buckets.invalidate(&key.hash);
    }
}

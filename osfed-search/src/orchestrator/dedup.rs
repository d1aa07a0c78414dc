//! Candidate deduplication by item identifier.
//!
//! Identifiers already yielded by the merged stream win over fresh
//! candidates; among fresh candidates the first in merged order wins.

use std::collections::HashSet;

use super::merge::Candidate;

/// Deduplicate `candidates` (already in merged order) against each other
/// and against the identifiers in `accepted`.
pub fn deduplicate<'a>(
    accepted: impl IntoIterator<Item = &'a str>,
    candidates: Vec<Candidate>,
) -> Vec<Candidate> {
    let accepted: HashSet<&str> = accepted.into_iter().collect();
    let mut fresh: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let id = &candidate.item.id;
        if accepted.contains(id.as_str()) || !fresh.insert(id.clone()) {
            tracing::trace!(id = %candidate.item.id, source = %candidate.origin, "dropping duplicate item");
            continue;
        }
        kept.push(candidate);
    }
    kept
}

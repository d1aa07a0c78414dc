//! Core types for result items, source batches and merged pages.

use std::borrow::Cow;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single result entry returned by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Identifier, unique within its source. Deduplication compares this only.
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Last-updated timestamp; the default sort key is derived from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Explicit sort key overriding the timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    /// Arbitrary payload, opaque to the merge logic.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Item {
    /// Item with an identifier and title and nothing else.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            updated: None,
            sort_key: None,
            fields: serde_json::Map::new(),
        }
    }

    /// Builder: set the last-updated timestamp.
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }

    /// Builder: set an explicit sort key.
    pub fn with_sort_key(mut self, key: impl Into<String>) -> Self {
        self.sort_key = Some(key.into());
        self
    }

    /// Builder: add a payload field.
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Effective sort key: the explicit override, else the RFC 3339 form of
    /// `updated` (lexically sortable), else the empty string.
    pub fn sort_key(&self) -> Cow<'_, str> {
        match (&self.sort_key, &self.updated) {
            (Some(key), _) => Cow::Borrowed(key),
            (None, Some(updated)) => {
                Cow::Owned(updated.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            (None, None) => Cow::Borrowed(""),
        }
    }
}

/// Items returned by one source for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultBatch {
    /// Items in the source's own order.
    pub items: Vec<Item>,
    /// Total matching items as reported by the source, if it reports one.
    pub total_results: Option<u64>,
    /// Media type the source answered with.
    pub content_type: String,
}

impl ResultBatch {
    /// Batch of JSON items.
    pub fn new(items: Vec<Item>, total_results: Option<u64>) -> Self {
        Self {
            items,
            total_results,
            content_type: "application/json".to_owned(),
        }
    }

    /// Batch with no items.
    pub fn empty(total_results: Option<u64>) -> Self {
        Self::new(Vec::new(), total_results)
    }
}

/// What a source says about its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "total")]
pub enum SourceExtent {
    /// The source declares how many items it holds (possibly stale).
    Bounded(u64),
    /// The source's size is unknown until it is probed.
    Unbounded,
}

impl SourceExtent {
    /// Declared total, if any.
    pub fn declared_total(&self) -> Option<u64> {
        match self {
            Self::Bounded(total) => Some(*total),
            Self::Unbounded => None,
        }
    }
}

/// A source query that failed during a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    /// Identity of the failing source.
    pub source: String,
    /// Error message.
    pub message: String,
    /// Where to read more about the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_link: Option<String>,
}

/// An item of a merged page, tagged with the source it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedItem {
    /// Identity of the originating source.
    pub source: String,
    /// The item itself.
    pub item: Item,
}

/// The page handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedPage {
    /// Items of the requested page, in merged order.
    pub items: Vec<MergedItem>,
    /// Best known estimate of the number of items across all sources.
    pub total_results: u64,
    /// Absolute 1-based index of the first item of this page.
    pub start_index: u64,
    /// Requested page size.
    pub items_per_page: usize,
    /// Fetch rounds executed to build this page.
    pub rounds: usize,
    /// No source can yield further items.
    pub exhausted: bool,
    /// Wall-clock time spent building the page.
    pub elapsed: Duration,
    /// Per-source failures observed while building the page.
    pub failures: Vec<SourceFailure>,
}

impl MergedPage {
    /// Identifiers of the page items, in order.
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|m| m.item.id.as_str()).collect()
    }

    /// Whether any source failed while building this page.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn explicit_sort_key_wins() {
        let updated = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let item = Item::new("a", "A").with_updated(updated).with_sort_key("zzz");
        assert_eq!(item.sort_key(), "zzz");
    }

    #[test]
    fn sort_key_derives_from_updated() {
        let updated = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let item = Item::new("a", "A").with_updated(updated);
        assert_eq!(item.sort_key(), "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn derived_sort_keys_order_like_timestamps() {
        let older = Item::new("o", "").with_updated(Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap());
        let newer = Item::new("n", "").with_updated(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
        assert!(older.sort_key() < newer.sort_key());
    }

    #[test]
    fn missing_sort_key_is_empty() {
        assert_eq!(Item::new("a", "A").sort_key(), "");
    }

    #[test]
    fn item_serde_uses_camel_case() {
        let item = Item::new("a", "A")
            .with_sort_key("k")
            .with_field("size", serde_json::json!(3));
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["sortKey"], "k");
        assert_eq!(json["fields"]["size"], 3);
        let decoded: Item = serde_json::from_value(json).expect("deserialize");
        assert_eq!(decoded, item);
    }

    #[test]
    fn item_deserializes_with_only_id() {
        let item: Item = serde_json::from_str(r#"{ "id": "x" }"#).expect("deserialize");
        assert_eq!(item.id, "x");
        assert!(item.title.is_empty());
        assert!(item.fields.is_empty());
    }

    #[test]
    fn extent_declared_total() {
        assert_eq!(SourceExtent::Bounded(4).declared_total(), Some(4));
        assert_eq!(SourceExtent::Unbounded.declared_total(), None);
    }

    #[test]
    fn empty_batch_has_json_content_type() {
        let batch = ResultBatch::empty(Some(0));
        assert!(batch.items.is_empty());
        assert_eq!(batch.content_type, "application/json");
    }
}

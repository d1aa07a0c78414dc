//! JSON result document read by file and HTTP sources.
//!
//! ```json
//! { "totalResults": 42, "items": [ { "id": "a1", "title": "...", "updated": "2024-05-01T12:00:00Z" } ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::types::{Item, ResultBatch};

/// A page of results as served by a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDocument {
    /// Total matching items, when the source reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    /// Items of this page.
    #[serde(default)]
    pub items: Vec<Item>,
}

impl ResultDocument {
    /// Parse a document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Parse`] if the bytes are not a result document.
    pub fn parse(bytes: &[u8]) -> Result<Self, SearchError> {
        serde_json::from_slice(bytes)
            .map_err(|e| SearchError::Parse(format!("invalid result document: {e}")))
    }

    /// Convert into a batch answered with `content_type`.
    pub fn into_batch(self, content_type: impl Into<String>) -> ResultBatch {
        ResultBatch {
            items: self.items,
            total_results: self.total_results,
            content_type: content_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let doc = ResultDocument::parse(
            br#"{ "totalResults": 2, "items": [ { "id": "a" }, { "id": "b", "sortKey": "k" } ] }"#,
        )
        .expect("parse");
        assert_eq!(doc.total_results, Some(2));
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[1].sort_key(), "k");
    }

    #[test]
    fn total_is_optional() {
        let doc = ResultDocument::parse(br#"{ "items": [] }"#).expect("parse");
        assert!(doc.total_results.is_none());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = ResultDocument::parse(b"<feed/>").unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn into_batch_keeps_content_type() {
        let batch = ResultDocument::default().into_batch("application/vnd.test+json");
        assert_eq!(batch.content_type, "application/vnd.test+json");
    }
}

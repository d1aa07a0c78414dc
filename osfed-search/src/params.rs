//! Request parameters and their pagination-free signature.
//!
//! A request is a multimap of OpenSearch parameter names to values. The
//! pagination keys ([`COUNT`], [`START_PAGE`], [`START_INDEX`]) describe the
//! requested window; everything else is a "free" parameter that is passed
//! through to every source and identifies the result stream for cursor
//! caching.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Number of items per page.
pub const COUNT: &str = "count";
/// 1-based page number.
pub const START_PAGE: &str = "startPage";
/// 1-based index of the first item.
pub const START_INDEX: &str = "startIndex";
/// Free-text search terms.
pub const SEARCH_TERMS: &str = "searchTerms";

const PAGINATION_KEYS: [&str; 3] = [COUNT, START_PAGE, START_INDEX];

/// Returns `true` if `key` is one of the pagination keys.
pub fn is_pagination_key(key: &str) -> bool {
    PAGINATION_KEYS.contains(&key)
}

/// Parse an unsigned integer parameter, discarding anything unparseable.
pub fn try_parse_u64(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

/// Ordered multimap of request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameters {
    values: BTreeMap<String, Vec<String>>,
}

impl QueryParameters {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored; repeated keys keep every value.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.append(key.into_owned(), value.into_owned());
        }
        params
    }

    /// Encode as a query string (keys sorted).
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.iter() {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    /// Replace every value of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    /// Add a value to `key`, keeping existing values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Remove `key` entirely.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.values.remove(key)
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map_or(&[], Vec::as_slice)
    }

    /// `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str())))
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of these parameters without the pagination keys.
    pub fn without_pagination(&self) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(key, _)| !is_pagination_key(key))
                .map(|(key, values)| (key.clone(), values.clone()))
                .collect(),
        }
    }

    /// Signature of the free parameters, used to match cached cursors.
    pub fn signature(&self) -> ParamSignature {
        ParamSignature {
            free: self.without_pagination().values,
        }
    }

    /// Whether `self` and `other` differ at most in pagination keys.
    pub fn pagination_free_eq(&self, other: &Self) -> bool {
        self.signature() == other.signature()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.append(key, value);
        }
        params
    }
}

/// The free (non-pagination) part of a request, in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamSignature {
    free: BTreeMap<String, Vec<String>>,
}

impl ParamSignature {
    /// Stable 64-bit digest, suitable for log fields.
    pub fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_string_with_repeated_keys() {
        let params = QueryParameters::from_query_string("?searchTerms=sea+ice&cat=a&cat=b&count=10");
        assert_eq!(params.get(SEARCH_TERMS), Some("sea ice"));
        assert_eq!(params.get_all("cat"), ["a", "b"]);
        assert_eq!(params.get(COUNT), Some("10"));
    }

    #[test]
    fn query_string_round_trips_through_encoding() {
        let params = QueryParameters::new()
            .with(SEARCH_TERMS, "a&b")
            .with(COUNT, "5");
        let encoded = params.to_query_string();
        assert_eq!(QueryParameters::from_query_string(&encoded), params);
    }

    #[test]
    fn try_parse_discards_garbage() {
        assert_eq!(try_parse_u64(Some("12")), Some(12));
        assert_eq!(try_parse_u64(Some(" 7 ")), Some(7));
        assert_eq!(try_parse_u64(Some("twelve")), None);
        assert_eq!(try_parse_u64(Some("-3")), None);
        assert_eq!(try_parse_u64(None), None);
    }

    #[test]
    fn signature_ignores_pagination() {
        let a = QueryParameters::new()
            .with(SEARCH_TERMS, "ice")
            .with(COUNT, "10")
            .with(START_PAGE, "2");
        let b = QueryParameters::new()
            .with(SEARCH_TERMS, "ice")
            .with(START_INDEX, "7");
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature().digest(), b.signature().digest());
        assert!(a.pagination_free_eq(&b));
    }

    #[test]
    fn signature_differs_on_free_parameter() {
        let a = QueryParameters::new().with(SEARCH_TERMS, "ice");
        let b = QueryParameters::new().with(SEARCH_TERMS, "snow");
        let c = QueryParameters::new()
            .with(SEARCH_TERMS, "ice")
            .with("lang", "en");
        assert_ne!(a.signature(), b.signature());
        assert_ne!(a.signature(), c.signature());
    }

    #[test]
    fn without_pagination_keeps_free_keys() {
        let params = QueryParameters::new()
            .with(SEARCH_TERMS, "x")
            .with(COUNT, "1")
            .with(START_PAGE, "1")
            .with(START_INDEX, "1");
        let free = params.without_pagination();
        assert_eq!(free.iter().count(), 1);
        assert_eq!(free.get(SEARCH_TERMS), Some("x"));
    }

    #[test]
    fn set_replaces_and_append_accumulates() {
        let mut params = QueryParameters::new();
        params.append("k", "1");
        params.append("k", "2");
        assert_eq!(params.get_all("k").len(), 2);
        params.set("k", "3");
        assert_eq!(params.get_all("k"), ["3"]);
        assert!(params.remove("k").is_some());
        assert!(params.is_empty());
    }

    #[test]
    fn collects_from_pairs() {
        let params: QueryParameters = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(params.get("b"), Some("2"));
    }
}

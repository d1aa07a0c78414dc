//! Item ordering for merged pages.
//!
//! An [`ItemComparer`] is a list of criteria evaluated in turn; the first
//! criterion that tells two items apart decides. The default orders by
//! sort key, newest first.

use std::cmp::Ordering;
use std::str::FromStr;

use serde_json::Value;

use crate::error::SearchError;
use crate::types::Item;

/// Sort direction of one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    #[default]
    Descending,
}

/// What a criterion compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    /// [`Item::sort_key`].
    SortKey,
    /// [`Item::title`].
    Title,
    /// [`Item::id`].
    Identifier,
    /// A payload field; numbers compare numerically, anything else as text.
    Field(String),
}

/// One comparison step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    /// Compared value.
    pub field: SortField,
    /// Direction.
    pub direction: SortDirection,
}

impl SortCriterion {
    /// Criterion on `field` in `direction`.
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let ordering = match &self.field {
            SortField::SortKey => a.sort_key().cmp(&b.sort_key()),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Identifier => a.id.cmp(&b.id),
            SortField::Field(name) => compare_values(a.fields.get(name), b.fields.get(name)),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// `key`, `title`, `id` or `field:NAME`, optionally followed by `:asc` or `:desc`.
impl FromStr for SortCriterion {
    type Err = SearchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (body, direction) = if let Some(body) = raw.strip_suffix(":asc") {
            (body, SortDirection::Ascending)
        } else if let Some(body) = raw.strip_suffix(":desc") {
            (body, SortDirection::Descending)
        } else {
            (raw, SortDirection::Descending)
        };
        let field = match body {
            "key" => SortField::SortKey,
            "title" => SortField::Title,
            "id" => SortField::Identifier,
            other => match other.strip_prefix("field:") {
                Some(name) if !name.is_empty() => SortField::Field(name.to_owned()),
                _ => return Err(SearchError::Config(format!("unknown sort criterion: {raw}"))),
            },
        };
        Ok(Self::new(field, direction))
    }
}

/// Multi-criterion item comparer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemComparer {
    criteria: Vec<SortCriterion>,
}

impl Default for ItemComparer {
    fn default() -> Self {
        Self::by_sort_key(SortDirection::Descending)
    }
}

impl ItemComparer {
    /// Comparer with the given criteria. An empty list treats all items as equal.
    pub fn new(criteria: Vec<SortCriterion>) -> Self {
        Self { criteria }
    }

    /// Single criterion on the sort key.
    pub fn by_sort_key(direction: SortDirection) -> Self {
        Self::new(vec![SortCriterion::new(SortField::SortKey, direction)])
    }

    /// Builder: append a tie-breaking criterion.
    pub fn then(mut self, criterion: SortCriterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Criteria in evaluation order.
    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    /// Compare two items; the first non-equal criterion wins.
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        self.criteria
            .iter()
            .map(|c| c.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// Missing values sort first in ascending order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

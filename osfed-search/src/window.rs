//! Conversions between `(startPage, count)` and absolute item positions.
//!
//! Positions in this module are 0-based counts of items already yielded
//! from the merged stream; OpenSearch `startIndex` and `startPage` are
//! 1-based.

use crate::params::{try_parse_u64, QueryParameters, COUNT, START_INDEX, START_PAGE};

/// Default page size when neither the request nor the config provides one.
pub const DEFAULT_COUNT: usize = 20;

/// The requested window of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    /// 1-based index of the first item of page 1.
    pub start_index: u64,
    /// 1-based page number.
    pub start_page: u64,
    /// Items per page. `0` asks for totals only.
    pub count: usize,
}

impl Default for PaginationWindow {
    fn default() -> Self {
        Self {
            start_index: 1,
            start_page: 1,
            count: DEFAULT_COUNT,
        }
    }
}

impl PaginationWindow {
    /// Window with explicit coordinates; zero page/index values become 1.
    pub fn new(start_index: u64, start_page: u64, count: usize) -> Self {
        Self {
            start_index: start_index.max(1),
            start_page: start_page.max(1),
            count,
        }
    }

    /// Read the window from request parameters.
    ///
    /// Absent or unparseable values fall back to `startIndex = 1`,
    /// `startPage = 1` and `count = default_count`. Zero is accepted for
    /// `count` only.
    pub fn from_params(params: &QueryParameters, default_count: usize) -> Self {
        let positive = |key: &str| try_parse_u64(params.get(key)).filter(|v| *v >= 1);
        let count = try_parse_u64(params.get(COUNT))
            .and_then(|c| usize::try_from(c).ok())
            .unwrap_or(default_count);
        Self {
            start_index: positive(START_INDEX).unwrap_or(1),
            start_page: positive(START_PAGE).unwrap_or(1),
            count,
        }
    }

    /// Only totals are requested.
    pub fn is_count_only(&self) -> bool {
        self.count == 0
    }

    /// Items skipped before page 1 starts.
    pub fn base(&self) -> u64 {
        self.start_index - 1
    }

    /// Items skipped before the requested page: `(startIndex-1) + (startPage-1)*count`.
    pub fn skip(&self) -> u64 {
        self.page_start(self.start_page)
    }

    /// Absolute position where `page` (1-based) starts.
    pub fn page_start(&self, page: u64) -> u64 {
        self.base()
            .saturating_add(page.saturating_sub(1).saturating_mul(self.count as u64))
    }

    /// Absolute position right after the last item of `page`.
    pub fn page_end(&self, page: u64) -> u64 {
        self.page_start(page.saturating_add(1))
    }

    /// Page containing absolute `position`; positions before page 1 map to page 1.
    pub fn page_of(&self, position: u64) -> u64 {
        if self.count == 0 || position <= self.base() {
            return 1;
        }
        (position - self.base()) / self.count as u64 + 1
    }
}

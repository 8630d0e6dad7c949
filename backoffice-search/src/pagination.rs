//! Page-based pagination for index listings.
//!
//! The total is counted first; page count and offset derive from it and the
//! page size.

use serde::{Deserialize, Serialize};

use crate::params::{PerPage, SearchParams};

/// Page size used when neither the request nor the resource sets one.
pub const DEFAULT_PAGE_COUNT: u64 = 20;

/// Page size standing in for `per_page=all`.
pub const PER_PAGE_ALL_LIMIT: u64 = 1_000_000;

/// Page sizing defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDefaults {
    /// Default page size
    pub page_count: u64,
    /// Page size for `per_page=all`
    pub per_page_all: u64,
}

impl Default for PageDefaults {
    fn default() -> Self {
        Self {
            page_count: DEFAULT_PAGE_COUNT,
            per_page_all: PER_PAGE_ALL_LIMIT,
        }
    }
}

/// Pagination state of a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Records matching the search, across all pages
    pub total: u64,
    /// Number of pages; `0` when nothing matched
    pub pages: u64,
    /// 1-based current page; `None` when paging is off
    pub current_page: Option<u64>,
    pub per_page: u64,
}

const MAX_OFFSET: u64 = i64::MAX as u64;

impl Pagination {
    /// Resolve the page and page size a request asks for.
    ///
    /// Page size precedence: request `per_page`, then `resource_page_count`,
    /// then `defaults.page_count`. A negative page turns paging off.
    pub fn resolve(params: &SearchParams, resource_page_count: Option<u64>, defaults: PageDefaults) -> Self {
        let per_page = match params.per_page {
            Some(PerPage::Count(n)) => n,
            Some(PerPage::All) => defaults.per_page_all,
            None => resource_page_count
                .filter(|n| *n > 0)
                .unwrap_or(defaults.page_count),
        }
        .max(1);

        let current_page = match params.page {
            Some(page) if page < 0 => None,
            Some(page) if page > 0 => Some(page as u64),
            _ => Some(1),
        };

        Self {
            total: 0,
            pages: 0,
            current_page,
            per_page,
        }
    }

    /// Record the total and derive the page count.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self.pages = page_count(total, self.per_page);
        self
    }

    /// Rows to skip for the current page. Pages past the end of what the
    /// database can address clamp to `i64::MAX`, which selects nothing.
    pub fn offset(&self) -> Option<u64> {
        self.current_page.map(|page| {
            (page - 1)
                .checked_mul(self.per_page)
                .map_or(MAX_OFFSET, |offset| offset.min(MAX_OFFSET))
        })
    }
}

/// `0` for an empty result, else `(total - 1) / per_page + 1`.
pub fn page_count(total: u64, per_page: u64) -> u64 {
    if total == 0 || per_page == 0 {
        return 0;
    }
    (total - 1) / per_page + 1
}

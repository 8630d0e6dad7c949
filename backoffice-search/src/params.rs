//! Search request parameters.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::compiler::Operation;
use crate::composite::CompositeKeys;
use crate::filter::FilterValues;

static FILTER_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^filters\[(.+?)\]\.(Value|Operation)(\[\])?$").expect("Invalid filter param regex")
});

/// Requested page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerPage {
    Count(u64),
    /// Every record, up to the configured ceiling
    All,
}

/// Everything a request can say about a search.
///
/// # Examples
///
/// ```
/// use backoffice_search::{PerPage, SearchParams};
///
/// let params = SearchParams::from_query_pairs([
///     ("scopes", "Active"),
///     ("filters[Age].Value", "30"),
///     ("filters[Age].Operation", "gt"),
///     ("keyword", "jin"),
///     ("order_by", "name_desc"),
///     ("page", "2"),
///     ("per_page", "all"),
/// ]);
///
/// assert_eq!(params.scopes, ["Active"]);
/// assert_eq!(params.filters["Age"].values, ["30"]);
/// assert_eq!(params.page, Some(2));
/// assert_eq!(params.per_page, Some(PerPage::All));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Scope names to activate
    pub scopes: Vec<String>,
    /// Filter values by filter name
    pub filters: BTreeMap<String, FilterValues>,
    pub keyword: Option<String>,
    pub order_by: Option<String>,
    /// 1-based page; negative disables paging
    pub page: Option<i64>,
    pub per_page: Option<PerPage>,
    /// Row limit overriding the page size
    pub limit: Option<u64>,
    pub composite_keys: CompositeKeys,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse decoded query string (or form) pairs. Unknown keys and values
    /// that don't parse are ignored.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.bind(key.as_ref(), value.as_ref());
        }
        params
    }

    fn bind(&mut self, key: &str, value: &str) {
        if let Some(caps) = FILTER_PARAM.captures(key) {
            let entry = self.filters.entry(caps[1].to_string()).or_default();
            if &caps[2] == "Value" {
                entry.values.push(value.to_string());
            } else {
                entry.operation = Operation::parse(value);
            }
            return;
        }

        if self.composite_keys.bind_param(key, value) {
            return;
        }

        match key {
            "scopes" | "scopes[]" => {
                if !value.is_empty() {
                    self.scopes.push(value.to_string());
                }
            }
            "keyword" => self.keyword = Some(value.to_string()).filter(|k| !k.is_empty()),
            "order_by" => self.order_by = Some(value.to_string()).filter(|o| !o.is_empty()),
            "page" => self.page = value.parse().ok(),
            "per_page" => {
                self.per_page = if value == "all" {
                    Some(PerPage::All)
                } else {
                    value.parse().ok().filter(|n| *n > 0).map(PerPage::Count)
                }
            }
            "limit" => self.limit = value.parse().ok(),
            _ => {}
        }
    }

    /// Activate a scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Set values for a filter.
    pub fn with_filter(mut self, name: impl Into<String>, values: FilterValues) -> Self {
        self.filters.insert(name.into(), values);
        self
    }

    /// Search for `keyword`.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Order by an attribute, `_desc` suffix for descending.
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Request a 1-based page.
    pub fn with_page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page size.
    pub fn with_per_page(mut self, per_page: PerPage) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Cap the row count.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

//! Composite primary keys.
//!
//! A route carries one primary key value, which is ambiguous for models
//! keyed on several columns. The remaining key columns travel as query
//! parameters named `primary_key[<table>_<column>]`; they are collected per
//! request into [`CompositeKeys`] and turned into extra conditions right
//! before the record lookup.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::query::SearchQuery;
use crate::schema::ModelSchema;

/// Request flag disabling composite key conditions.
pub const DISABLE_COMPOSITE_PRIMARY_KEY_MODE: &str = "composite_primary_key:query:disable";

static PRIMARY_KEY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^primary_key\[.+_.+\]$").expect("Invalid primary key regex"));

/// Request-scoped composite key values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeKeys {
    values: BTreeMap<String, String>,
    disabled: bool,
}

impl CompositeKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// The parameter name carrying `table.column`.
    pub fn param_name(table: &str, column: &str) -> String {
        format!("primary_key[{table}_{column}]")
    }

    /// Record a query parameter if it is a composite key parameter. The
    /// disable flag only counts with a non-empty value.
    ///
    /// Returns `true` if the parameter was taken.
    pub fn bind_param(&mut self, name: &str, value: &str) -> bool {
        if name == DISABLE_COMPOSITE_PRIMARY_KEY_MODE {
            if !value.is_empty() {
                self.disabled = true;
            }
            return true;
        }
        if PRIMARY_KEY_PARAM.is_match(name) {
            self.values.insert(name.to_string(), value.to_string());
            return true;
        }
        false
    }

    /// Set a key value for `table.column` directly.
    pub fn set(&mut self, table: &str, column: &str, value: impl Into<String>) {
        self.values.insert(Self::param_name(table, column), value.into());
    }

    /// The bound value for `table.column`.
    pub fn get(&self, table: &str, column: &str) -> Option<&str> {
        self.values.get(&Self::param_name(table, column)).map(String::as_str)
    }

    /// Skip key conditions for this request.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Whether no key values are bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add `table.column = value` for every primary field of `schema` with a
    /// bound value. Does nothing when disabled.
    pub fn apply(&self, schema: &ModelSchema, query: &mut SearchQuery) {
        if self.disabled {
            return;
        }
        for field in schema.primary_fields() {
            if let Some(value) = self.get(&schema.table, &field.column) {
                debug!(table = %schema.table, column = %field.column, "composite primary key condition");
                let col = query.column(&field.column);
                query.and_where(col.eq(value));
            }
        }
    }
}

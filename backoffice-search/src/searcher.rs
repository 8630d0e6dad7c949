//! The search pipeline.
//!
//! For one request, in order:
//!
//! 1. default scopes, unless an activated scope shares their group
//! 2. activated scopes
//! 3. filters (AND-ed)
//! 4. `order_by`, when it is a plain identifier naming a field
//! 5. keyword search over the search attributes (OR-ed), or the custom
//!    search handler
//!
//! The total is counted over the result of these steps before the page
//! window is applied.

use backoffice_roles::Principal;
use regex::Regex;
use sea_query::{Alias, Expr, Order, Query, SelectStatement};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::{debug, instrument};

use crate::compiler::{ConditionCompiler, FieldSearch};
use crate::error::{SearchError, SearchResult};
use crate::executor::{QueryExecutor, Record};
use crate::filter::{Filter, FilterArgument};
use crate::pagination::{PageDefaults, Pagination};
use crate::params::SearchParams;
use crate::query::SearchQuery;
use crate::schema::{FieldKind, ModelSchema, SchemaRegistry};
use crate::scope::Scope;

static ORDER_BY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("Invalid order_by regex"));

const DESC_SUFFIX: &str = "_desc";

/// Replaces keyword search: receives the query and the keyword.
pub type SearchHandler = Arc<dyn Fn(&mut SearchQuery, &str) + Send + Sync>;

/// Per-resource search configuration.
#[derive(Clone, Default)]
pub struct SearchConfig {
    pub scopes: Vec<Scope>,
    pub filters: Vec<Filter>,
    /// Keyword search attribute paths; `None` searches the schema's
    /// non-key string fields
    pub search_attrs: Option<Vec<String>>,
    /// Attributes `order_by` may name; empty allows any field
    pub sortable_attrs: Vec<String>,
    pub search_handler: Option<SearchHandler>,
    /// Resource page size
    pub page_count: Option<u64>,
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scope, replacing one with the same name.
    pub fn add_scope(&mut self, scope: Scope) {
        self.scopes.retain(|s| s.name != scope.name);
        self.scopes.push(scope);
    }

    /// Add a filter, replacing one with the same name.
    pub fn add_filter(&mut self, filter: Filter) {
        self.filters.retain(|f| f.name != filter.name);
        self.filters.push(filter);
    }

    /// Find a scope by name.
    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.name == name)
    }

    /// Find a filter by name.
    pub fn filter(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.name == name)
    }

    /// Attribute paths searched by keyword.
    pub fn set_search_attrs<I, S>(&mut self, attrs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_attrs = Some(attrs.into_iter().map(Into::into).collect());
    }

    /// Replace keyword search with `handler`.
    pub fn set_search_handler<F>(&mut self, handler: F)
    where
        F: Fn(&mut SearchQuery, &str) + Send + Sync + 'static,
    {
        self.search_handler = Some(Arc::new(handler));
    }

    /// Keyword search attributes for `schema`.
    pub fn search_attrs_for(&self, schema: &ModelSchema) -> Vec<String> {
        match &self.search_attrs {
            Some(attrs) => attrs.clone(),
            None => schema.string_fields().map(|f| f.name.clone()).collect(),
        }
    }

    /// Scopes offered to `principal`, excluding default scopes.
    pub fn visible_scopes<'a>(&'a self, principal: &'a Principal) -> impl Iterator<Item = &'a Scope> + 'a {
        self.scopes
            .iter()
            .filter(move |s| !s.default && s.is_visible(principal))
    }

    /// Filters offered to `principal`.
    pub fn visible_filters<'a>(&'a self, principal: &'a Principal) -> impl Iterator<Item = &'a Filter> + 'a {
        self.filters.iter().filter(move |f| f.is_visible(principal))
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("scopes", &self.scopes)
            .field("filters", &self.filters)
            .field("search_attrs", &self.search_attrs)
            .field("sortable_attrs", &self.sortable_attrs)
            .field("custom_search_handler", &self.search_handler.is_some())
            .field("page_count", &self.page_count)
            .finish()
    }
}

/// Search-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub page: PageDefaults,
    /// chrono formats tried after RFC 3339 for time keywords
    pub time_formats: Vec<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            page: PageDefaults::default(),
            time_formats: vec![
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M".to_string(),
                "%Y-%m-%d".to_string(),
            ],
        }
    }
}

/// A compiled search, before execution.
#[derive(Debug, Clone)]
pub struct SearchPlan {
    /// Filtered and ordered select, without the page window
    pub query: SearchQuery,
    /// `SELECT COUNT(*)` over the filtered select
    pub count: SelectStatement,
    /// Page and page size; total still unknown
    pub pagination: Pagination,
    /// Row limit overriding the page size
    pub limit: Option<u64>,
}

impl SearchPlan {
    /// The select with the page window for `pagination` applied.
    pub fn page_statement(&self, pagination: &Pagination) -> SelectStatement {
        let mut statement = self.query.statement().clone();
        if let Some(offset) = pagination.offset() {
            statement
                .limit(self.limit.unwrap_or(pagination.per_page))
                .offset(offset);
        }
        statement
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub records: Vec<Record>,
    pub pagination: Pagination,
}

/// Runs searches for one model.
#[derive(Clone, Copy)]
pub struct Searcher<'a> {
    schema: &'a Arc<ModelSchema>,
    config: &'a SearchConfig,
    registry: &'a SchemaRegistry,
    settings: &'a SearchSettings,
}

impl<'a> Searcher<'a> {
    pub fn new(
        schema: &'a Arc<ModelSchema>,
        config: &'a SearchConfig,
        registry: &'a SchemaRegistry,
        settings: &'a SearchSettings,
    ) -> Self {
        Self {
            schema,
            config,
            registry,
            settings,
        }
    }

    fn compiler(&self) -> ConditionCompiler<'a> {
        ConditionCompiler::new(self.registry, &self.settings.time_formats)
    }

    /// Compile `params` without running anything.
    pub fn build(&self, params: &SearchParams) -> SearchPlan {
        let mut query = SearchQuery::new(self.schema);

        self.apply_scopes(&mut query, params);
        self.apply_filters(&mut query, params);
        self.apply_keyword(&mut query, params);

        let count = Query::select()
            .expr(Expr::cust("COUNT(*)"))
            .from_subquery(query.statement().clone(), Alias::new("matched"))
            .to_owned();

        self.apply_order(&mut query, params);

        SearchPlan {
            query,
            count,
            pagination: Pagination::resolve(params, self.config.page_count, self.settings.page),
            limit: params.limit,
        }
    }

    /// Count, then fetch the requested page.
    #[instrument(skip(self, executor, params), fields(model = %self.schema.name))]
    pub async fn find(&self, executor: &dyn QueryExecutor, params: &SearchParams) -> SearchResult<SearchPage> {
        let plan = self.build(params);
        let total = executor.count(&plan.count).await?;
        let pagination = plan.pagination.with_total(total);
        let statement = plan.page_statement(&pagination);
        let records = executor.fetch_all(self.schema, &statement).await?;

        debug!(total, returned = records.len(), "search finished");
        Ok(SearchPage { records, pagination })
    }

    /// Fetch one record by its primary key, narrowed by any composite key
    /// values bound in `params`.
    #[instrument(skip(self, executor, params), fields(model = %self.schema.name))]
    pub async fn find_one(&self, executor: &dyn QueryExecutor, primary: &str, params: &SearchParams) -> SearchResult<Record> {
        let mut query = SearchQuery::new(self.schema);

        let key = self
            .schema
            .primary_fields()
            .next()
            .ok_or_else(|| SearchError::NotFound(format!("{} has no primary key", self.schema.name)))?;
        let col = query.column(&key.column);
        match key.kind {
            FieldKind::Integer => match primary.parse::<i64>() {
                Ok(id) => query.and_where(col.eq(id)),
                Err(_) => return Err(SearchError::NotFound(format!("{} {primary}", self.schema.name))),
            },
            _ => query.and_where(col.eq(primary)),
        };

        params.composite_keys.apply(self.schema, &mut query);

        let mut statement = query.into_statement();
        statement.limit(1);
        executor
            .fetch_all(self.schema, &statement)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::NotFound(format!("{} {primary}", self.schema.name)))
    }

    fn apply_scopes(&self, query: &mut SearchQuery, params: &SearchParams) {
        let active: Vec<&Scope> = params
            .scopes
            .iter()
            .filter_map(|name| self.config.scopes.iter().find(|s| s.name == *name && !s.default))
            .collect();

        for scope in self.config.scopes.iter().filter(|s| s.default) {
            let overridden = scope.group.is_some() && active.iter().any(|a| a.group == scope.group);
            if !overridden {
                scope.apply(query);
            }
        }

        for scope in active {
            scope.apply(query);
        }
    }

    fn apply_filters(&self, query: &mut SearchQuery, params: &SearchParams) {
        for (name, values) in &params.filters {
            let Some(filter) = self.config.filter(name) else {
                debug!(filter = %name, "ignoring unknown filter");
                continue;
            };
            let argument = FilterArgument {
                filter,
                values,
                schema: self.schema,
                compiler: self.compiler(),
            };
            filter.apply(query, &argument);
        }
    }

    fn apply_order(&self, query: &mut SearchQuery, params: &SearchParams) {
        let Some(order_by) = params.order_by.as_deref() else {
            return;
        };
        if !ORDER_BY.is_match(order_by) {
            debug!(order_by, "ignoring malformed order_by");
            return;
        }

        let (name, order) = match order_by.strip_suffix(DESC_SUFFIX) {
            Some(name) => (name, Order::Desc),
            None => (order_by, Order::Asc),
        };
        let Some(field) = self.schema.lookup_field(name) else {
            debug!(order_by, "ignoring order_by on unknown field");
            return;
        };
        if !self.config.sortable_attrs.is_empty() && !self.config.sortable_attrs.contains(&field.name) {
            debug!(order_by, "ignoring order_by on unsortable field");
            return;
        }

        let table = query.table().to_string();
        query
            .statement_mut()
            .order_by((Alias::new(table), Alias::new(&field.column)), order);
    }

    fn apply_keyword(&self, query: &mut SearchQuery, params: &SearchParams) {
        let Some(keyword) = params.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
            return;
        };

        if let Some(handler) = &self.config.search_handler {
            handler(query, keyword);
            return;
        }

        let fields: Vec<FieldSearch> = self
            .config
            .search_attrs_for(self.schema)
            .into_iter()
            .map(FieldSearch::contains)
            .collect();
        if let Some(clause) = self.compiler().compile(self.schema, &fields, keyword) {
            clause.apply(query);
        }
    }
}

//! Index page filters.
//!
//! A filter is a named input on the index page. Its request values arrive as
//! `filters[<Name>].Value` (repeatable) and `filters[<Name>].Operation`.
//! Without a custom handler the filter name is used as an attribute path and
//! compiled like a keyword search restricted to that one attribute.

use backoffice_roles::Principal;
use std::fmt;
use std::sync::Arc;

use crate::compiler::{ConditionCompiler, FieldSearch, Operation};
use crate::query::SearchQuery;
use crate::schema::ModelSchema;
use crate::scope::VisiblePredicate;

/// Input kind of a filter, deciding its default operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKind {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    SelectOne,
    /// Several values, matched as a list
    SelectMany,
}

impl FilterKind {
    fn default_operation(&self) -> Operation {
        match self {
            FilterKind::String => Operation::Contains,
            FilterKind::Number | FilterKind::Boolean | FilterKind::Date | FilterKind::SelectOne => Operation::Equal,
            FilterKind::SelectMany => Operation::In,
        }
    }
}

/// Kind and accepted operations of a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub kind: FilterKind,
    /// Operations the filter accepts; empty accepts any
    pub operations: Vec<Operation>,
}

/// Values a request sent for one filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterValues {
    pub values: Vec<String>,
    pub operation: Option<Operation>,
}

impl FilterValues {
    /// One value with the filter's default operation.
    pub fn single(value: impl Into<String>) -> Self {
        Self {
            values: vec![value.into()],
            operation: None,
        }
    }

    /// Request `operation`.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// First non-empty value.
    pub fn first(&self) -> Option<&str> {
        self.values.iter().map(String::as_str).find(|v| !v.is_empty())
    }
}

/// What a filter handler receives besides the query.
#[derive(Clone, Copy)]
pub struct FilterArgument<'a> {
    pub filter: &'a Filter,
    pub values: &'a FilterValues,
    pub schema: &'a Arc<ModelSchema>,
    pub compiler: ConditionCompiler<'a>,
}

/// Custom filter handler.
pub type FilterHandler = Arc<dyn for<'a> Fn(&mut SearchQuery, &FilterArgument<'a>) + Send + Sync>;

/// A named filter.
#[derive(Clone)]
pub struct Filter {
    pub name: String,
    pub label: Option<String>,
    pub config: FilterConfig,
    handler: Option<FilterHandler>,
    visible: Option<VisiblePredicate>,
}

impl Filter {
    /// A filter on the attribute path `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            config: FilterConfig::default(),
            handler: None,
            visible: None,
        }
    }

    /// Set the label shown to users.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the input kind.
    pub fn with_kind(mut self, kind: FilterKind) -> Self {
        self.config.kind = kind;
        self
    }

    /// Accept only `operations`.
    pub fn with_operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.config.operations = operations.into_iter().collect();
        self
    }

    /// Apply values with `handler` instead of a field search.
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: for<'a> Fn(&mut SearchQuery, &FilterArgument<'a>) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Show the filter only when `visible` passes.
    pub fn with_visible<F>(mut self, visible: F) -> Self
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(visible));
        self
    }

    /// Whether `principal` sees the filter.
    pub fn is_visible(&self, principal: &Principal) -> bool {
        self.visible.as_ref().map(|v| v(principal)).unwrap_or(true)
    }

    /// The operation used for `values`: the requested one when the filter
    /// accepts it, else the kind's default.
    pub fn operation_for(&self, values: &FilterValues) -> Operation {
        match values.operation {
            Some(op) if self.config.operations.is_empty() || self.config.operations.contains(&op) => op,
            _ => self.config.kind.default_operation(),
        }
    }

    /// Run the custom handler, or the default attribute-path handler.
    pub fn apply(&self, query: &mut SearchQuery, argument: &FilterArgument<'_>) {
        match &self.handler {
            Some(handler) => handler(query, argument),
            None => self.apply_default(query, argument),
        }
    }

    fn apply_default(&self, query: &mut SearchQuery, argument: &FilterArgument<'_>) {
        let operation = self.operation_for(argument.values);
        let keyword = if operation == Operation::In {
            argument
                .values
                .values
                .iter()
                .filter(|v| !v.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(",")
        } else {
            argument.values.first().unwrap_or_default().to_string()
        };

        let fields = [FieldSearch::new(self.name.clone(), operation)];
        if let Some(clause) = argument.compiler.compile(argument.schema, &fields, &keyword) {
            clause.apply(query);
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("custom_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

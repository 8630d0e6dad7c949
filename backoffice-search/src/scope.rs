//! Named query scopes.

use backoffice_roles::Principal;
use std::fmt;
use std::sync::Arc;

use crate::query::SearchQuery;

/// Refines a search query in place.
pub type QueryHandler = Arc<dyn Fn(&mut SearchQuery) + Send + Sync>;

/// Decides whether a scope or filter is offered to a principal.
pub type VisiblePredicate = Arc<dyn Fn(&Principal) -> bool + Send + Sync>;

/// A named refinement, e.g. "Active" or "Archived".
///
/// Default scopes always apply, unless a scope activated by the request
/// shares their group. Scopes sharing a group are alternatives: at most one
/// of them is expected to be active.
///
/// # Examples
///
/// ```
/// use backoffice_search::Scope;
///
/// let active = Scope::new("Active", |q| {
///     let col = q.column("active");
///     q.and_where(col.eq(true));
/// })
/// .in_group("Status")
/// .as_default();
///
/// assert!(active.default);
/// assert_eq!(active.group.as_deref(), Some("Status"));
/// ```
#[derive(Clone)]
pub struct Scope {
    pub name: String,
    pub label: Option<String>,
    pub group: Option<String>,
    pub default: bool,
    handler: QueryHandler,
    visible: Option<VisiblePredicate>,
}

impl Scope {
    /// A scope applying `handler` when active.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut SearchQuery) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            label: None,
            group: None,
            default: false,
            handler: Arc::new(handler),
            visible: None,
        }
    }

    /// Set the label shown to users.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Make scopes of the same group exclusive.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Apply this scope to every search.
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    /// Show the scope only when `visible` passes.
    pub fn with_visible<F>(mut self, visible: F) -> Self
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(visible));
        self
    }

    /// Run the handler.
    pub fn apply(&self, query: &mut SearchQuery) {
        (self.handler)(query)
    }

    /// Check whether the scope is offered to `principal`.
    pub fn is_visible(&self, principal: &Principal) -> bool {
        self.visible.as_ref().map(|v| v(principal)).unwrap_or(true)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

//! Permission delegates.

use backoffice_roles::PermissionMode;
use std::fmt;
use std::sync::Arc;

use crate::context::PermissionContext;

/// What the groups say about a target for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupVerdict {
    /// Group permissions are off, or the target skips group control
    NotApplicable,
    Allowed,
    Denied,
}

impl GroupVerdict {
    /// `Allowed` or `Denied`.
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            GroupVerdict::Allowed
        } else {
            GroupVerdict::Denied
        }
    }

    /// The decision when no role rule applies.
    pub fn allows_by_default(&self) -> bool {
        !matches!(self, GroupVerdict::Denied)
    }
}

/// Custom permission decision.
pub type PermissionFn = Arc<dyn Fn(PermissionMode, &PermissionContext, GroupVerdict) -> bool + Send + Sync>;

/// Decides for a menu or route that carries no role rule of its own.
#[derive(Clone)]
pub enum Permissioner {
    /// Ask the registered resource with this name
    Resource(String),
    Custom(PermissionFn),
}

impl Permissioner {
    /// Decide by the named resource's rules.
    pub fn resource(name: impl Into<String>) -> Self {
        Permissioner::Resource(name.into())
    }

    /// Decide with a closure.
    pub fn custom<F>(decide: F) -> Self
    where
        F: Fn(PermissionMode, &PermissionContext, GroupVerdict) -> bool + Send + Sync + 'static,
    {
        Permissioner::Custom(Arc::new(decide))
    }
}

impl fmt::Debug for Permissioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permissioner::Resource(name) => f.debug_tuple("Resource").field(name).finish(),
            Permissioner::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

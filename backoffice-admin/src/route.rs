//! Route authorization.
//!
//! Routers call [`RouteGuard::authorize`] before dispatching. Denied
//! routes answer 404 so hidden pages look like missing ones.

use backoffice_roles::PermissionMode;
use tracing::debug;

use crate::admin::Admin;
use crate::context::PermissionContext;
use crate::permissioner::{GroupVerdict, Permissioner};

/// Permission settings of one route.
#[derive(Debug, Clone, Default)]
pub struct RouteConfig {
    /// Resource the route belongs to
    pub resource: Option<String>,
    /// Checked instead of the mode derived from the HTTP method
    pub permission_mode: Option<PermissionMode>,
    /// Overrides the resource as the decider
    pub permissioner: Option<Permissioner>,
}

impl RouteConfig {
    /// A route belonging to `resource`.
    pub fn for_resource(resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            ..Default::default()
        }
    }

    /// Check `mode` whatever the HTTP method.
    pub fn with_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = Some(mode);
        self
    }

    /// Decide through `permissioner` instead of the resource.
    pub fn with_permissioner(mut self, permissioner: Permissioner) -> Self {
        self.permissioner = Some(permissioner);
        self
    }
}

/// Outcome of a route check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    NotFound,
}

impl RouteDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RouteDecision::Allow)
    }

    /// HTTP status to answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            RouteDecision::Allow => 200,
            RouteDecision::NotFound => 404,
        }
    }
}

/// Checks routes against an admin's permissions.
#[derive(Clone, Copy)]
pub struct RouteGuard<'a> {
    admin: &'a Admin,
}

impl<'a> RouteGuard<'a> {
    pub fn new(admin: &'a Admin) -> Self {
        Self { admin }
    }

    /// Decide whether the request may reach `route`. Routes with neither a
    /// resource nor a permissioner are open. Unknown methods are checked as
    /// reads.
    pub fn authorize(&self, ctx: &PermissionContext, method: &str, route: &RouteConfig) -> RouteDecision {
        let permissioner = match (&route.permissioner, &route.resource) {
            (Some(permissioner), _) => permissioner.clone(),
            (None, Some(resource)) => Permissioner::resource(resource.as_str()),
            (None, None) => return RouteDecision::Allow,
        };

        let mode = route
            .permission_mode
            .or_else(|| PermissionMode::from_http_method(method))
            .unwrap_or(PermissionMode::Read);

        let resolver = self.admin.resolver();
        let verdict = match route.resource.as_deref() {
            Some(resource) if ctx.is_group_enabled() => match resolver.resource_verdict(ctx, resource) {
                GroupVerdict::NotApplicable => GroupVerdict::Allowed,
                verdict => verdict,
            },
            _ => GroupVerdict::NotApplicable,
        };

        let allowed = resolver.permissioner_allows(ctx, mode, &permissioner, verdict);
        debug!(principal = %ctx.principal().id, method, %mode, resource = ?route.resource, allowed, "route authorized");

        if allowed {
            RouteDecision::Allow
        } else {
            RouteDecision::NotFound
        }
    }
}

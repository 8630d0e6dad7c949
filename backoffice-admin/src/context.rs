//! Per-request permission context.
//!
//! Built once per request from the principal, the roles the role registry
//! derives for it, and the groups it belongs to. Group mode is snapshotted
//! when the context is built so that one request sees one consistent
//! answer even if the switch flips meanwhile.

use backoffice_groups::{Group, GroupSet};
use backoffice_roles::Principal;

use crate::inflect;

/// Who is asking, with everything permission checks need.
#[derive(Debug, Clone)]
pub struct PermissionContext {
    principal: Principal,
    roles: Vec<String>,
    groups: GroupSet,
    group_enabled: bool,
}

impl PermissionContext {
    /// A context using only the principal's own roles and no groups.
    pub fn new(principal: Principal, group_enabled: bool) -> Self {
        let roles = principal.roles().to_vec();
        Self {
            principal,
            roles,
            groups: GroupSet::default(),
            group_enabled,
        }
    }

    /// Replace the effective roles, e.g. with `RoleRegistry::matched_roles`.
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Attach the principal's groups.
    pub fn with_groups(mut self, groups: Vec<Group>) -> Self {
        self.groups = GroupSet::new(groups);
        self
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Effective roles.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Groups the principal belongs to.
    pub fn groups(&self) -> &GroupSet {
        &self.groups
    }

    /// Group mode as it was when the context was built.
    pub fn is_group_enabled(&self) -> bool {
        self.group_enabled
    }

    /// Whether the principal's groups grant `name` (exactly or by its
    /// singular form).
    pub fn resource_allowed_by_group(&self, name: &str) -> bool {
        let id = &self.principal.id;
        self.groups.allows_resource(id, name) || self.groups.allows_resource(id, &inflect::singular(name))
    }

    /// Whether the principal's groups grant `action` on `resource`.
    pub fn action_allowed_by_group(&self, resource: &str, action: &str) -> bool {
        let id = &self.principal.id;
        self.groups.allows_action(id, resource, action)
            || self.groups.allows_action(id, &inflect::singular(resource), action)
    }
}

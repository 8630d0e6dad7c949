//! Group domain models
//!
//! A group names a set of principals and the resources (and resource
//! actions) its members may use while group permissions are enabled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{GroupError, GroupResult};
use crate::members::MemberSet;

/// Group identifier assigned by the store.
pub type GroupId = i64;

/// Allow flag for a single action of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceActionPermission {
    /// Action name, e.g. `Publish`
    pub name: String,
    /// Whether members may run the action
    pub allowed: bool,
}

/// Allow flag for a resource (or independent menu), with per-action flags.
///
/// Action flags only count while the resource itself is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePermission {
    /// Resource or menu name
    pub name: String,
    /// Whether members may use the resource
    pub allowed: bool,
    /// Per-action flags
    #[serde(default)]
    pub actions: Vec<ResourceActionPermission>,
}

impl ResourcePermission {
    /// An allowed resource with no action grants.
    pub fn allowed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed: true,
            actions: Vec::new(),
        }
    }

    /// A resource entry explicitly marked as not allowed.
    pub fn denied(name: impl Into<String>) -> Self {
        Self {
            allowed: false,
            ..Self::allowed(name)
        }
    }

    /// Grant an action on this resource.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(ResourceActionPermission {
            name: action.into(),
            allowed: true,
        });
        self
    }

    fn allows_action(&self, action: &str) -> bool {
        self.allowed && self.actions.iter().any(|a| a.allowed && a.name == action)
    }
}

/// A permission group.
///
/// # Examples
///
/// ```
/// use backoffice_groups::{Group, ResourcePermission};
///
/// let group = Group::new("Editors")
///     .with_member("42")
///     .with_resource(ResourcePermission::allowed("Product").with_action("Publish"));
///
/// assert!(group.includes_member("42"));
/// assert!(group.has_resource_permission("Product"));
/// assert!(group.has_resource_action_permission("Product", "Publish"));
/// assert!(!group.has_resource_action_permission("Product", "Delete"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Store-assigned ID; `0` until created
    pub id: GroupId,

    /// Display name, never blank
    pub name: String,

    /// Principal identifiers in this group
    #[serde(default)]
    pub members: MemberSet,

    /// Resource allow-list, in the order it was configured
    #[serde(default)]
    pub resource_permissions: Vec<ResourcePermission>,

    /// When the group was created
    pub created_at: DateTime<Utc>,

    /// When the group was last written
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Creates an unsaved group with no members and no grants.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            members: MemberSet::new(),
            resource_permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a member.
    pub fn with_member(mut self, principal_id: impl Into<String>) -> Self {
        self.members.insert(principal_id);
        self
    }

    /// Add a resource entry.
    pub fn with_resource(mut self, permission: ResourcePermission) -> Self {
        self.resource_permissions.push(permission);
        self
    }

    /// Reject groups with a blank name.
    pub fn validate(&self) -> GroupResult<()> {
        if self.name.trim().is_empty() {
            return Err(GroupError::Validation("Name can't be blank".to_string()));
        }
        Ok(())
    }

    /// Whole-identifier membership test.
    pub fn includes_member(&self, principal_id: &str) -> bool {
        self.members.contains(principal_id)
    }

    /// Check whether the group allows a resource or menu by name.
    pub fn has_resource_permission(&self, name: &str) -> bool {
        self.resource_permissions
            .iter()
            .any(|p| p.allowed && p.name == name)
    }

    /// Check whether the group allows an action of an allowed resource.
    pub fn has_resource_action_permission(&self, resource: &str, action: &str) -> bool {
        self.resource_permissions
            .iter()
            .any(|p| p.name == resource && p.allows_action(action))
    }

    /// Names of all allowed resources.
    pub fn allowed_resource_names(&self) -> impl Iterator<Item = &str> {
        self.resource_permissions
            .iter()
            .filter(|p| p.allowed)
            .map(|p| p.name.as_str())
    }
}

/// The groups visible to one request, answering allow questions for a
/// principal.
///
/// Only groups the principal belongs to and that carry at least one resource
/// entry take part; a grant from any one of them is enough.
#[derive(Debug, Clone, Default)]
pub struct GroupSet {
    groups: Vec<Group>,
}

impl GroupSet {
    /// Wrap a list of groups.
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    /// All wrapped groups.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Groups the principal belongs to.
    pub fn for_principal<'a>(&'a self, principal_id: &'a str) -> impl Iterator<Item = &'a Group> + 'a {
        self.groups
            .iter()
            .filter(move |g| !g.resource_permissions.is_empty() && g.includes_member(principal_id))
    }

    /// Check if any of the principal's groups allows the resource.
    pub fn allows_resource(&self, principal_id: &str, resource: &str) -> bool {
        self.for_principal(principal_id)
            .any(|g| g.has_resource_permission(resource))
    }

    /// Check if any of the principal's groups allows the action.
    pub fn allows_action(&self, principal_id: &str, resource: &str, action: &str) -> bool {
        self.for_principal(principal_id)
            .any(|g| g.has_resource_action_permission(resource, action))
    }

    /// Union of resource names the principal's groups allow.
    pub fn allowed_resources(&self, principal_id: &str) -> BTreeSet<String> {
        self.for_principal(principal_id)
            .flat_map(|g| g.allowed_resource_names().map(str::to_string))
            .collect()
    }
}

impl From<Vec<Group>> for GroupSet {
    fn from(groups: Vec<Group>) -> Self {
        Self::new(groups)
    }
}

//! # Role Rules
//!
//! A [`Permission`] is an allow-list and a deny-list of role names per
//! [`PermissionMode`]. Rules are attached to menus, resources, actions and
//! metas; a rule on a target is authoritative for that target.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::mode::PermissionMode;

/// Role name matching every principal.
pub const ANYONE: &str = "*";

/// Allow/deny role lists keyed by mode.
///
/// Evaluation order for a mode:
/// 1. any of the principal's roles (or [`ANYONE`]) on the deny list → denied
/// 2. no allow list defined for any mode → allowed
/// 3. any of the principal's roles (or [`ANYONE`]) on the mode's allow list → allowed
/// 4. otherwise denied
///
/// # Example
///
/// ```
/// use backoffice_roles::{Permission, PermissionMode, CRUD};
///
/// let rule = Permission::allow(&CRUD, ["admin"]).and_deny(&[PermissionMode::Delete], ["auditor"]);
///
/// assert!(rule.has_permission(PermissionMode::Read, &["admin"]));
/// assert!(!rule.has_permission(PermissionMode::Read, &["editor"]));
/// assert!(!rule.has_permission(PermissionMode::Delete, &["admin", "auditor"]));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    allowed: BTreeMap<PermissionMode, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    denied: BTreeMap<PermissionMode, Vec<String>>,
}

impl Permission {
    /// Create an empty rule, which allows everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule allowing `roles` for each of `modes`.
    pub fn allow<I, S>(modes: &[PermissionMode], roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().and_allow(modes, roles)
    }

    /// Create a rule denying `roles` for each of `modes`.
    pub fn deny<I, S>(modes: &[PermissionMode], roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().and_deny(modes, roles)
    }

    /// Add allowed roles for each of `modes`.
    pub fn and_allow<I, S>(mut self, modes: &[PermissionMode], roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: Vec<String> = roles.into_iter().map(Into::into).collect();
        for mode in modes {
            push_unique(self.allowed.entry(*mode).or_default(), &roles);
        }
        self
    }

    /// Add denied roles for each of `modes`.
    pub fn and_deny<I, S>(mut self, modes: &[PermissionMode], roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: Vec<String> = roles.into_iter().map(Into::into).collect();
        for mode in modes {
            push_unique(self.denied.entry(*mode).or_default(), &roles);
        }
        self
    }

    /// Decide whether a principal holding `roles` may act in `mode`.
    ///
    /// # Arguments
    ///
    /// * `mode` - The mode being checked
    /// * `roles` - The principal's role names
    ///
    /// # Returns
    ///
    /// `true` if the rule grants the mode, `false` otherwise
    pub fn has_permission<S: AsRef<str>>(&self, mode: PermissionMode, roles: &[S]) -> bool {
        if let Some(denied) = self.denied.get(&mode) {
            if matches_any(denied, roles) {
                return false;
            }
        }

        if self.allowed.values().all(Vec::is_empty) {
            return true;
        }

        self.allowed
            .get(&mode)
            .map(|allowed| matches_any(allowed, roles))
            .unwrap_or(false)
    }

    /// Merge another rule into a copy of this one.
    pub fn concat(&self, other: &Permission) -> Permission {
        let mut merged = self.clone();
        for (mode, roles) in &other.allowed {
            push_unique(merged.allowed.entry(*mode).or_default(), roles);
        }
        for (mode, roles) in &other.denied {
            push_unique(merged.denied.entry(*mode).or_default(), roles);
        }
        merged
    }

    /// Roles allowed for `mode`.
    pub fn allowed_roles(&self, mode: PermissionMode) -> &[String] {
        self.allowed.get(&mode).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Roles denied for `mode`.
    pub fn denied_roles(&self, mode: PermissionMode) -> &[String] {
        self.denied.get(&mode).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if the rule has no allow or deny entries.
    pub fn is_empty(&self) -> bool {
        self.allowed.values().all(Vec::is_empty) && self.denied.values().all(Vec::is_empty)
    }
}

fn matches_any<S: AsRef<str>>(listed: &[String], roles: &[S]) -> bool {
    listed
        .iter()
        .any(|role| role == ANYONE || roles.iter().any(|r| r.as_ref() == role))
}

fn push_unique(target: &mut Vec<String>, roles: &[String]) {
    for role in roles {
        if !target.contains(role) {
            target.push(role.clone());
        }
    }
}

//! Permission resolution.
//!
//! Decision order for every target:
//!
//! 1. A role [`Permission`](backoffice_roles::Permission) on the target
//!    decides on its own, whatever the groups say.
//! 2. With group mode on, group grants decide for targets that do not skip
//!    group control. A menu with sub-menus is granted when any of its
//!    leaves is.
//! 3. Otherwise the target is allowed. Targets carrying a permissioner are
//!    denied under group mode unless a group grants them.

use backoffice_roles::PermissionMode;
use backoffice_search::Record;
use std::fmt;
use tracing::debug;

use crate::action::Action;
use crate::admin::Admin;
use crate::context::PermissionContext;
use crate::menu::Menu;
use crate::permissioner::{GroupVerdict, Permissioner};

/// What a permission is asked for.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Menu(&'a Menu),
    Resource(&'a str),
    Action { resource: &'a str, action: &'a str },
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Menu(menu) => write!(f, "menu {}", menu.name),
            Target::Resource(name) => write!(f, "resource {name}"),
            Target::Action { resource, action } => write!(f, "action {resource}.{action}"),
        }
    }
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Answers permission questions against an admin's registry.
#[derive(Clone, Copy)]
pub struct PermissionResolver<'a> {
    admin: &'a Admin,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(admin: &'a Admin) -> Self {
        Self { admin }
    }

    /// Whether `mode` on `target` is allowed in `ctx`.
    pub fn is_allowed(&self, ctx: &PermissionContext, mode: PermissionMode, target: Target<'_>) -> bool {
        let allowed = match target {
            Target::Menu(menu) => self.menu_allowed(ctx, mode, menu),
            Target::Resource(name) => self.resource_allowed(ctx, mode, name),
            Target::Action { resource, action } => self.action_allowed(ctx, mode, resource, action),
        };
        debug!(principal = %ctx.principal().id, %mode, %target, allowed, "permission resolved");
        allowed
    }

    /// Whether `menu` is shown and usable in `mode`.
    pub fn menu_allowed(&self, ctx: &PermissionContext, mode: PermissionMode, menu: &Menu) -> bool {
        let mut result = menu.permission.is_none() && menu.permissioner.is_none();

        if ctx.is_group_enabled() {
            for leaf in menu.leaves() {
                let name = leaf.associated_resource.as_deref().unwrap_or(&leaf.name);
                result = self.skips_group_control(name) || ctx.resource_allowed_by_group(name);
                if result {
                    break;
                }
                if self.menu_role_allows(ctx, mode, leaf, result) {
                    result = true;
                    break;
                }
            }
        }

        self.menu_role_allows(ctx, mode, menu, result)
    }

    fn menu_role_allows(&self, ctx: &PermissionContext, mode: PermissionMode, menu: &Menu, previous: bool) -> bool {
        if let Some(permission) = &menu.permission {
            return permission.has_permission(mode, ctx.roles());
        }
        match &menu.permissioner {
            Some(permissioner) => {
                let verdict = if ctx.is_group_enabled() {
                    GroupVerdict::from_allowed(previous)
                } else {
                    GroupVerdict::NotApplicable
                };
                self.permissioner_allows(ctx, mode, permissioner, verdict)
            }
            None => previous,
        }
    }

    /// Ask a permissioner, handing it the group verdict already reached.
    pub fn permissioner_allows(
        &self,
        ctx: &PermissionContext,
        mode: PermissionMode,
        permissioner: &Permissioner,
        verdict: GroupVerdict,
    ) -> bool {
        match permissioner {
            Permissioner::Resource(name) => match self.admin.resource(name) {
                Some(resource) => match resource.permission() {
                    Some(permission) => permission.has_permission(mode, ctx.roles()),
                    None => verdict.allows_by_default(),
                },
                None => false,
            },
            Permissioner::Custom(decide) => decide(mode, ctx, verdict),
        }
    }

    /// Group verdict for a resource in this request.
    pub fn resource_verdict(&self, ctx: &PermissionContext, name: &str) -> GroupVerdict {
        if !ctx.is_group_enabled() || self.skips_group_control(name) {
            return GroupVerdict::NotApplicable;
        }
        GroupVerdict::from_allowed(ctx.resource_allowed_by_group(name))
    }

    /// Whether `mode` on the named resource is allowed. Unknown resources are denied.
    pub fn resource_allowed(&self, ctx: &PermissionContext, mode: PermissionMode, name: &str) -> bool {
        let Some(resource) = self.admin.resource(name) else {
            debug!(resource = name, "unknown resource");
            return false;
        };
        match resource.permission() {
            Some(permission) => permission.has_permission(mode, ctx.roles()),
            None => self.resource_verdict(ctx, name).allows_by_default(),
        }
    }

    /// Whether `mode` on an action is allowed. Unknown actions are denied.
    pub fn action_allowed(&self, ctx: &PermissionContext, mode: PermissionMode, resource: &str, action: &str) -> bool {
        let Some(res) = self.admin.resource(resource) else {
            debug!(resource, "unknown resource");
            return false;
        };
        let Some(act) = res.get_action(action) else {
            debug!(resource, action, "unknown action");
            return false;
        };

        if let Some(permission) = &act.permission {
            return permission.has_permission(mode, ctx.roles());
        }

        let verdict = if !ctx.is_group_enabled() || act.skip_group_control || res.skips_group_control() {
            GroupVerdict::NotApplicable
        } else {
            GroupVerdict::from_allowed(
                ctx.resource_allowed_by_group(resource) && ctx.action_allowed_by_group(resource, action),
            )
        };

        match res.permission() {
            Some(permission) => permission.has_permission(mode, ctx.roles()),
            None => verdict.allows_by_default(),
        }
    }

    /// Actions of `resource` offered in `mode` (`"index"`, `"batch"`,
    /// `"edit"`...) for `records`.
    pub fn allowed_actions(
        &self,
        ctx: &PermissionContext,
        resource: &str,
        mode: &str,
        records: &[Record],
    ) -> Vec<&'a Action> {
        let Some(res) = self.admin.resource(resource) else {
            return Vec::new();
        };
        res.actions()
            .iter()
            .filter(|action| action.has_mode(mode))
            .filter(|action| action.is_visible(records, ctx))
            .filter(|action| self.action_allowed(ctx, action.permission_mode(), resource, &action.name))
            .collect()
    }

    /// The subset of `attrs` whose meta rule allows at least one of
    /// `modes`. Attributes without a meta or rule are kept.
    pub fn allowed_attrs<S: AsRef<str>>(
        &self,
        ctx: &PermissionContext,
        resource: &str,
        attrs: &[S],
        modes: &[PermissionMode],
    ) -> Vec<String> {
        let Some(res) = self.admin.resource(resource) else {
            return Vec::new();
        };
        attrs
            .iter()
            .map(|attr| attr.as_ref())
            .filter(|attr| match res.get_meta(attr).and_then(|m| m.permission.as_ref()) {
                Some(permission) => modes.iter().any(|mode| permission.has_permission(*mode, ctx.roles())),
                None => true,
            })
            .map(String::from)
            .collect()
    }

    /// Top-level menus the principal may read, hiding invisible ones.
    pub fn visible_menus(&self, ctx: &PermissionContext) -> Vec<&'a Menu> {
        self.admin
            .menus()
            .iter()
            .filter(|menu| !menu.invisible && self.menu_allowed(ctx, PermissionMode::Read, menu))
            .collect()
    }

    fn skips_group_control(&self, name: &str) -> bool {
        self.admin
            .resource(name)
            .is_some_and(|resource| resource.skips_group_control())
    }
}

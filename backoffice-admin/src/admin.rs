//! The admin registry.
//!
//! Built with `&mut` at startup (schemas, resources, menus, roles), then
//! shared behind an `Arc`. The group-mode switch is the only state that
//! changes afterwards.

use backoffice_groups::GroupStore;
use backoffice_roles::{Permission, PermissionMode, Principal, RoleRegistry, ANYONE, CRUD};
use backoffice_search::{
    Field, FieldKind, ModelSchema, QueryExecutor, Record, SchemaRegistry, SearchPage, SearchParams, SearchSettings,
    Searcher,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::action::{Action, ActionArgument};
use crate::config::AdminConfig;
use crate::context::PermissionContext;
use crate::error::{AdminError, AdminResult};
use crate::inflect;
use crate::menu::{Menu, MenuTree};
use crate::permissioner::Permissioner;
use crate::resolver::PermissionResolver;
use crate::resource::{Meta, Resource, ResourceConfig};
use crate::route::RouteGuard;

/// Model name of the group schema registered by [`Admin::register_group`].
pub const GROUP_MODEL: &str = "Group";

const GROUP_RESOURCE: &str = "Groups";
const GROUP_SELECTOR_RESOURCE: &str = "GroupSelector";

/// Resources, menus and permission settings of one admin.
pub struct Admin {
    config: AdminConfig,
    group_enabled: AtomicBool,
    roles: RoleRegistry,
    schemas: SchemaRegistry,
    resources: Vec<Resource>,
    menus: MenuTree,
    search_settings: SearchSettings,
}

impl Admin {
    /// Create an admin from a validated config.
    pub fn new(config: AdminConfig) -> AdminResult<Self> {
        config.validate()?;
        let prefix = Some(config.route_prefix.clone());
        Ok(Self {
            group_enabled: AtomicBool::new(config.group_enabled),
            roles: RoleRegistry::new(),
            schemas: SchemaRegistry::new(),
            resources: Vec::new(),
            menus: MenuTree::new(prefix),
            search_settings: config.search_settings(),
            config,
        })
    }

    /// The config the admin was built with.
    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    /// Switch group permissions on or off. Contexts built earlier keep the
    /// value they saw.
    pub fn set_group_enabled(&self, enabled: bool) {
        self.group_enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "group permissions switched");
    }

    /// Whether group permissions are switched on.
    pub fn is_group_enabled(&self) -> bool {
        self.group_enabled.load(Ordering::SeqCst)
    }

    /// Register a derived role.
    pub fn register_role<F>(&mut self, name: impl Into<String>, checker: F)
    where
        F: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.roles.register(name, checker);
    }

    /// Registered role checkers.
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Register a model schema, replacing one with the same name.
    pub fn register_schema(&mut self, schema: ModelSchema) -> Arc<ModelSchema> {
        self.schemas.register(schema)
    }

    /// All registered model schemas.
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Build the permission context for one request: effective roles,
    /// the principal's groups when group mode is on, and the current
    /// group-mode value.
    #[instrument(skip(self, principal, store), fields(principal = %principal.id))]
    pub async fn context(&self, principal: Principal, store: &dyn GroupStore) -> AdminResult<PermissionContext> {
        let group_enabled = self.is_group_enabled();
        let roles = self.roles.matched_roles(&principal);
        let mut context = PermissionContext::new(principal, group_enabled).with_roles(roles);

        if group_enabled {
            let groups = store.groups_for_principal(&context.principal().id).await?;
            debug!(groups = groups.len(), "groups loaded");
            context = context.with_groups(groups);
        }
        Ok(context)
    }

    /// A permission resolver over this admin.
    pub fn resolver(&self) -> PermissionResolver<'_> {
        PermissionResolver::new(self)
    }

    /// A route guard over this admin.
    pub fn route_guard(&self) -> RouteGuard<'_> {
        RouteGuard::new(self)
    }

    /// Register the model `model` as a resource and, unless invisible, add
    /// its menu.
    pub fn add_resource(&mut self, model: &str, config: ResourceConfig) -> AdminResult<&mut Resource> {
        let schema = self
            .schemas
            .get(model)
            .ok_or_else(|| AdminError::Validation(format!("model {model} has no registered schema")))?;
        let resource = Resource::new(schema, config);
        self.ensure_unique(&resource.name)?;

        if !resource.config.invisible {
            let menu_name = resource.menu_name();
            let mut menu = Menu::new(menu_name.as_str())
                .under(resource.config.menu.iter().cloned())
                .with_relative_path(format!("/{}", inflect::to_param(&menu_name)))
                .with_priority(resource.config.priority)
                .with_permissioner(Permissioner::resource(resource.name.as_str()));
            if let Some(icon) = &resource.config.icon {
                menu = menu.with_icon(icon.as_str());
            }
            menu.associated_resource = Some(resource.name.clone());
            self.menus.add(menu);
        }

        info!(resource = %resource.name, model, "resource registered");
        Ok(self.push_resource(resource))
    }

    /// Register the target of `parent`'s relationship `field` as a nested
    /// resource. It gets no menu, and a `Delete` action carrying its own
    /// permission.
    pub fn add_sub_resource(&mut self, parent: &str, field: &str, config: ResourceConfig) -> AdminResult<&mut Resource> {
        let parent_resource = self
            .resource(parent)
            .ok_or_else(|| AdminError::NotFound(format!("resource {parent}")))?;
        let relationship = parent_resource.schema().find_relationship(field).ok_or_else(|| {
            AdminError::Validation(format!("{} has no relationship named {field}", parent_resource.schema().name))
        })?;
        let schema = self
            .schemas
            .get(&relationship.target)
            .ok_or_else(|| AdminError::Validation(format!("model {} has no registered schema", relationship.target)))?;

        let mut child = Resource::new(schema, config);
        self.ensure_unique(&child.name)?;

        let mut delete = Action::new("Delete").with_method("DELETE").with_modes(["menu_item"]);
        if let Some(permission) = child.permission() {
            delete = delete.with_permission(permission.clone());
        }
        child.action(delete);
        child.set_parent(parent);

        let child_name = child.name.clone();
        if let Some(parent_resource) = self.resources.iter_mut().find(|r| r.name == parent) {
            parent_resource.add_child(child_name.as_str());
        }

        info!(resource = %child_name, parent, field, "sub-resource registered");
        Ok(self.push_resource(child))
    }

    fn ensure_unique(&self, name: &str) -> AdminResult<()> {
        if self.resource(name).is_some() {
            return Err(AdminError::Validation(format!("resource {name} is already registered")));
        }
        Ok(())
    }

    fn push_resource(&mut self, resource: Resource) -> &mut Resource {
        let index = self.resources.len();
        self.resources.push(resource);
        &mut self.resources[index]
    }

    /// Find a resource by name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Find a resource by name for configuration.
    pub fn resource_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.name == name)
    }

    /// Every resource, nested ones included, in registration order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Route segments leading to a nested resource, e.g.
    /// `users/:user_id` for the addresses of a user. Empty for top-level
    /// resources, `None` for unknown names.
    pub fn route_prefix(&self, name: &str) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = self.resource(name)?;
        while let Some(parent) = current.parent() {
            let parent = self.resource(parent)?;
            segments.push(format!("{}/{}", parent.to_param(), parent.param_id_name()));
            current = parent;
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Add a menu under its ancestors, creating missing ones.
    pub fn add_menu(&mut self, menu: Menu) -> &mut Menu {
        self.menus.add(menu)
    }

    /// Find a menu by its path of names.
    pub fn get_menu(&self, names: &[&str]) -> Option<&Menu> {
        self.menus.get(names)
    }

    /// Find a menu by its path of names for configuration.
    pub fn get_menu_mut(&mut self, names: &[&str]) -> Option<&mut Menu> {
        self.menus.get_mut(names)
    }

    /// Top-level menus.
    pub fn menus(&self) -> &[Menu] {
        self.menus.menus()
    }

    pub fn menu_tree(&self) -> &MenuTree {
        &self.menus
    }

    /// Everything a group can grant: one entry per top-level resource
    /// (its name, then the names of its group-controlled actions), then one
    /// per menu leaf not bound to a resource.
    pub fn resource_list(&self) -> Vec<Vec<String>> {
        let mut list: Vec<Vec<String>> = self
            .resources
            .iter()
            .filter(|r| r.parent().is_none())
            .map(|r| {
                std::iter::once(r.name.clone())
                    .chain(
                        r.actions()
                            .iter()
                            .filter(|a| !a.skip_group_control)
                            .map(|a| a.name.clone()),
                    )
                    .collect()
            })
            .collect();

        list.extend(
            self.menus
                .iter()
                .filter(|m| m.associated_resource.is_none() && m.sub_menus().is_empty())
                .map(|m| vec![m.name.clone()]),
        );
        list
    }

    /// Check that every name is a resource or a menu of this admin.
    pub fn validate_resource_list<S: AsRef<str>>(&self, names: &[S]) -> AdminResult<()> {
        let mut available: Vec<String> = self.resources.iter().map(|r| r.name.clone()).collect();
        for menu in self.menus.iter() {
            if !available.contains(&menu.name) && !available.contains(&inflect::singular(&menu.name)) {
                available.push(menu.name.clone());
            }
        }

        match names
            .iter()
            .map(|n| n.as_ref())
            .find(|n| !available.iter().any(|a| a.as_str() == *n))
        {
            Some(missing) => Err(AdminError::Validation(format!(
                "given resource '{missing}' cannot be found, available names are {available:?}"
            ))),
            None => Ok(()),
        }
    }

    /// Turn group permissions on and register the group management
    /// resources. Call after every resource and menu named in
    /// `resource_list` is registered.
    pub fn register_group<S: AsRef<str>>(
        &mut self,
        resource_list: &[S],
        config: ResourceConfig,
    ) -> AdminResult<&mut Resource> {
        self.validate_resource_list(resource_list)?;
        self.set_group_enabled(true);

        if !self.schemas.contains(GROUP_MODEL) {
            self.register_schema(group_schema());
        }

        let config = ResourceConfig {
            name: config.name.or_else(|| Some(GROUP_RESOURCE.to_string())),
            ..config
        };
        let allow_list: Vec<String> = resource_list.iter().map(|n| n.as_ref().to_string()).collect();
        let group = self.add_resource(GROUP_MODEL, config)?;
        group
            .index_attrs(["ID", "Name", "CreatedAt", "UpdatedAt"])
            .search_attrs(["ID", "Name"])
            .meta(Meta::new("Name").with_label("Group Name").with_validator(|value| {
                match value.as_str().map(str::trim) {
                    Some(name) if !name.is_empty() => Ok(()),
                    _ => Err("Group Name can't be blank".to_string()),
                }
            }))
            .meta(
                Meta::new("AllowList")
                    .with_label("Resource Permission")
                    .with_collection(allow_list.iter().cloned()),
            )
            .meta(Meta::new("Users").with_label("Members"));
        info!(catalog = ?allow_list, "group permissions registered");

        self.add_resource(
            GROUP_MODEL,
            ResourceConfig::new().with_name(GROUP_SELECTOR_RESOURCE),
        )?
        .search_attrs(["ID", "Name"]);

        let selector_menu = inflect::plural(GROUP_SELECTOR_RESOURCE);
        if let Some(menu) = self.menus.get_mut(&[selector_menu.as_str()]) {
            menu.permission = Some(Permission::deny(&CRUD, [ANYONE]));
        }

        self.resource_mut(GROUP_SELECTOR_RESOURCE)
            .ok_or_else(|| AdminError::NotFound(format!("resource {GROUP_SELECTOR_RESOURCE}")))
    }

    /// Run `action` of `resource` on `records`. Denials surface as
    /// [`AdminError::PermissionDenied`].
    #[instrument(skip(self, ctx, records), fields(principal = %ctx.principal().id, records = records.len()))]
    pub fn execute_action(
        &self,
        ctx: &PermissionContext,
        resource: &str,
        action: &str,
        records: &[Record],
    ) -> AdminResult<()> {
        let res = self
            .resource(resource)
            .ok_or_else(|| AdminError::NotFound(format!("resource {resource}")))?;
        let act = res
            .get_action(action)
            .ok_or_else(|| AdminError::NotFound(format!("action {action} of {resource}")))?;

        let mode = act.permission_mode();
        if !self.resolver().action_allowed(ctx, mode, resource, action) {
            return Err(AdminError::PermissionDenied {
                mode,
                target: format!("{resource}.{action}"),
            });
        }

        let handler = act
            .handler()
            .ok_or_else(|| AdminError::ActionFailed(format!("action {action} has no handler")))?;
        handler(&ActionArgument {
            action: act,
            resource,
            records,
            context: ctx,
        })?;

        info!("action executed");
        Ok(())
    }

    fn readable(&self, ctx: &PermissionContext, resource: &str) -> AdminResult<&Resource> {
        let res = self
            .resource(resource)
            .ok_or_else(|| AdminError::NotFound(format!("resource {resource}")))?;
        if !self.resolver().resource_allowed(ctx, PermissionMode::Read, resource) {
            return Err(AdminError::PermissionDenied {
                mode: PermissionMode::Read,
                target: resource.to_string(),
            });
        }
        Ok(res)
    }

    /// Search the index page of `resource`.
    #[instrument(skip(self, ctx, executor, params), fields(principal = %ctx.principal().id))]
    pub async fn find_many(
        &self,
        ctx: &PermissionContext,
        executor: &dyn QueryExecutor,
        resource: &str,
        params: &SearchParams,
    ) -> AdminResult<SearchPage> {
        let res = self.readable(ctx, resource)?;
        let searcher = Searcher::new(res.schema(), res.search_config(), &self.schemas, &self.search_settings);
        Ok(searcher.find(executor, params).await?)
    }

    /// Fetch one record of `resource` by primary key.
    #[instrument(skip(self, ctx, executor, params), fields(principal = %ctx.principal().id))]
    pub async fn find_one(
        &self,
        ctx: &PermissionContext,
        executor: &dyn QueryExecutor,
        resource: &str,
        primary: &str,
        params: &SearchParams,
    ) -> AdminResult<Record> {
        let res = self.readable(ctx, resource)?;
        let searcher = Searcher::new(res.schema(), res.search_config(), &self.schemas, &self.search_settings);
        Ok(searcher.find_one(executor, primary, params).await?)
    }
}

fn group_schema() -> ModelSchema {
    ModelSchema::new(GROUP_MODEL, "admin_groups")
        .field(Field::new("ID", "id", FieldKind::Integer).primary())
        .field(Field::new("Name", "name", FieldKind::String))
        .field(Field::new("Users", "users", FieldKind::String))
        .field(Field::new("CreatedAt", "created_at", FieldKind::Time))
        .field(Field::new("UpdatedAt", "updated_at", FieldKind::Time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Admin {
        let mut admin = Admin::new(AdminConfig::default()).unwrap();
        admin.register_schema(
            ModelSchema::new("User", "users")
                .field(Field::new("ID", "id", FieldKind::Integer).primary())
                .relationship(backoffice_search::Relationship::has_many(
                    "Addresses",
                    "Address",
                    "user_id",
                    "id",
                )),
        );
        admin.register_schema(
            ModelSchema::new("Address", "addresses").field(Field::new("ID", "id", FieldKind::Integer).primary()),
        );
        admin
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AdminConfig {
            page_count: 0,
            ..Default::default()
        };
        assert!(matches!(Admin::new(config), Err(AdminError::Config(_))));
    }

    #[test]
    fn test_add_resource_adds_menu() {
        let mut admin = admin();
        admin
            .add_resource("User", ResourceConfig::new().under(["People"]).with_icon("user"))
            .unwrap();

        let menu = admin.get_menu(&["People", "Users"]).unwrap();
        assert_eq!(menu.url(), "/admin/users");
        assert_eq!(menu.associated_resource.as_deref(), Some("User"));
        assert_eq!(menu.icon.as_deref(), Some("user"));
        assert!(matches!(menu.permissioner, Some(Permissioner::Resource(ref name)) if name == "User"));
    }

    #[test]
    fn test_add_resource_errors() {
        let mut admin = admin();
        assert!(matches!(
            admin.add_resource("Invoice", ResourceConfig::new()),
            Err(AdminError::Validation(_))
        ));
        admin.add_resource("User", ResourceConfig::new()).unwrap();
        assert!(matches!(
            admin.add_resource("User", ResourceConfig::new()),
            Err(AdminError::Validation(_))
        ));
    }

    #[test]
    fn test_invisible_and_singleton() {
        let mut admin = admin();
        admin.add_resource("User", ResourceConfig::new().invisible()).unwrap();
        assert!(admin.menus().is_empty());

        admin
            .add_resource("User", ResourceConfig::new().with_name("Profile").singleton())
            .unwrap();
        assert_eq!(admin.get_menu(&["Profile"]).map(Menu::url).as_deref(), Some("/admin/profile"));
    }

    #[test]
    fn test_sub_resource() {
        let mut admin = admin();
        admin.add_resource("User", ResourceConfig::new()).unwrap();
        let permission = Permission::allow(&[PermissionMode::Delete], ["admin"]);
        admin
            .add_sub_resource("User", "Addresses", ResourceConfig::new().with_permission(permission.clone()))
            .unwrap();

        let address = admin.resource("Address").unwrap();
        assert_eq!(address.parent(), Some("User"));
        let delete = address.get_action("Delete").unwrap();
        assert_eq!(delete.permission.as_ref(), Some(&permission));
        assert!(delete.has_mode("menu_item"));
        assert_eq!(admin.resource("User").unwrap().children(), ["Address"]);
        assert!(admin.get_menu(&["Addresses"]).is_none());

        assert_eq!(admin.route_prefix("Address").as_deref(), Some("users/:user_id"));
        assert_eq!(admin.route_prefix("User").as_deref(), Some(""));
        assert!(admin.route_prefix("Nope").is_none());
    }

    #[test]
    fn test_sub_resource_needs_relationship() {
        let mut admin = admin();
        admin.add_resource("User", ResourceConfig::new()).unwrap();
        assert!(matches!(
            admin.add_sub_resource("User", "Orders", ResourceConfig::new()),
            Err(AdminError::Validation(_))
        ));
        assert!(matches!(
            admin.add_sub_resource("Nope", "Addresses", ResourceConfig::new()),
            Err(AdminError::NotFound(_))
        ));
    }

    #[test]
    fn test_group_switch() {
        let admin = admin();
        assert!(!admin.is_group_enabled());
        admin.set_group_enabled(true);
        assert!(admin.is_group_enabled());
    }
}

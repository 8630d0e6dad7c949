//! Permission resolution integration tests
//!
//! An admin with products (with publish/approve/delete actions),
//! collections, news and a few free menus, checked against principals with
//! and without group grants.

use backoffice_admin::{
    Action, Admin, AdminConfig, AdminError, Menu, Meta, PermissionContext, ResourceConfig, RouteConfig,
    RouteDecision, Target,
};
use backoffice_groups::store::memory::MemoryGroupStore;
use backoffice_groups::{Group, GroupStore, ResourcePermission};
use backoffice_roles::{Permission, PermissionMode, Principal};
use backoffice_search::{Field, FieldKind, ModelSchema, Record, SearchParams, SqliteExecutor};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::{Arc, Mutex};

fn schema(model: &str, table: &str) -> ModelSchema {
    ModelSchema::new(model, table)
        .field(Field::new("ID", "id", FieldKind::Integer).primary())
        .field(Field::new("Name", "name", FieldKind::String))
        .field(Field::new("Price", "price", FieldKind::Integer))
        .field(Field::new("Published", "published", FieldKind::Bool))
}

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

struct Fixture {
    admin: Admin,
    store: MemoryGroupStore,
    published: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    fn new() -> Self {
        let mut admin = Admin::new(AdminConfig::default()).unwrap();
        admin.register_schema(schema("Product", "products"));
        admin.register_schema(schema("Collection", "collections"));
        admin.register_schema(schema("News", "news"));
        admin.register_schema(schema("Secret", "secrets"));

        let published = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&published);

        admin
            .add_resource("Product", ResourceConfig::new().under(["Product Management"]))
            .unwrap()
            .action(Action::new("Delete").with_method("DELETE").with_modes(["menu_item"]))
            .action(
                Action::new("Publish")
                    .with_modes(["edit"])
                    .with_visible(|record, _| record.get("Published") != Some(&json!(true)))
                    .with_handler(move |argument| {
                        let mut log = log.lock().unwrap();
                        for record in argument.records {
                            log.push(record["Name"].as_str().unwrap_or_default().to_string());
                        }
                        Ok(())
                    }),
            )
            .action(Action::new("Approve").with_modes(["edit"]).skip_group_control())
            .meta(Meta::new("Price").with_permission(Permission::allow(&[PermissionMode::Update], ["manager"])));
        admin
            .add_resource("Collection", ResourceConfig::new().under(["Product Management"]))
            .unwrap();
        admin
            .add_resource("News", ResourceConfig::new().with_name("FakeNews"))
            .unwrap();
        admin.add_menu(Menu::new("External Independent menu").under(["External Management"]));

        Self {
            admin,
            store: MemoryGroupStore::new(),
            published,
        }
    }

    fn with_secret(mut self) -> Self {
        self.admin
            .add_resource(
                "Secret",
                ResourceConfig::new().with_permission(Permission::allow(&PermissionMode::all(), ["admin"])),
            )
            .unwrap();
        self
    }

    async fn grant(&self, member: &str, permission: ResourcePermission) -> Group {
        self.store
            .create(Group::new("Editors").with_member(member).with_resource(permission))
            .await
            .unwrap()
    }

    async fn context(&self, id: &str, roles: &[&str]) -> PermissionContext {
        self.admin
            .context(Principal::new(id, roles.iter().copied()), &self.store)
            .await
            .unwrap()
    }
}

#[test]
fn test_resource_list() {
    let fx = Fixture::new();
    let list = fx.admin.resource_list();

    assert_eq!(
        list,
        vec![
            vec!["Product".to_string(), "Delete".to_string(), "Publish".to_string()],
            vec!["Collection".to_string()],
            vec!["FakeNews".to_string()],
            vec!["External Independent menu".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_role_rule_overrides_groups() {
    let fx = Fixture::new().with_secret();
    fx.admin.set_group_enabled(true);
    fx.grant("1", ResourcePermission::allowed("Secret")).await;

    let granted_viewer = fx.context("1", &["viewer"]).await;
    let ungrouped_admin = fx.context("2", &["admin"]).await;
    let resolver = fx.admin.resolver();

    assert!(!resolver.is_allowed(&granted_viewer, PermissionMode::Read, Target::Resource("Secret")));
    assert!(resolver.is_allowed(&ungrouped_admin, PermissionMode::Read, Target::Resource("Secret")));

    let secrets = fx.admin.get_menu(&["Secrets"]).unwrap();
    assert!(!resolver.is_allowed(&granted_viewer, PermissionMode::Read, Target::Menu(secrets)));
    assert!(resolver.is_allowed(&ungrouped_admin, PermissionMode::Read, Target::Menu(secrets)));
}

#[tokio::test]
async fn test_group_grant_needs_membership_and_allow() {
    let fx = Fixture::new();
    fx.admin.set_group_enabled(true);
    let mut group = fx.grant("7", ResourcePermission::allowed("Product")).await;

    let member = fx.context("7", &[]).await;
    let outsider = fx.context("8", &[]).await;
    let resolver = fx.admin.resolver();

    assert!(resolver.resource_allowed(&member, PermissionMode::Read, "Product"));
    assert!(!resolver.resource_allowed(&outsider, PermissionMode::Read, "Product"));
    assert!(!resolver.resource_allowed(&member, PermissionMode::Read, "Collection"));

    group.resource_permissions = vec![ResourcePermission::denied("Product")];
    fx.store.update(group).await.unwrap();
    let member = fx.context("7", &[]).await;
    assert!(!fx.admin.resolver().resource_allowed(&member, PermissionMode::Read, "Product"));
}

#[tokio::test]
async fn test_group_grant_matches_singular_name() {
    let fx = Fixture::new();
    fx.admin.set_group_enabled(true);
    fx.grant("7", ResourcePermission::allowed("Product")).await;

    let member = fx.context("7", &[]).await;
    assert!(member.resource_allowed_by_group("Products"));
    assert!(member.resource_allowed_by_group("Product"));
    assert!(!member.resource_allowed_by_group("Productions"));
}

#[tokio::test]
async fn test_parent_menu_is_or_of_leaves() {
    let fx = Fixture::new();
    fx.admin.set_group_enabled(true);
    fx.grant("7", ResourcePermission::allowed("Collection")).await;

    let member = fx.context("7", &[]).await;
    let outsider = fx.context("8", &[]).await;
    let resolver = fx.admin.resolver();

    let management = fx.admin.get_menu(&["Product Management"]).unwrap();
    assert!(resolver.menu_allowed(&member, PermissionMode::Read, management));
    assert!(!resolver.menu_allowed(&outsider, PermissionMode::Read, management));

    let products = fx.admin.get_menu(&["Product Management", "Products"]).unwrap();
    let collections = fx.admin.get_menu(&["Product Management", "Collections"]).unwrap();
    assert!(!resolver.menu_allowed(&member, PermissionMode::Read, products));
    assert!(resolver.menu_allowed(&member, PermissionMode::Read, collections));

    let visible: Vec<&str> = resolver.visible_menus(&member).iter().map(|m| m.name.as_str()).collect();
    assert_eq!(visible, ["Product Management"]);
}

#[tokio::test]
async fn test_free_menu_follows_group_mode() {
    let mut fx = Fixture::new();
    fx.admin.add_menu(Menu::new("Dashboard").with_relative_path("/dashboard"));
    fx.admin.set_group_enabled(true);

    let under_groups = fx.context("7", &[]).await;
    let dashboard = fx.admin.get_menu(&["Dashboard"]).unwrap();
    assert!(!fx.admin.resolver().menu_allowed(&under_groups, PermissionMode::Read, dashboard));

    fx.admin.set_group_enabled(false);
    let without_groups = fx.context("7", &[]).await;
    assert!(fx.admin.resolver().menu_allowed(&without_groups, PermissionMode::Read, dashboard));
    // Contexts keep the group mode they were built with.
    assert!(!fx.admin.resolver().menu_allowed(&under_groups, PermissionMode::Read, dashboard));

    fx.grant("9", ResourcePermission::allowed("Dashboard")).await;
    fx.admin.set_group_enabled(true);
    let granted = fx.context("9", &[]).await;
    assert!(fx.admin.resolver().menu_allowed(&granted, PermissionMode::Read, dashboard));
}

#[tokio::test]
async fn test_skip_group_control_action() {
    let fx = Fixture::new();
    fx.admin.set_group_enabled(true);
    fx.grant("7", ResourcePermission::allowed("Product").with_action("Publish")).await;

    let member = fx.context("7", &[]).await;
    let outsider = fx.context("8", &[]).await;
    let resolver = fx.admin.resolver();
    let target = |action| Target::Action {
        resource: "Product",
        action,
    };

    assert!(resolver.is_allowed(&outsider, PermissionMode::Read, target("Approve")));
    assert!(!resolver.is_allowed(&outsider, PermissionMode::Read, target("Publish")));
    assert!(resolver.is_allowed(&member, PermissionMode::Read, target("Publish")));
    assert!(!resolver.is_allowed(&member, PermissionMode::Delete, target("Delete")));
    assert!(!resolver.is_allowed(&member, PermissionMode::Read, target("Archive")));
}

#[tokio::test]
async fn test_allowed_actions_and_attrs() {
    let fx = Fixture::new();
    let viewer = fx.context("1", &["viewer"]).await;
    let manager = fx.context("2", &["manager"]).await;
    let resolver = fx.admin.resolver();

    let draft = record(json!({"ID": 1, "Name": "Lamp", "Published": false}));
    let live = record(json!({"ID": 2, "Name": "Desk", "Published": true}));

    let names = |actions: Vec<&Action>| actions.iter().map(|a| a.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(resolver.allowed_actions(&viewer, "Product", "edit", &[draft.clone()])), ["Publish", "Approve"]);
    assert_eq!(names(resolver.allowed_actions(&viewer, "Product", "edit", &[draft, live])), ["Approve"]);
    assert_eq!(names(resolver.allowed_actions(&viewer, "Product", "menu_item", &[])), ["Delete"]);

    let attrs = ["Name", "Price"];
    assert_eq!(resolver.allowed_attrs(&viewer, "Product", &attrs, &[PermissionMode::Read]), ["Name"]);
    assert_eq!(
        resolver.allowed_attrs(&manager, "Product", &attrs, &[PermissionMode::Read, PermissionMode::Update]),
        ["Name", "Price"]
    );
}

#[tokio::test]
async fn test_register_group() {
    let mut fx = Fixture::new();

    let err = fx.admin.validate_resource_list(&["Product", "Orders"]).unwrap_err();
    assert!(matches!(err, AdminError::Validation(ref message) if message.contains("'Orders'")));

    fx.admin
        .register_group(&["Product", "Collection", "External Independent menu"], ResourceConfig::new())
        .unwrap();
    assert!(fx.admin.is_group_enabled());

    let groups = fx.admin.resource("Groups").unwrap();
    assert_eq!(groups.get_index_attrs(), ["ID", "Name", "CreatedAt", "UpdatedAt"]);
    assert_eq!(groups.get_meta("Name").map(Meta::label), Some("Group Name"));
    let allow_list = groups.get_meta("AllowList").unwrap();
    assert_eq!(allow_list.collection, ["Product", "Collection", "External Independent menu"]);
    let blank = record(json!({"Name": "  "}));
    assert!(matches!(groups.validate(&blank), Err(AdminError::Validation(_))));
    assert!(fx.admin.get_menu(&["Groups"]).is_some());

    let root = fx.context("1", &["admin"]).await;
    let selectors = fx.admin.get_menu(&["GroupSelectors"]).unwrap();
    assert!(!fx.admin.resolver().menu_allowed(&root, PermissionMode::Read, selectors));
}

#[tokio::test]
async fn test_route_guard_answers_not_found() {
    let fx = Fixture::new();
    fx.admin.set_group_enabled(true);
    fx.grant("7", ResourcePermission::allowed("Product")).await;

    let member = fx.context("7", &[]).await;
    let outsider = fx.context("8", &[]).await;
    let guard = fx.admin.route_guard();
    let route = RouteConfig::for_resource("Product");

    assert_eq!(guard.authorize(&member, "GET", &route), RouteDecision::Allow);
    let denied = guard.authorize(&outsider, "GET", &route);
    assert_eq!(denied, RouteDecision::NotFound);
    assert_eq!(denied.status_code(), 404);
}

#[tokio::test]
async fn test_execute_action() {
    let fx = Fixture::new();
    let ctx = fx.context("1", &[]).await;
    let records = vec![record(json!({"ID": 1, "Name": "Lamp"}))];

    fx.admin.execute_action(&ctx, "Product", "Publish", &records).unwrap();
    assert_eq!(*fx.published.lock().unwrap(), ["Lamp"]);

    let err = fx.admin.execute_action(&ctx, "Product", "Approve", &records).unwrap_err();
    assert!(matches!(err, AdminError::ActionFailed(_)));
    let err = fx.admin.execute_action(&ctx, "Product", "Archive", &records).unwrap_err();
    assert_eq!(err.status_code(), 404);

    fx.admin.set_group_enabled(true);
    let ctx = fx.context("1", &[]).await;
    let err = fx.admin.execute_action(&ctx, "Product", "Publish", &records).unwrap_err();
    assert!(matches!(err, AdminError::PermissionDenied { mode: PermissionMode::Read, .. }));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_find_many_checks_read_permission() {
    let fx = Fixture::new();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::raw_sql(
        "CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT NOT NULL, price INTEGER NOT NULL, published BOOLEAN NOT NULL);
         INSERT INTO products VALUES (1, 'Lamp', 20, 0), (2, 'Desk lamp', 80, 1), (3, 'Chair', 45, 1);",
    )
    .execute(&pool)
    .await
    .unwrap();
    let executor = SqliteExecutor::new(pool);

    let ctx = fx.context("1", &[]).await;
    let page = fx
        .admin
        .find_many(&ctx, &executor, "Product", &SearchParams::new().with_keyword("lamp"))
        .await
        .unwrap();
    let names: Vec<_> = page.records.iter().map(|r| r["Name"].clone()).collect();
    assert_eq!(names, [json!("Lamp"), json!("Desk lamp")]);
    assert_eq!(page.pagination.total, 2);

    let chair = fx
        .admin
        .find_one(&ctx, &executor, "Product", "3", &SearchParams::new())
        .await
        .unwrap();
    assert_eq!(chair["Price"], json!(45));

    fx.admin.set_group_enabled(true);
    let ctx = fx.context("1", &[]).await;
    let err = fx
        .admin
        .find_many(&ctx, &executor, "Product", &SearchParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::PermissionDenied { .. }));
}

//! # Back-office Admin
//!
//! Resource registry, sidebar menus and permission resolution for the
//! back-office admin.
//!
//! ## Permission resolution
//!
//! A role rule on a menu, resource or action always decides on its own.
//! Without one, group grants decide while group permissions are switched
//! on; otherwise everything is allowed. See [`resolver`].
//!
//! ## Usage
//!
//! ```rust
//! use backoffice_admin::{Admin, AdminConfig, PermissionContext, ResourceConfig, Target};
//! use backoffice_roles::{Permission, PermissionMode, Principal};
//! use backoffice_search::{Field, FieldKind, ModelSchema};
//!
//! # fn main() -> backoffice_admin::AdminResult<()> {
//! let mut admin = Admin::new(AdminConfig::default())?;
//! admin.register_schema(
//!     ModelSchema::new("Order", "orders").field(Field::new("ID", "id", FieldKind::Integer).primary()),
//! );
//! admin.add_resource(
//!     "Order",
//!     ResourceConfig::new().with_permission(Permission::allow(&[PermissionMode::Read], ["sales"])),
//! )?;
//!
//! let ctx = PermissionContext::new(Principal::new("7", ["sales"]), admin.is_group_enabled());
//! let resolver = admin.resolver();
//! assert!(resolver.is_allowed(&ctx, PermissionMode::Read, Target::Resource("Order")));
//! assert!(!resolver.is_allowed(&ctx, PermissionMode::Delete, Target::Resource("Order")));
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod admin;
pub mod config;
pub mod context;
pub mod error;
pub mod inflect;
pub mod menu;
pub mod permissioner;
pub mod resolver;
pub mod resource;
pub mod route;

pub use action::{Action, ActionArgument, ActionHandler, RecordPredicate};
pub use admin::{Admin, GROUP_MODEL};
pub use config::{AdminConfig, ConfigError};
pub use context::PermissionContext;
pub use error::{AdminError, AdminResult};
pub use menu::{Menu, MenuTree, Placement};
pub use permissioner::{GroupVerdict, PermissionFn, Permissioner};
pub use resolver::{PermissionResolver, Target};
pub use resource::{Meta, MetaValidator, Resource, ResourceConfig};
pub use route::{RouteConfig, RouteDecision, RouteGuard};

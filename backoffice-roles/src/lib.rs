//! # Back-office Roles
//!
//! Role rules shared by every back-office crate.
//!
//! ## Overview
//!
//! The backoffice-roles crate handles:
//! - **Modes**: the CRUD modes every check is phrased in
//! - **Permissions**: allow/deny role lists per mode
//! - **Principals**: the identity and claimed roles of a request
//! - **Role Registry**: named checkers deriving extra roles
//!
//! ## Architecture
//!
//! ```text
//! Permission = { allowed: mode -> [role], denied: mode -> [role] }
//!
//! has_permission(mode, roles):
//!   denied[mode] ∩ roles (or "*")   -> false
//!   no allow list at all            -> true
//!   allowed[mode] ∩ roles (or "*")  -> true
//!   otherwise                       -> false
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use backoffice_roles::{Permission, PermissionMode, Principal, ANYONE, CRUD};
//!
//! let admin_only = Permission::allow(&CRUD, ["admin"]);
//! let user = Principal::new("7", ["admin"]);
//! assert!(admin_only.has_permission(PermissionMode::Update, user.roles()));
//!
//! let hidden = Permission::deny(&CRUD, [ANYONE]);
//! assert!(!hidden.has_permission(PermissionMode::Read, user.roles()));
//! ```

pub mod mode;
pub mod permission;
pub mod principal;
pub mod registry;

// Re-export main types for convenience
pub use mode::{PermissionMode, CRUD};
pub use permission::{Permission, ANYONE};
pub use principal::Principal;
pub use registry::{RoleChecker, RoleRegistry};

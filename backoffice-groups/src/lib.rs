//! # Back-office Groups
//!
//! Permission groups for the back-office admin.
//!
//! A group lists principals and the resources, menus and resource actions
//! its members may use. Group checks only take part in permission
//! resolution while group permissions are switched on in the admin; role
//! rules on a target always outrank them.
//!
//! ## Features
//!
//! - `memory` (default): [`store::memory::MemoryGroupStore`]
//! - `sqlite` (default): [`store::sqlite::SqliteGroupStore`] on sqlx
//!
//! ## Usage
//!
//! ```rust,no_run
//! use backoffice_groups::{register_principal_to_groups, Group, GroupStore, ResourcePermission};
//! use backoffice_groups::store::memory::MemoryGroupStore;
//!
//! # async fn example() -> backoffice_groups::GroupResult<()> {
//! let store = MemoryGroupStore::new();
//! let editors = store
//!     .create(Group::new("Editors").with_resource(ResourcePermission::allowed("Product")))
//!     .await?;
//!
//! register_principal_to_groups(&store, &[editors.id], Some("42")).await?;
//! assert!(store.get(editors.id).await?.includes_member("42"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod group;
pub mod members;
pub mod registration;
pub mod store;

pub use error::{GroupError, GroupResult};
pub use group::{Group, GroupId, GroupSet, ResourceActionPermission, ResourcePermission};
pub use members::MemberSet;
pub use registration::register_principal_to_groups;
pub use store::GroupStore;

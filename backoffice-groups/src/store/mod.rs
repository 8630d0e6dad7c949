//! Group persistence
//!
//! [`GroupStore`] is the seam between group logic and storage. Backends:
//!
//! - [`memory::MemoryGroupStore`] (feature `memory`): process-local, for
//!   tests and single-node setups
//! - [`sqlite::SqliteGroupStore`] (feature `sqlite`): sqlx-backed, writes
//!   batched in one transaction

use async_trait::async_trait;

use crate::error::GroupResult;
use crate::group::{Group, GroupId};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Group store trait.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Validate and insert a new group, assigning its ID.
    async fn create(&self, group: Group) -> GroupResult<Group>;

    /// Fetch a group by ID.
    async fn get(&self, id: GroupId) -> GroupResult<Group>;

    /// All groups, ordered by ID.
    async fn list(&self) -> GroupResult<Vec<Group>>;

    /// The groups among `ids` that exist, ordered by ID. Unknown IDs are
    /// skipped.
    async fn find_by_ids(&self, ids: &[GroupId]) -> GroupResult<Vec<Group>>;

    /// Validate and overwrite an existing group.
    async fn update(&self, group: Group) -> GroupResult<Group>;

    /// Delete a group.
    async fn delete(&self, id: GroupId) -> GroupResult<()>;

    /// Overwrite several existing groups atomically: either every write is
    /// visible afterwards or none is.
    async fn save_all(&self, groups: Vec<Group>) -> GroupResult<()>;

    /// Groups that list the principal as a member.
    async fn groups_for_principal(&self, principal_id: &str) -> GroupResult<Vec<Group>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|g| g.includes_member(principal_id))
            .collect())
    }

    /// Backend name, for logs.
    fn backend_name(&self) -> &'static str;
}

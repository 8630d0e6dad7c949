//! Adding principals to groups.

use tracing::{info, instrument};

use crate::error::{GroupError, GroupResult};
use crate::group::GroupId;
use crate::store::GroupStore;

/// Add a principal to every group in `group_ids` that does not already
/// contain it, persisting all changes in one atomic batch.
///
/// IDs that do not resolve to a group are skipped; the call only fails with
/// [`GroupError::NotFound`] when none of them resolve.
///
/// # Arguments
///
/// * `store` - The group store
/// * `group_ids` - Groups to join, must not be empty
/// * `principal_id` - The principal to add, must be present
///
/// # Returns
///
/// IDs of the groups that gained the member. Groups that already listed the
/// principal are left untouched and not returned.
///
/// # Errors
///
/// - [`GroupError::Validation`] for an empty ID list or a missing principal
/// - [`GroupError::NotFound`] when no group matched
/// - the store's error if the batch write fails; nothing is persisted then
#[instrument(skip(store), fields(backend = store.backend_name()))]
pub async fn register_principal_to_groups(
    store: &dyn GroupStore,
    group_ids: &[GroupId],
    principal_id: Option<&str>,
) -> GroupResult<Vec<GroupId>> {
    if group_ids.is_empty() {
        return Err(GroupError::Validation("group IDs can't be empty".to_string()));
    }
    let principal_id = match principal_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(GroupError::Validation("principal ID can't be empty".to_string())),
    };

    let groups = store.find_by_ids(group_ids).await?;
    if groups.is_empty() {
        return Err(GroupError::NotFound(format!("{group_ids:?}")));
    }

    let mut changed = Vec::new();
    for mut group in groups {
        if group.members.insert(principal_id) {
            changed.push(group);
        }
    }

    let ids: Vec<GroupId> = changed.iter().map(|g| g.id).collect();
    if changed.is_empty() {
        return Ok(ids);
    }

    store.save_all(changed).await?;
    info!(principal_id, groups = ?ids, "principal added to groups");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Group;
    use crate::store::memory::MemoryGroupStore;

    #[tokio::test]
    async fn test_validation() {
        let store = MemoryGroupStore::new();
        let err = register_principal_to_groups(&store, &[], Some("1")).await.unwrap_err();
        assert!(matches!(err, GroupError::Validation(_)));

        let err = register_principal_to_groups(&store, &[1], None).await.unwrap_err();
        assert!(matches!(err, GroupError::Validation(_)));
    }

    #[tokio::test]
    async fn test_already_member_is_noop() {
        let store = MemoryGroupStore::new();
        let group = store.create(Group::new("a").with_member("1")).await.unwrap();

        let changed = register_principal_to_groups(&store, &[group.id], Some("1")).await.unwrap();
        assert!(changed.is_empty());
        assert_eq!(store.get(group.id).await.unwrap().members.len(), 1);
    }
}

//! In-memory group store.
//!
//! Groups live in a `BTreeMap` behind a tokio `RwLock`. `save_all` checks
//! every group of the batch under the write lock before applying any of
//! them, which gives the same all-or-nothing outcome as a transaction.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::GroupStore;
use crate::error::{GroupError, GroupResult};
use crate::group::{Group, GroupId};

#[derive(Default)]
struct Inner {
    groups: BTreeMap<GroupId, Group>,
    next_id: GroupId,
}

/// In-memory group store.
#[derive(Clone, Default)]
pub struct MemoryGroupStore {
    inner: Arc<RwLock<Inner>>,
}

impl std::fmt::Debug for MemoryGroupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGroupStore").finish_non_exhaustive()
    }
}

impl MemoryGroupStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn create(&self, mut group: Group) -> GroupResult<Group> {
        group.validate()?;
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        group.id = inner.next_id;
        let now = Utc::now();
        group.created_at = now;
        group.updated_at = now;
        inner.groups.insert(group.id, group.clone());
        debug!(group_id = group.id, name = %group.name, "group created");
        Ok(group)
    }

    async fn get(&self, id: GroupId) -> GroupResult<Group> {
        self.inner
            .read()
            .await
            .groups
            .get(&id)
            .cloned()
            .ok_or_else(|| GroupError::NotFound(id.to_string()))
    }

    async fn list(&self) -> GroupResult<Vec<Group>> {
        Ok(self.inner.read().await.groups.values().cloned().collect())
    }

    async fn find_by_ids(&self, ids: &[GroupId]) -> GroupResult<Vec<Group>> {
        let inner = self.inner.read().await;
        Ok(inner
            .groups
            .values()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn update(&self, mut group: Group) -> GroupResult<Group> {
        group.validate()?;
        let mut inner = self.inner.write().await;
        let existing = inner
            .groups
            .get_mut(&group.id)
            .ok_or_else(|| GroupError::NotFound(group.id.to_string()))?;
        group.created_at = existing.created_at;
        group.updated_at = Utc::now();
        *existing = group.clone();
        Ok(group)
    }

    async fn delete(&self, id: GroupId) -> GroupResult<()> {
        self.inner
            .write()
            .await
            .groups
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| GroupError::NotFound(id.to_string()))
    }

    async fn save_all(&self, groups: Vec<Group>) -> GroupResult<()> {
        let mut inner = self.inner.write().await;
        for group in &groups {
            group.validate()?;
            if !inner.groups.contains_key(&group.id) {
                return Err(GroupError::NotFound(group.id.to_string()));
            }
        }

        let now = Utc::now();
        for mut group in groups {
            if let Some(existing) = inner.groups.get(&group.id) {
                group.created_at = existing.created_at;
            }
            group.updated_at = now;
            inner.groups.insert(group.id, group);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

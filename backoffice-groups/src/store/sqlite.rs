//! SQLite group store.
//!
//! Table layout (`admin_groups`):
//!
//! | column                 | content                                   |
//! |------------------------|-------------------------------------------|
//! | `id`                   | integer primary key                       |
//! | `name`                 | group name                                |
//! | `users`                | [`MemberSet::encode`] form                 |
//! | `resource_permissions` | JSON list of [`ResourcePermission`]        |
//! | `created_at`           | timestamp                                 |
//! | `updated_at`           | timestamp                                 |
//!
//! [`ResourcePermission`]: crate::group::ResourcePermission

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::SqliteConnection;
use tracing::{info, instrument, warn};

use super::GroupStore;
use crate::error::{GroupError, GroupResult};
use crate::group::{Group, GroupId};
use crate::members::MemberSet;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS admin_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    users TEXT NOT NULL DEFAULT '',
    resource_permissions TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

const SELECT_COLUMNS: &str = "SELECT id, name, users, resource_permissions, created_at, updated_at FROM admin_groups";

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    users: String,
    resource_permissions: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GroupRow> for Group {
    type Error = GroupError;

    fn try_from(row: GroupRow) -> GroupResult<Self> {
        Ok(Group {
            id: row.id,
            name: row.name,
            members: MemberSet::decode(&row.users),
            resource_permissions: serde_json::from_str(&row.resource_permissions)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// sqlx-backed group store.
#[derive(Debug, Clone)]
pub struct SqliteGroupStore {
    pool: SqlitePool,
}

impl SqliteGroupStore {
    /// Wrap an existing pool. Call [`migrate`](Self::migrate) before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and create the table if needed.
    pub async fn connect(url: &str) -> GroupResult<Self> {
        let pool = SqlitePoolOptions::new().connect(url).await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// A private in-memory database.
    ///
    /// The pool is pinned to one connection that never expires, since every
    /// SQLite in-memory connection is its own database.
    pub async fn in_memory() -> GroupResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create the `admin_groups` table if it does not exist.
    pub async fn migrate(&self) -> GroupResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Overwrite a stored group and return its stored creation time.
    async fn write_group(
        conn: &mut SqliteConnection,
        group: &Group,
        now: DateTime<Utc>,
    ) -> GroupResult<DateTime<Utc>> {
        let permissions = serde_json::to_string(&group.resource_permissions)?;
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "UPDATE admin_groups SET name = ?, users = ?, resource_permissions = ?, updated_at = ? WHERE id = ? \
             RETURNING created_at",
        )
        .bind(&group.name)
        .bind(group.members.encode())
        .bind(permissions)
        .bind(now)
        .bind(group.id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| GroupError::NotFound(group.id.to_string()))
    }
}

#[async_trait]
impl GroupStore for SqliteGroupStore {
    #[instrument(skip(self, group), fields(name = %group.name))]
    async fn create(&self, mut group: Group) -> GroupResult<Group> {
        group.validate()?;
        let now = Utc::now();
        let permissions = serde_json::to_string(&group.resource_permissions)?;
        let result = sqlx::query(
            "INSERT INTO admin_groups (name, users, resource_permissions, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&group.name)
        .bind(group.members.encode())
        .bind(permissions)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        group.id = result.last_insert_rowid();
        group.created_at = now;
        group.updated_at = now;
        Ok(group)
    }

    async fn get(&self, id: GroupId) -> GroupResult<Group> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| GroupError::NotFound(id.to_string()))?;
        row.try_into()
    }

    async fn list(&self) -> GroupResult<Vec<Group>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id");
        sqlx::query_as::<_, GroupRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Group::try_from)
            .collect()
    }

    async fn find_by_ids(&self, ids: &[GroupId]) -> GroupResult<Vec<Group>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("{SELECT_COLUMNS} WHERE id IN ({placeholders}) ORDER BY id");
        let mut query = sqlx::query_as::<_, GroupRow>(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Group::try_from)
            .collect()
    }

    async fn update(&self, mut group: Group) -> GroupResult<Group> {
        group.validate()?;
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;
        group.created_at = Self::write_group(&mut *conn, &group, now).await?;
        group.updated_at = now;
        Ok(group)
    }

    async fn delete(&self, id: GroupId) -> GroupResult<()> {
        let result = sqlx::query("DELETE FROM admin_groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(GroupError::NotFound(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, groups), fields(count = groups.len()))]
    async fn save_all(&self, groups: Vec<Group>) -> GroupResult<()> {
        for group in &groups {
            group.validate()?;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        for group in &groups {
            if let Err(err) = Self::write_group(&mut *tx, group, now).await {
                warn!(group_id = group.id, error = %err, "group batch failed, rolling back");
                tx.rollback().await?;
                return Err(err);
            }
        }
        tx.commit().await?;

        info!(count = groups.len(), "group batch committed");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

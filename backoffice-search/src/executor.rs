//! Query execution.
//!
//! [`QueryExecutor`] runs compiled statements and hands rows back as JSON
//! records keyed by field name. [`SqliteExecutor`] (feature `sqlite`) runs
//! them on a sqlx pool.

use async_trait::async_trait;
use sea_query::SelectStatement;

use crate::error::SearchResult;
use crate::schema::ModelSchema;

/// A fetched row, keyed by field name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Runs search statements.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Fetch rows; columns arrive in the order of `schema.fields()`.
    async fn fetch_all(&self, schema: &ModelSchema, statement: &SelectStatement) -> SearchResult<Vec<Record>>;

    /// Run a statement selecting a single count.
    async fn count(&self, statement: &SelectStatement) -> SearchResult<u64>;
}

#[cfg(feature = "sqlite")]
pub use sqlite_impl::SqliteExecutor;

#[cfg(feature = "sqlite")]
mod sqlite_impl {
    use super::*;
    use crate::error::SearchError;
    use crate::schema::FieldKind;
    use chrono::{DateTime, Utc};
    use sea_query::{SqliteQueryBuilder, Value, Values};
    use serde_json::Value as Json;
    use sqlx::query::Query;
    use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
    use sqlx::{Row, Sqlite};
    use tracing::debug;

    type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

    /// Executes statements on a SQLite pool.
    #[derive(Debug, Clone)]
    pub struct SqliteExecutor {
        pool: SqlitePool,
    }

    impl SqliteExecutor {
        /// Wrap an existing pool.
        pub fn new(pool: SqlitePool) -> Self {
            Self { pool }
        }

        /// The underlying pool.
        pub fn pool(&self) -> &SqlitePool {
            &self.pool
        }
    }

    fn bind_values(mut query: SqliteQuery<'_>, values: Values) -> SearchResult<SqliteQuery<'_>> {
        for value in values.0 {
            query = match value {
                Value::Bool(v) => query.bind(v),
                Value::TinyInt(v) => query.bind(v.map(i64::from)),
                Value::SmallInt(v) => query.bind(v.map(i64::from)),
                Value::Int(v) => query.bind(v.map(i64::from)),
                Value::BigInt(v) => query.bind(v),
                Value::TinyUnsigned(v) => query.bind(v.map(i64::from)),
                Value::SmallUnsigned(v) => query.bind(v.map(i64::from)),
                Value::Unsigned(v) => query.bind(v.map(i64::from)),
                Value::BigUnsigned(v) => {
                    let v = v
                        .map(i64::try_from)
                        .transpose()
                        .map_err(|_| SearchError::UnsupportedValue("unsigned value out of range".to_string()))?;
                    query.bind(v)
                }
                Value::Float(v) => query.bind(v.map(f64::from)),
                Value::Double(v) => query.bind(v),
                Value::String(v) => query.bind(v.map(|s| *s)),
                Value::Char(v) => query.bind(v.map(|c| c.to_string())),
                Value::Bytes(v) => query.bind(v.map(|b| *b)),
                Value::ChronoDateTimeUtc(v) => query.bind(v.map(|d| *d)),
                Value::ChronoDateTime(v) => query.bind(v.map(|d| *d)),
                Value::ChronoDate(v) => query.bind(v.map(|d| *d)),
                other => return Err(SearchError::UnsupportedValue(format!("{other:?}"))),
            };
        }
        Ok(query)
    }

    fn decode_row(schema: &ModelSchema, row: &SqliteRow) -> SearchResult<Record> {
        let mut record = Record::new();
        for (index, field) in schema.fields().iter().enumerate() {
            let value = match field.kind {
                FieldKind::String => row.try_get::<Option<String>, _>(index)?.map(Json::String),
                FieldKind::Integer => row.try_get::<Option<i64>, _>(index)?.map(Json::from),
                FieldKind::Float => row
                    .try_get::<Option<f64>, _>(index)?
                    .and_then(serde_json::Number::from_f64)
                    .map(Json::Number),
                FieldKind::Bool => row.try_get::<Option<bool>, _>(index)?.map(Json::Bool),
                FieldKind::Time => row
                    .try_get::<Option<DateTime<Utc>>, _>(index)?
                    .map(|t| Json::String(t.to_rfc3339())),
            };
            record.insert(field.name.clone(), value.unwrap_or(Json::Null));
        }
        Ok(record)
    }

    #[async_trait]
    impl QueryExecutor for SqliteExecutor {
        async fn fetch_all(&self, schema: &ModelSchema, statement: &SelectStatement) -> SearchResult<Vec<Record>> {
            let (sql, values) = statement.build(SqliteQueryBuilder);
            debug!(%sql, "fetching records");
            let rows = bind_values(sqlx::query(&sql), values)?.fetch_all(&self.pool).await?;
            rows.iter().map(|row| decode_row(schema, row)).collect()
        }

        async fn count(&self, statement: &SelectStatement) -> SearchResult<u64> {
            let (sql, values) = statement.build(SqliteQueryBuilder);
            debug!(%sql, "counting records");
            let row = bind_values(sqlx::query(&sql), values)?.fetch_one(&self.pool).await?;
            let total: i64 = row.try_get(0)?;
            Ok(u64::try_from(total).unwrap_or(0))
        }
    }
}

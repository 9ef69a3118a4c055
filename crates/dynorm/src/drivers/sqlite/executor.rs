//! SQLite executor.
//!
//! Uses SQLx for connection pooling and async query execution. SQLite values
//! carry their own storage class, so rows are decoded from the runtime type
//! of each value rather than the declared column type.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::traits::Executor;
use crate::core::{Command, Record, SqlNullType, SqlValue};
use crate::drivers::common::{prepare, PlaceholderStyle};
use crate::error::{OrmError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Placeholder introducers accepted in SQLite command text.
const PREFIXES: &[char] = &['@', ':'];

/// SQLite executor backed by an SQLx pool.
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Open a pool for `config.database` (a file path or `:memory:`).
    ///
    /// An in-memory database lives only as long as its connection, so the
    /// pool is pinned to one connection that is never recycled.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let in_memory = config.database.is_empty() || config.database == ":memory:";

        let pool = if in_memory {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .acquire_timeout(POOL_CONNECTION_TIMEOUT)
                .connect_with(options)
                .await
                .map_err(|e| OrmError::pool(e, "creating in-memory SQLite pool"))?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(&config.database)
                .create_if_missing(true);
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(POOL_CONNECTION_TIMEOUT)
                .connect_with(options)
                .await
                .map_err(|e| OrmError::pool(e, format!("opening SQLite database {}", config.database)))?
        };

        info!(
            "Connected to SQLite: {}",
            if in_memory { ":memory:" } else { config.database.as_str() }
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn bind<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: &SqlValue,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            SqlValue::Null(t) => match t {
                SqlNullType::Bool => query.bind(None::<bool>),
                SqlNullType::I16 | SqlNullType::I32 | SqlNullType::I64 => query.bind(None::<i64>),
                SqlNullType::F32 | SqlNullType::F64 => query.bind(None::<f64>),
                SqlNullType::Bytes => query.bind(None::<Vec<u8>>),
                _ => query.bind(None::<String>),
            },
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::I16(v) => query.bind(i64::from(*v)),
            SqlValue::I32(v) => query.bind(i64::from(*v)),
            SqlValue::I64(v) => query.bind(*v),
            SqlValue::F32(v) => query.bind(f64::from(*v)),
            SqlValue::F64(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bytes(v) => query.bind(v.clone()),
            SqlValue::Uuid(v) => query.bind(v.to_string()),
            SqlValue::Decimal(v) => query.bind(v.to_string()),
            SqlValue::DateTime(v) => query.bind(*v),
            SqlValue::DateTimeOffset(v) => query.bind(*v),
            SqlValue::Date(v) => query.bind(*v),
            SqlValue::Time(v) => query.bind(*v),
        }
    }

    fn build_query<'q>(sql: &'q str, params: &[&crate::core::Parameter]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        params
            .iter()
            .fold(sqlx::query(sql), |query, p| Self::bind(query, &p.value))
    }

    /// Convert a SQLite row to a [`Record`].
    fn row_to_record(row: &SqliteRow) -> Record {
        row.columns()
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name().to_string(), Self::decode(row, i)))
            .collect()
    }

    fn decode(row: &SqliteRow, i: usize) -> SqlValue {
        let type_name = match row.try_get_raw(i) {
            Ok(raw) if raw.is_null() => return SqlValue::Null(SqlNullType::String),
            Ok(raw) => raw.type_info().name().to_uppercase(),
            Err(_) => return SqlValue::Null(SqlNullType::String),
        };

        let decoded = match type_name.as_str() {
            "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => row.try_get::<i64, _>(i).ok().map(SqlValue::I64),
            "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row.try_get::<f64, _>(i).ok().map(SqlValue::F64),
            "BLOB" => row.try_get::<Vec<u8>, _>(i).ok().map(SqlValue::Bytes),
            _ => row.try_get::<String, _>(i).ok().map(SqlValue::Text),
        };

        decoded
            .or_else(|| row.try_get::<i64, _>(i).ok().map(SqlValue::I64))
            .or_else(|| row.try_get::<f64, _>(i).ok().map(SqlValue::F64))
            .or_else(|| row.try_get::<String, _>(i).ok().map(SqlValue::Text))
            .or_else(|| row.try_get::<Vec<u8>, _>(i).ok().map(SqlValue::Bytes))
            .unwrap_or(SqlValue::Null(SqlNullType::String))
    }
}

#[async_trait]
impl Executor for SqliteExecutor {
    async fn query(&self, command: &Command) -> Result<Vec<Record>> {
        let prepared = prepare(command, PREFIXES, PlaceholderStyle::Question)?;
        debug!(sql = %prepared.sql, params = prepared.params.len(), "sqlite query");
        let rows = Self::build_query(&prepared.sql, &prepared.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    async fn execute(&self, command: &Command) -> Result<u64> {
        let prepared = prepare(command, PREFIXES, PlaceholderStyle::Question)?;
        debug!(sql = %prepared.sql, params = prepared.params.len(), "sqlite execute");
        let result = Self::build_query(&prepared.sql, &prepared.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_and_fetch_identity(
        &self,
        insert: &Command,
        identity: &Command,
    ) -> Result<Option<SqlValue>> {
        let insert = prepare(insert, PREFIXES, PlaceholderStyle::Question)?;
        let identity = prepare(identity, PREFIXES, PlaceholderStyle::Question)?;
        debug!(sql = %insert.sql, identity = %identity.sql, "sqlite insert");

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| OrmError::pool(e, "acquiring SQLite connection for insert"))?;
        Self::build_query(&insert.sql, &insert.params)
            .execute(&mut *conn)
            .await?;
        let row = Self::build_query(&identity.sql, &identity.params)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| Self::decode(&r, 0)))
    }

    fn db_type(&self) -> &str {
        "sqlite"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

//! MySQL/MariaDB executor.
//!
//! Uses SQLx for connection pooling and async query execution.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow,
    MySqlSslMode,
};
use sqlx::query::Query;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::traits::Executor;
use crate::core::{Command, Parameter, Record, SqlNullType, SqlValue};
use crate::drivers::common::{prepare, PlaceholderStyle};
use crate::drivers::SslMode;
use crate::error::{OrmError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Placeholder introducers accepted in MySQL command text.
const PREFIXES: &[char] = &['?', '@'];

/// MySQL/MariaDB executor backed by an SQLx pool.
pub struct MysqlExecutor {
    pool: MySqlPool,
}

impl MysqlExecutor {
    /// Create a new MySQL executor from configuration.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let ssl_mode = match config.ssl_mode {
            SslMode::Disable => MySqlSslMode::Disabled,
            SslMode::Require => MySqlSslMode::Required,
            SslMode::VerifyCa => MySqlSslMode::VerifyCa,
            SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
        };
        let port = config.port_or_default();

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(ssl_mode);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| OrmError::pool(e, "creating MySQL pool"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| OrmError::pool(e, "testing MySQL connection"))?;

        info!("Connected to MySQL: {}:{}/{}", config.host, port, config.database);

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn bind<'q>(
        query: Query<'q, MySql, MySqlArguments>,
        value: &SqlValue,
    ) -> Query<'q, MySql, MySqlArguments> {
        match value {
            SqlValue::Null(t) => match t {
                SqlNullType::Bool => query.bind(None::<bool>),
                SqlNullType::I16 => query.bind(None::<i16>),
                SqlNullType::I32 => query.bind(None::<i32>),
                SqlNullType::I64 => query.bind(None::<i64>),
                SqlNullType::F32 => query.bind(None::<f32>),
                SqlNullType::F64 => query.bind(None::<f64>),
                SqlNullType::Bytes => query.bind(None::<Vec<u8>>),
                SqlNullType::Decimal => query.bind(None::<rust_decimal::Decimal>),
                SqlNullType::DateTime | SqlNullType::DateTimeOffset => {
                    query.bind(None::<chrono::NaiveDateTime>)
                }
                SqlNullType::Date => query.bind(None::<chrono::NaiveDate>),
                SqlNullType::Time => query.bind(None::<chrono::NaiveTime>),
                SqlNullType::String | SqlNullType::Uuid => query.bind(None::<String>),
            },
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::I16(v) => query.bind(*v),
            SqlValue::I32(v) => query.bind(*v),
            SqlValue::I64(v) => query.bind(*v),
            SqlValue::F32(v) => query.bind(*v),
            SqlValue::F64(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bytes(v) => query.bind(v.clone()),
            // CHAR(36) is the conventional GUID column in MySQL.
            SqlValue::Uuid(v) => query.bind(v.to_string()),
            SqlValue::Decimal(v) => query.bind(*v),
            SqlValue::DateTime(v) => query.bind(*v),
            SqlValue::DateTimeOffset(v) => query.bind(v.naive_utc()),
            SqlValue::Date(v) => query.bind(*v),
            SqlValue::Time(v) => query.bind(*v),
        }
    }

    fn build_query<'q>(sql: &'q str, params: &[&Parameter]) -> Query<'q, MySql, MySqlArguments> {
        params
            .iter()
            .fold(sqlx::query(sql), |query, p| Self::bind(query, &p.value))
    }

    /// Convert a MySQL row to a [`Record`].
    fn row_to_record(row: &MySqlRow) -> Record {
        row.columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let data_type = col.type_info().name().to_lowercase();
                (col.name().to_string(), Self::decode(row, i, &data_type))
            })
            .collect()
    }

    fn decode(row: &MySqlRow, i: usize, data_type: &str) -> SqlValue {
        // Handle NULL values
        let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
        if is_null {
            return SqlValue::Null(Self::null_type_for(data_type));
        }

        match data_type {
            // Integer types
            "boolean" | "bool" => row
                .try_get::<bool, _>(i)
                .map(SqlValue::Bool)
                .unwrap_or(SqlValue::Null(SqlNullType::Bool)),
            "tinyint" => row
                .try_get::<i8, _>(i)
                .map(|v| SqlValue::I16(i16::from(v)))
                .unwrap_or(SqlValue::Null(SqlNullType::I16)),
            "smallint" | "tinyint unsigned" => row
                .try_get::<i16, _>(i)
                .map(SqlValue::I16)
                .or_else(|_| row.try_get::<u8, _>(i).map(|v| SqlValue::I16(i16::from(v))))
                .unwrap_or(SqlValue::Null(SqlNullType::I16)),
            "mediumint" | "int" | "integer" | "smallint unsigned" | "mediumint unsigned" => row
                .try_get::<i32, _>(i)
                .map(SqlValue::I32)
                .or_else(|_| row.try_get::<u16, _>(i).map(|v| SqlValue::I32(i32::from(v))))
                .or_else(|_| row.try_get::<u32, _>(i).map(|v| SqlValue::I64(i64::from(v))))
                .unwrap_or(SqlValue::Null(SqlNullType::I32)),
            "bigint" | "int unsigned" | "year" => row
                .try_get::<i64, _>(i)
                .map(SqlValue::I64)
                .or_else(|_| row.try_get::<u32, _>(i).map(|v| SqlValue::I64(i64::from(v))))
                .or_else(|_| row.try_get::<u16, _>(i).map(|v| SqlValue::I64(i64::from(v))))
                .unwrap_or(SqlValue::Null(SqlNullType::I64)),
            // LAST_INSERT_ID() and COUNT(*) come back unsigned.
            "bigint unsigned" => row
                .try_get::<u64, _>(i)
                .map(|v| match i64::try_from(v) {
                    Ok(v) => SqlValue::I64(v),
                    Err(_) => SqlValue::Decimal(rust_decimal::Decimal::from(v)),
                })
                .unwrap_or(SqlValue::Null(SqlNullType::I64)),

            // Floating point
            "float" => row
                .try_get::<f32, _>(i)
                .map(SqlValue::F32)
                .unwrap_or(SqlValue::Null(SqlNullType::F32)),
            "double" | "real" => row
                .try_get::<f64, _>(i)
                .map(SqlValue::F64)
                .unwrap_or(SqlValue::Null(SqlNullType::F64)),

            // Decimal
            "decimal" | "numeric" => row
                .try_get::<rust_decimal::Decimal, _>(i)
                .map(SqlValue::Decimal)
                .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),

            // Binary types
            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "bit" => row
                .try_get::<Vec<u8>, _>(i)
                .map(SqlValue::Bytes)
                .unwrap_or(SqlValue::Null(SqlNullType::Bytes)),

            // Date/Time types
            "date" => row
                .try_get::<chrono::NaiveDate, _>(i)
                .map(SqlValue::Date)
                .unwrap_or(SqlValue::Null(SqlNullType::Date)),
            "time" => row
                .try_get::<chrono::NaiveTime, _>(i)
                .map(SqlValue::Time)
                .unwrap_or(SqlValue::Null(SqlNullType::Time)),
            "datetime" | "timestamp" => row
                .try_get::<chrono::NaiveDateTime, _>(i)
                .map(SqlValue::DateTime)
                .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),

            // Strings, JSON, ENUM, SET
            _ => row
                .try_get::<String, _>(i)
                .map(SqlValue::Text)
                .or_else(|_| row.try_get::<Vec<u8>, _>(i).map(SqlValue::Bytes))
                .unwrap_or(SqlValue::Null(SqlNullType::String)),
        }
    }

    /// Get the appropriate null type for a MySQL data type.
    fn null_type_for(data_type: &str) -> SqlNullType {
        match data_type {
            "boolean" | "bool" => SqlNullType::Bool,
            "tinyint" | "smallint" | "tinyint unsigned" => SqlNullType::I16,
            "mediumint" | "int" | "integer" | "smallint unsigned" | "mediumint unsigned" => {
                SqlNullType::I32
            }
            "bigint" | "bigint unsigned" | "int unsigned" | "year" => SqlNullType::I64,
            "float" => SqlNullType::F32,
            "double" | "real" => SqlNullType::F64,
            "decimal" | "numeric" => SqlNullType::Decimal,
            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "bit" => {
                SqlNullType::Bytes
            }
            "date" => SqlNullType::Date,
            "time" => SqlNullType::Time,
            "datetime" | "timestamp" => SqlNullType::DateTime,
            _ => SqlNullType::String,
        }
    }
}

#[async_trait]
impl Executor for MysqlExecutor {
    async fn query(&self, command: &Command) -> Result<Vec<Record>> {
        let prepared = prepare(command, PREFIXES, PlaceholderStyle::Question)?;
        debug!(sql = %prepared.sql, params = prepared.params.len(), "mysql query");
        let rows = Self::build_query(&prepared.sql, &prepared.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    async fn execute(&self, command: &Command) -> Result<u64> {
        let prepared = prepare(command, PREFIXES, PlaceholderStyle::Question)?;
        debug!(sql = %prepared.sql, params = prepared.params.len(), "mysql execute");
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
        debug!(sql = %insert.sql, identity = %identity.sql, "mysql insert");

        // LAST_INSERT_ID() is per connection.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| OrmError::pool(e, "acquiring MySQL connection for insert"))?;
        Self::build_query(&insert.sql, &insert.params)
            .execute(&mut *conn)
            .await?;
        let row = Self::build_query(&identity.sql, &identity.params)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.and_then(|r| Self::row_to_record(&r).into_iter().next().map(|(_, v)| v)))
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

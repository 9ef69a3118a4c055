//! PostgreSQL executor.
//!
//! Uses deadpool-postgres for connection pooling and tokio-postgres for
//! execution. Parameters are bound through [`PgParam`], which converts a
//! [`SqlValue`] to whatever type the server inferred for the placeholder.

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::Config as PgConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ConnectionConfig;
use crate::core::traits::Executor;
use crate::core::{Command, Parameter, Record, SqlNullType, SqlValue};
use crate::drivers::common::{postgres_connector, prepare, PlaceholderStyle};
use crate::error::{OrmError, Result};

/// Placeholder introducers accepted in PostgreSQL command text.
const PREFIXES: &[char] = &[':', '@'];

type BoxError = Box<dyn StdError + Sync + Send>;

/// PostgreSQL executor backed by a deadpool pool.
pub struct PostgresExecutor {
    pool: Pool,
}

impl PostgresExecutor {
    /// Create a new PostgreSQL executor from configuration.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let port = config.port_or_default();
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.application_name("dynorm");

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let max_size = config.max_connections as usize;

        let pool = match postgres_connector(config) {
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_size)
                    .build()
                    .map_err(|e| OrmError::pool(e, "creating PostgreSQL pool"))?
            }
            Some(tls_connector) => {
                let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_size)
                    .build()
                    .map_err(|e| OrmError::pool(e, "creating PostgreSQL pool"))?
            }
        };

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| OrmError::pool(e, "testing PostgreSQL connection"))?;
        client.simple_query("SELECT 1").await?;

        info!("Connected to PostgreSQL: {}:{}/{}", config.host, port, config.database);

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| OrmError::pool(e, "acquiring PostgreSQL connection"))
    }
}

/// Borrowed [`SqlValue`] bound as a tokio-postgres parameter.
#[derive(Debug)]
struct PgParam<'a>(&'a SqlValue);

impl PgParam<'_> {
    fn integer(v: i64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match *ty {
            Type::INT2 => i16::try_from(v)?.to_sql_checked(ty, out),
            Type::INT4 => i32::try_from(v)?.to_sql_checked(ty, out),
            Type::FLOAT4 => (v as f32).to_sql_checked(ty, out),
            Type::FLOAT8 => (v as f64).to_sql_checked(ty, out),
            Type::NUMERIC => Decimal::from(v).to_sql_checked(ty, out),
            Type::BOOL => (v != 0).to_sql_checked(ty, out),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql_checked(ty, out),
            _ => v.to_sql_checked(ty, out),
        }
    }

    fn float(v: f64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match *ty {
            Type::FLOAT4 => (v as f32).to_sql_checked(ty, out),
            Type::NUMERIC => Decimal::from_f64(v)
                .ok_or_else(|| format!("{} does not fit NUMERIC", v))?
                .to_sql_checked(ty, out),
            _ => v.to_sql_checked(ty, out),
        }
    }

    fn text(v: &str, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match *ty {
            Type::UUID => Uuid::parse_str(v)?.to_sql_checked(ty, out),
            Type::JSON | Type::JSONB => {
                serde_json::from_str::<serde_json::Value>(v)?.to_sql_checked(ty, out)
            }
            Type::INT2 | Type::INT4 | Type::INT8 => Self::integer(v.trim().parse()?, ty, out),
            _ => v.to_sql_checked(ty, out),
        }
    }
}

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self.0 {
            SqlValue::Null(_) => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql_checked(ty, out),
            SqlValue::I16(v) => Self::integer(i64::from(*v), ty, out),
            SqlValue::I32(v) => Self::integer(i64::from(*v), ty, out),
            SqlValue::I64(v) => Self::integer(*v, ty, out),
            SqlValue::F32(v) => Self::float(f64::from(*v), ty, out),
            SqlValue::F64(v) => Self::float(*v, ty, out),
            SqlValue::Text(v) => Self::text(v, ty, out),
            SqlValue::Bytes(v) => v.as_slice().to_sql_checked(ty, out),
            SqlValue::Uuid(v) => match *ty {
                Type::UUID => v.to_sql_checked(ty, out),
                _ => v.to_string().to_sql_checked(ty, out),
            },
            SqlValue::Decimal(v) => match *ty {
                Type::FLOAT8 => v
                    .to_f64()
                    .ok_or("decimal out of range for float8")?
                    .to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::DateTime(v) => match *ty {
                Type::TIMESTAMPTZ => v.and_utc().to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::DateTimeOffset(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Date(v) => v.to_sql_checked(ty, out),
            SqlValue::Time(v) => v.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Convert a PostgreSQL row value to [`SqlValue`] based on its column type.
fn convert_pg_row_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> SqlValue {
    match ty.name() {
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null(SqlNullType::Bool)),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::I16)
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::I32)
            .unwrap_or(SqlValue::Null(SqlNullType::I32)),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::I64)
            .unwrap_or(SqlValue::Null(SqlNullType::I64)),
        "oid" => row
            .try_get::<_, Option<u32>>(idx)
            .ok()
            .flatten()
            .map(|v| SqlValue::I64(i64::from(v)))
            .unwrap_or(SqlValue::Null(SqlNullType::I64)),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::F32)
            .unwrap_or(SqlValue::Null(SqlNullType::F32)),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::F64)
            .unwrap_or(SqlValue::Null(SqlNullType::F64)),
        "uuid" => row
            .try_get::<_, Option<Uuid>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Uuid)
            .unwrap_or(SqlValue::Null(SqlNullType::Uuid)),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<FixedOffset>>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::DateTimeOffset)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTimeOffset)),
        "date" => row
            .try_get::<_, Option<NaiveDate>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null(SqlNullType::Date)),
        "time" => row
            .try_get::<_, Option<NaiveTime>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null(SqlNullType::Time)),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Bytes)
            .unwrap_or(SqlValue::Null(SqlNullType::Bytes)),
        "numeric" => row
            .try_get::<_, Option<Decimal>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),
        "json" | "jsonb" => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .ok()
            .flatten()
            .map(|v| SqlValue::Text(v.to_string()))
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
        _ => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
    }
}

fn row_to_record(row: &tokio_postgres::Row) -> Record {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), convert_pg_row_value(row, i, col.type_())))
        .collect()
}

fn bind_params<'a>(params: &[&'a Parameter]) -> Vec<PgParam<'a>> {
    params.iter().map(|p| PgParam(&p.value)).collect()
}

fn as_refs<'a>(params: &'a [PgParam<'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl Executor for PostgresExecutor {
    async fn query(&self, command: &Command) -> Result<Vec<Record>> {
        let prepared = prepare(command, PREFIXES, PlaceholderStyle::Dollar)?;
        debug!(sql = %prepared.sql, params = prepared.params.len(), "postgres query");
        let params = bind_params(&prepared.params);
        let client = self.client().await?;
        let rows = client.query(prepared.sql.as_str(), &as_refs(&params)).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn execute(&self, command: &Command) -> Result<u64> {
        let prepared = prepare(command, PREFIXES, PlaceholderStyle::Dollar)?;
        debug!(sql = %prepared.sql, params = prepared.params.len(), "postgres execute");
        let params = bind_params(&prepared.params);
        let client = self.client().await?;
        Ok(client.execute(prepared.sql.as_str(), &as_refs(&params)).await?)
    }

    async fn insert_and_fetch_identity(
        &self,
        insert: &Command,
        identity: &Command,
    ) -> Result<Option<SqlValue>> {
        let insert = prepare(insert, PREFIXES, PlaceholderStyle::Dollar)?;
        let identity = prepare(identity, PREFIXES, PlaceholderStyle::Dollar)?;
        debug!(sql = %insert.sql, identity = %identity.sql, "postgres insert");

        // lastval() is session scoped.
        let client = self.client().await?;
        let insert_params = bind_params(&insert.params);
        client
            .execute(insert.sql.as_str(), &as_refs(&insert_params))
            .await?;
        let identity_params = bind_params(&identity.params);
        let row = client
            .query_opt(identity.sql.as_str(), &as_refs(&identity_params))
            .await?;
        Ok(row.map(|r| convert_pg_row_value(&r, 0, r.columns()[0].type_())))
    }

    fn db_type(&self) -> &str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close();
    }
}

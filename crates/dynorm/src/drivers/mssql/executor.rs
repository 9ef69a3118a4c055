//! SQL Server executor.
//!
//! Uses Tiberius with bb8 connection pooling. Command text is rewritten to
//! `@P1..@Pn` placeholders and parameters are bound positionally, with typed
//! NULLs so the server sees the intended parameter type.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::core::traits::Executor;
use crate::core::{Command, Parameter, Record, SqlNullType, SqlValue};
use crate::drivers::common::{prepare, PlaceholderStyle, SslMode};
use crate::error::{OrmError, Result};

/// Placeholder introducers accepted in SQL Server command text.
const PREFIXES: &[char] = &['@'];

/// Maximum TDS packet size.
const TDS_MAX_PACKET_SIZE: u32 = 32767;

/// Connection pool timeouts.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
pub struct TiberiusConnectionManager {
    config: ConnectionConfig,
}

impl TiberiusConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port_or_default());
        config.database(&self.config.database);
        config.application_name("dynorm");
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        match self.config.ssl_mode {
            SslMode::Disable => {
                config.encryption(EncryptionLevel::NotSupported);
            }
            SslMode::Require => {
                config.trust_cert();
                config.encryption(EncryptionLevel::Required);
            }
            SslMode::VerifyCa | SslMode::VerifyFull => {
                config.encryption(EncryptionLevel::Required);
            }
        }
        if self.config.trust_server_cert {
            config.trust_cert();
        }

        config.packet_size(TDS_MAX_PACKET_SIZE);
        config
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();
        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            }
        })?;

        if let Err(e) = tcp.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY on SQL Server connection: {}", e);
        }

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// SQL Server executor backed by a bb8 pool.
pub struct MssqlExecutor {
    pool: Pool<TiberiusConnectionManager>,
}

impl MssqlExecutor {
    /// Create a new SQL Server executor from configuration.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        if config.ssl_mode == SslMode::Disable {
            warn!("SQL Server encryption is disabled. Credentials will be transmitted in plaintext.");
        }

        let manager = TiberiusConnectionManager::new(config.clone());
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .max_lifetime(Some(POOL_MAX_LIFETIME))
            .build(manager)
            .await
            .map_err(|e| OrmError::pool(e, "creating SQL Server pool"))?;

        // Test connection
        {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| OrmError::pool(e, "testing SQL Server connection"))?;
            conn.simple_query("SELECT 1").await?.into_row().await?;
        }

        info!(
            "Connected to SQL Server: {}:{}/{} (pool_size={})",
            config.host,
            config.port_or_default(),
            config.database,
            config.max_connections
        );

        Ok(Self { pool })
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| OrmError::pool(e, "acquiring SQL Server connection"))
    }

    fn build_query<'a>(sql: &'a str, params: &[&'a Parameter]) -> Query<'a> {
        let mut query = Query::new(sql);
        for p in params {
            bind(&mut query, &p.value);
        }
        query
    }
}

fn bind<'a>(query: &mut Query<'a>, value: &'a SqlValue) {
    match value {
        SqlValue::Null(t) => match t {
            SqlNullType::Bool => query.bind(None::<bool>),
            SqlNullType::I16 => query.bind(None::<i16>),
            SqlNullType::I32 => query.bind(None::<i32>),
            SqlNullType::I64 => query.bind(None::<i64>),
            SqlNullType::F32 => query.bind(None::<f32>),
            SqlNullType::F64 => query.bind(None::<f64>),
            SqlNullType::String => query.bind(None::<String>),
            SqlNullType::Bytes => query.bind(None::<Vec<u8>>),
            SqlNullType::Uuid => query.bind(None::<uuid::Uuid>),
            SqlNullType::Decimal => query.bind(None::<Decimal>),
            SqlNullType::DateTime => query.bind(None::<NaiveDateTime>),
            SqlNullType::DateTimeOffset => query.bind(None::<DateTime<FixedOffset>>),
            SqlNullType::Date => query.bind(None::<NaiveDate>),
            SqlNullType::Time => query.bind(None::<NaiveTime>),
        },
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::I16(v) => query.bind(*v),
        SqlValue::I32(v) => query.bind(*v),
        SqlValue::I64(v) => query.bind(*v),
        SqlValue::F32(v) => query.bind(*v),
        SqlValue::F64(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Uuid(v) => query.bind(*v),
        SqlValue::Decimal(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::DateTimeOffset(v) => query.bind(*v),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Time(v) => query.bind(*v),
    }
}

/// Convert a cell to [`SqlValue`] based on the TDS value it carries.
fn convert_column_data(data: &ColumnData<'static>) -> SqlValue {
    match data {
        ColumnData::U8(v) => v
            .map(|v| SqlValue::I16(i16::from(v)))
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),
        ColumnData::I16(v) => v.map(SqlValue::I16).unwrap_or(SqlValue::Null(SqlNullType::I16)),
        ColumnData::I32(v) => v.map(SqlValue::I32).unwrap_or(SqlValue::Null(SqlNullType::I32)),
        ColumnData::I64(v) => v.map(SqlValue::I64).unwrap_or(SqlValue::Null(SqlNullType::I64)),
        ColumnData::F32(v) => v.map(SqlValue::F32).unwrap_or(SqlValue::Null(SqlNullType::F32)),
        ColumnData::F64(v) => v.map(SqlValue::F64).unwrap_or(SqlValue::Null(SqlNullType::F64)),
        ColumnData::Bit(v) => v.map(SqlValue::Bool).unwrap_or(SqlValue::Null(SqlNullType::Bool)),
        ColumnData::String(v) => v
            .as_ref()
            .map(|s| SqlValue::Text(s.to_string()))
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
        ColumnData::Guid(v) => v.map(SqlValue::Uuid).unwrap_or(SqlValue::Null(SqlNullType::Uuid)),
        ColumnData::Binary(v) => v
            .as_ref()
            .map(|b| SqlValue::Bytes(b.to_vec()))
            .unwrap_or(SqlValue::Null(SqlNullType::Bytes)),
        ColumnData::Numeric(_) => Decimal::from_sql(data)
            .ok()
            .flatten()
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|x| SqlValue::Text(x.clone().into_owned().into_string()))
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)
                .ok()
                .flatten()
                .map(SqlValue::DateTime)
                .unwrap_or(SqlValue::Null(SqlNullType::DateTime))
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data)
            .ok()
            .flatten()
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null(SqlNullType::Date)),
        ColumnData::Time(_) => NaiveTime::from_sql(data)
            .ok()
            .flatten()
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null(SqlNullType::Time)),
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)
            .ok()
            .flatten()
            .map(SqlValue::DateTimeOffset)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTimeOffset)),
    }
}

fn row_to_record(row: &Row) -> Record {
    row.cells()
        .map(|(col, data)| (col.name().to_string(), convert_column_data(data)))
        .collect()
}

#[async_trait]
impl Executor for MssqlExecutor {
    async fn query(&self, command: &Command) -> Result<Vec<Record>> {
        let prepared = prepare(command, PREFIXES, PlaceholderStyle::AtP)?;
        debug!(sql = %prepared.sql, params = prepared.params.len(), "mssql query");
        let mut conn = self.get_conn().await?;
        let rows = Self::build_query(&prepared.sql, &prepared.params)
            .query(&mut *conn)
            .await?
            .into_first_result()
            .await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn execute(&self, command: &Command) -> Result<u64> {
        let prepared = prepare(command, PREFIXES, PlaceholderStyle::AtP)?;
        debug!(sql = %prepared.sql, params = prepared.params.len(), "mssql execute");
        let mut conn = self.get_conn().await?;
        let result = Self::build_query(&prepared.sql, &prepared.params)
            .execute(&mut *conn)
            .await?;
        Ok(result.total())
    }

    /// Runs the insert and the identity query as one batch, since
    /// `SCOPE_IDENTITY()` only sees inserts from its own scope.
    async fn insert_and_fetch_identity(
        &self,
        insert: &Command,
        identity: &Command,
    ) -> Result<Option<SqlValue>> {
        let mut batch = insert.clone();
        batch.text = format!("{};\n{}", insert.text.trim_end().trim_end_matches(';'), identity.text);
        batch.parameters.extend(identity.parameters.iter().cloned());

        let prepared = prepare(&batch, PREFIXES, PlaceholderStyle::AtP)?;
        debug!(sql = %prepared.sql, "mssql insert");
        let mut conn = self.get_conn().await?;
        let results = Self::build_query(&prepared.sql, &prepared.params)
            .query(&mut *conn)
            .await?
            .into_results()
            .await?;

        Ok(results
            .iter()
            .rev()
            .find_map(|rows| rows.first())
            .and_then(|row| row.cells().next().map(|(_, data)| convert_column_data(data))))
    }

    fn db_type(&self) -> &str {
        "mssql"
    }

    async fn close(&self) {
        // bb8 closes connections when the pool is dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_convert_scalar_cells() {
        assert_eq!(convert_column_data(&ColumnData::I32(Some(7))), SqlValue::I32(7));
        assert_eq!(convert_column_data(&ColumnData::U8(Some(200))), SqlValue::I16(200));
        assert_eq!(
            convert_column_data(&ColumnData::String(Some(Cow::Borrowed("abc")))),
            SqlValue::Text("abc".into())
        );
        assert_eq!(
            convert_column_data(&ColumnData::I64(None)),
            SqlValue::Null(SqlNullType::I64)
        );
    }

    #[test]
    fn test_convert_numeric_cell() {
        let cell = ColumnData::Numeric(Some(tiberius::numeric::Numeric::new_with_scale(12345, 2)));
        assert_eq!(
            convert_column_data(&cell),
            SqlValue::Decimal(Decimal::new(12345, 2))
        );
    }

    #[test]
    fn test_manager_config_uses_default_port() {
        let mut config = ConnectionConfig::new("System.Data.SqlClient");
        config.host = "db.local".into();
        config.database = "Northwind".into();
        let manager = TiberiusConnectionManager::new(config);
        assert_eq!(manager.build_config().get_addr(), "db.local:1433");
    }

    #[test]
    fn test_placeholders_become_positional() {
        let command = Command::new("SELECT * FROM [Users] WHERE [Id] = @id AND [Name] = @name")
            .with_param(Parameter::new("id", 1))
            .with_param(Parameter::new("name", "x"));
        let prepared = prepare(&command, PREFIXES, PlaceholderStyle::AtP).unwrap();
        assert_eq!(
            prepared.sql,
            "SELECT * FROM [Users] WHERE [Id] = @P1 AND [Name] = @P2"
        );
    }
}

//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`mssql`]: Microsoft SQL Server (plugin; tiberius executor behind `mssql`)
//! - [`oracle`]: Oracle (plugin only)
//! - [`mysql`]: MySQL/MariaDB (plugin; sqlx executor behind `mysql`)
//! - [`postgres`]: PostgreSQL (plugin; tokio-postgres executor behind `postgres`)
//! - [`sqlite`]: SQLite (plugin; sqlx executor behind `sqlite`, on by default)
//! - [`common`]: Shared utilities (TLS, placeholder rewriting)
//!
//! # Architecture
//!
//! Each driver module implements:
//! - `DatabasePlugin`: SQL dialect strategy for the database engine
//! - `Executor`: command execution through the vendor's native driver crate
//!
//! # Static dispatch
//!
//! [`PluginImpl`] wraps every built-in plugin in one enum so callers that
//! know the vendor set up front avoid vtable dispatch.
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` with a `plugin.rs`
//! 2. Implement `DatabasePlugin` (and `Executor` when a driver crate exists)
//! 3. Add an enum variant to `PluginImpl` and list it in `PluginImpl::all`
//! 4. Gate the executor with a feature flag in `Cargo.toml`

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::core::traits::{DatabasePlugin, Executor};
use crate::core::{Command, Parameter, Record, SqlValue};
use crate::error::{OrmError, Result};

pub mod common;
pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;

pub use common::SslMode;
pub use mssql::SqlServerPlugin;
pub use mysql::MysqlPlugin;
pub use oracle::OraclePlugin;
pub use postgres::PostgresPlugin;
pub use sqlite::SqlitePlugin;

#[cfg(feature = "mssql")]
pub use mssql::MssqlExecutor;
#[cfg(feature = "mysql")]
pub use mysql::MysqlExecutor;
#[cfg(feature = "postgres")]
pub use postgres::PostgresExecutor;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;

/// Enum-based static dispatch for the built-in plugins.
///
/// The compiler generates a match statement instead of vtable dispatch.
#[derive(Debug, Clone)]
pub enum PluginImpl {
    SqlServer(SqlServerPlugin),
    Oracle(OraclePlugin),
    Mysql(MysqlPlugin),
    Postgres(PostgresPlugin),
    Sqlite(SqlitePlugin),
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $body:expr) => {
        match $self {
            PluginImpl::SqlServer($p) => $body,
            PluginImpl::Oracle($p) => $body,
            PluginImpl::Mysql($p) => $body,
            PluginImpl::Postgres($p) => $body,
            PluginImpl::Sqlite($p) => $body,
        }
    };
}

impl PluginImpl {
    /// Every built-in plugin, one per vendor.
    pub fn all() -> [PluginImpl; 5] {
        [
            PluginImpl::SqlServer(SqlServerPlugin::new()),
            PluginImpl::Oracle(OraclePlugin::new()),
            PluginImpl::Mysql(MysqlPlugin::new()),
            PluginImpl::Postgres(PostgresPlugin::new()),
            PluginImpl::Sqlite(SqlitePlugin::new()),
        ]
    }

    /// Resolve a provider name (case-insensitive) to a built-in plugin.
    pub fn from_provider(provider: &str) -> Option<Self> {
        let lowered = provider.trim().to_lowercase();
        Self::all()
            .into_iter()
            .find(|p| p.provider_names().contains(&lowered.as_str()))
    }
}

impl DatabasePlugin for PluginImpl {
    fn name(&self) -> &str {
        dispatch!(self, p => p.name())
    }

    fn provider_names(&self) -> &'static [&'static str] {
        dispatch!(self, p => p.provider_names())
    }

    fn quote_ident(&self, name: &str) -> String {
        dispatch!(self, p => p.quote_ident(name))
    }

    fn parameter_prefix(&self) -> &str {
        dispatch!(self, p => p.parameter_prefix())
    }

    fn build_select(
        &self,
        columns: &str,
        tables_and_joins: &str,
        where_clause: &str,
        order_by: &str,
        limit: Option<u64>,
    ) -> String {
        dispatch!(self, p => p.build_select(columns, tables_and_joins, where_clause, order_by, limit))
    }

    fn build_paging_query(
        &self,
        columns: &str,
        tables_and_joins: &str,
        order_by: &str,
        where_clause: &str,
        limit: u64,
        offset: u64,
    ) -> String {
        dispatch!(self, p => p.build_paging_query(columns, tables_and_joins, order_by, where_clause, limit, offset))
    }

    fn build_table_info_query(&self, owner: Option<&str>, table_name: &str) -> String {
        dispatch!(self, p => p.build_table_info_query(owner, table_name))
    }

    fn get_column_default(&self, column_info: &Record) -> Option<SqlValue> {
        dispatch!(self, p => p.get_column_default(column_info))
    }

    fn is_sequence_based(&self) -> bool {
        dispatch!(self, p => p.is_sequence_based())
    }

    fn identity_retrieval_function(&self) -> Option<&str> {
        dispatch!(self, p => p.identity_retrieval_function())
    }

    fn build_next_sequence_value(&self, sequence: &str) -> Option<String> {
        dispatch!(self, p => p.build_next_sequence_value(sequence))
    }

    fn set_provider_specific_command_properties(&self, command: &mut Command) {
        dispatch!(self, p => p.set_provider_specific_command_properties(command))
    }

    fn prefix_parameter_name(&self, raw_name: &str, command: Option<&Command>) -> String {
        dispatch!(self, p => p.prefix_parameter_name(raw_name, command))
    }

    fn deprefix_parameter_name(&self, name: &str, command: Option<&Command>) -> String {
        dispatch!(self, p => p.deprefix_parameter_name(name, command))
    }

    fn set_value(&self, parameter: &mut Parameter, value: SqlValue) {
        dispatch!(self, p => p.set_value(parameter, value))
    }

    fn set_cursor(&self, parameter: &mut Parameter, value: SqlValue) -> bool {
        dispatch!(self, p => p.set_cursor(parameter, value))
    }

    fn is_cursor(&self, parameter: &Parameter) -> bool {
        dispatch!(self, p => p.is_cursor(parameter))
    }

    fn build_procedure_call(&self, name: &str, args: &[String]) -> Option<String> {
        dispatch!(self, p => p.build_procedure_call(name, args))
    }
}

/// Open an executor for the vendor `plugin` represents.
///
/// Fails with [`OrmError::Unsupported`] when the vendor's driver feature is
/// not compiled in (and always for Oracle).
pub async fn connect(
    plugin: &dyn DatabasePlugin,
    config: &ConnectionConfig,
) -> Result<Arc<dyn Executor>> {
    match plugin.name() {
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(SqliteExecutor::connect(config).await?)),
        #[cfg(feature = "mysql")]
        "mysql" => Ok(Arc::new(MysqlExecutor::connect(config).await?)),
        #[cfg(feature = "postgres")]
        "postgres" => Ok(Arc::new(PostgresExecutor::connect(config).await?)),
        #[cfg(feature = "mssql")]
        "sqlserver" => Ok(Arc::new(MssqlExecutor::connect(config).await?)),
        other => {
            let _ = config;
            Err(OrmError::Unsupported(format!(
                "no driver compiled in for '{}'. Enabled drivers: {}",
                other,
                enabled_drivers().join(", ")
            )))
        }
    }
}

/// Names of the executors compiled into this build.
pub fn enabled_drivers() -> Vec<&'static str> {
    let mut drivers = Vec::new();
    if cfg!(feature = "sqlite") {
        drivers.push("sqlite");
    }
    if cfg!(feature = "mysql") {
        drivers.push("mysql");
    }
    if cfg!(feature = "postgres") {
        drivers.push("postgres");
    }
    if cfg!(feature = "mssql") {
        drivers.push("sqlserver");
    }
    drivers
}

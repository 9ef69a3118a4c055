//! Core traits for the dialect-plugin architecture.
//!
//! - [`DatabasePlugin`]: SQL dialect and driver-quirk strategy for one vendor
//! - [`Executor`]: runs provider-neutral [`Command`]s through a native driver
//!
//! # Design Patterns
//!
//! - **Strategy**: each vendor plugin provides interchangeable SQL fragments
//! - **Template Method**: default method bodies cover the common case and
//!   vendors override only what differs

use async_trait::async_trait;

use crate::error::Result;

use super::command::{Command, Parameter};
use super::record::Record;
use super::sql;
use super::value::SqlValue;

/// SQL dialect strategy for one database vendor.
///
/// Implementations are stateless and shared freely between threads.
pub trait DatabasePlugin: Send + Sync {
    /// Dialect identifier (e.g. "sqlserver", "postgres").
    fn name(&self) -> &str;

    /// Lowercased provider names this plugin answers to.
    fn provider_names(&self) -> &'static [&'static str];

    /// Quote an identifier.
    fn quote_ident(&self, name: &str) -> String;

    /// Character(s) that introduce a named parameter in SQL text.
    fn parameter_prefix(&self) -> &str;

    /// Build a SELECT with an optional row cap.
    fn build_select(
        &self,
        columns: &str,
        tables_and_joins: &str,
        where_clause: &str,
        order_by: &str,
        limit: Option<u64>,
    ) -> String {
        sql::build_limit_select(columns, tables_and_joins, where_clause, order_by, limit)
    }

    /// Build a paged SELECT returning at most `limit` rows after skipping
    /// `offset` rows in `order_by` order.
    fn build_paging_query(
        &self,
        columns: &str,
        tables_and_joins: &str,
        order_by: &str,
        where_clause: &str,
        limit: u64,
        offset: u64,
    ) -> String;

    /// Query the vendor catalog for the columns of `table_name`.
    ///
    /// `owner` is the schema/owner, `None` when not specified.
    fn build_table_info_query(&self, owner: Option<&str>, table_name: &str) -> String;

    /// Parse the default-value expression of a catalog row.
    ///
    /// Empty or missing defaults give `None`. Unrecognized expressions come
    /// back as text with parentheses removed.
    fn get_column_default(&self, column_info: &Record) -> Option<SqlValue> {
        sql::column_default_text(column_info, "COLUMN_DEFAULT")
            .map(|d| SqlValue::Text(sql::strip_parentheses(d)))
    }

    /// Whether generated keys come from a sequence fetched before the insert.
    fn is_sequence_based(&self) -> bool {
        false
    }

    /// Scalar expression returning the key generated by the last insert.
    fn identity_retrieval_function(&self) -> Option<&str> {
        None
    }

    /// Query returning the next value of `sequence` (sequence-based vendors).
    fn build_next_sequence_value(&self, _sequence: &str) -> Option<String> {
        None
    }

    /// Apply vendor execution flags before the command runs.
    fn set_provider_specific_command_properties(&self, _command: &mut Command) {}

    /// Placeholder text for a named parameter.
    ///
    /// With a command context the raw name is returned unchanged, since the
    /// parameter collection carries names without prefixes.
    fn prefix_parameter_name(&self, raw_name: &str, command: Option<&Command>) -> String {
        match command {
            Some(_) => raw_name.to_string(),
            None => format!("{}{}", self.parameter_prefix(), raw_name),
        }
    }

    /// Inverse of [`DatabasePlugin::prefix_parameter_name`].
    fn deprefix_parameter_name(&self, name: &str, command: Option<&Command>) -> String {
        match command {
            Some(_) => name.to_string(),
            None => name
                .strip_prefix(self.parameter_prefix())
                .unwrap_or(name)
                .to_string(),
        }
    }

    /// Store `value` in `parameter`, applying vendor coercions.
    fn set_value(&self, parameter: &mut Parameter, value: SqlValue) {
        parameter.value = value;
    }

    /// Turn `parameter` into a cursor (result-set) parameter.
    ///
    /// Returns `false` when the vendor has no cursor parameters.
    fn set_cursor(&self, _parameter: &mut Parameter, _value: SqlValue) -> bool {
        false
    }

    /// Whether `parameter` is a cursor parameter.
    fn is_cursor(&self, _parameter: &Parameter) -> bool {
        false
    }

    /// SQL text calling a stored procedure with the given prefixed arguments.
    fn build_procedure_call(&self, _name: &str, _args: &[String]) -> Option<String> {
        None
    }
}

/// Executes commands through a native database driver.
///
/// Executors own their connection pool. Named placeholders in command text
/// are rewritten to the driver's positional form before binding.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a query and return every row.
    async fn query(&self, command: &Command) -> Result<Vec<Record>>;

    /// Run a statement and return the affected-row count.
    async fn execute(&self, command: &Command) -> Result<u64>;

    /// First column of the first row, `None` for an empty result.
    async fn scalar(&self, command: &Command) -> Result<Option<SqlValue>> {
        let rows = self.query(command).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next().map(|(_, v)| v)))
    }

    /// Run `insert`, then `identity` on the same connection, returning the
    /// identity scalar.
    async fn insert_and_fetch_identity(
        &self,
        insert: &Command,
        identity: &Command,
    ) -> Result<Option<SqlValue>>;

    /// Database type identifier (e.g. "sqlite").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

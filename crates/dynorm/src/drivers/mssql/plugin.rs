//! SQL Server dialect plugin (Strategy pattern).
//!
//! Bracket quoting, `@name` parameters, `TOP n` row caps, `ROW_NUMBER()`
//! paging and `SCOPE_IDENTITY()` identity retrieval.

use crate::core::identifier::quote_bracket;
use crate::core::sql;
use crate::core::traits::DatabasePlugin;
use crate::core::{Record, SqlValue};

/// Microsoft SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqlServerPlugin;

impl SqlServerPlugin {
    /// Create a new SQL Server plugin instance.
    pub fn new() -> Self {
        Self
    }
}

impl DatabasePlugin for SqlServerPlugin {
    fn name(&self) -> &str {
        "sqlserver"
    }

    fn provider_names(&self) -> &'static [&'static str] {
        &[
            "system.data.sqlclient",
            "microsoft.data.sqlclient",
            "mssql",
            "sqlserver",
        ]
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_bracket(name)
    }

    fn parameter_prefix(&self) -> &str {
        "@"
    }

    fn build_select(
        &self,
        columns: &str,
        tables_and_joins: &str,
        where_clause: &str,
        order_by: &str,
        limit: Option<u64>,
    ) -> String {
        let top = limit.map(|n| format!("TOP {} ", n)).unwrap_or_default();
        format!(
            "SELECT {}{} FROM {}{}{}",
            top,
            columns,
            tables_and_joins,
            sql::where_fragment(where_clause),
            sql::order_fragment(order_by)
        )
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
        sql::build_row_number_paging_query(
            columns,
            tables_and_joins,
            order_by,
            where_clause,
            limit,
            offset,
        )
    }

    fn build_table_info_query(&self, owner: Option<&str>, table_name: &str) -> String {
        let mut query = format!(
            "SELECT * FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {}",
            sql::quote_literal(table_name)
        );
        if let Some(owner) = owner {
            query.push_str(&format!(" AND TABLE_SCHEMA = {}", sql::quote_literal(owner)));
        }
        query
    }

    fn get_column_default(&self, column_info: &Record) -> Option<SqlValue> {
        let default = sql::column_default_text(column_info, "COLUMN_DEFAULT")?;
        Some(match default {
            "getdate()" | "(getdate())" => SqlValue::now(),
            "newid()" | "(newid())" => SqlValue::Text(uuid::Uuid::new_v4().to_string()),
            other => SqlValue::Text(sql::strip_parentheses(other)),
        })
    }

    fn identity_retrieval_function(&self) -> Option<&str> {
        Some("SCOPE_IDENTITY()")
    }

    fn build_procedure_call(&self, name: &str, args: &[String]) -> Option<String> {
        if args.is_empty() {
            Some(format!("EXEC {}", name))
        } else {
            Some(format!("EXEC {} {}", name, args.join(", ")))
        }
    }
}

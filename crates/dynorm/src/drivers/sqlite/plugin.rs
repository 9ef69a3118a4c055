//! SQLite dialect plugin (Strategy pattern).

use crate::core::identifier::quote_double;
use crate::core::sql;
use crate::core::traits::DatabasePlugin;
use crate::core::{Parameter, Record, SqlValue};

/// SQLite dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqlitePlugin;

impl SqlitePlugin {
    /// Create a new SQLite plugin instance.
    pub fn new() -> Self {
        Self
    }
}

impl DatabasePlugin for SqlitePlugin {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn provider_names(&self) -> &'static [&'static str] {
        &["system.data.sqlite", "microsoft.data.sqlite", "sqlite"]
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn parameter_prefix(&self) -> &str {
        "@"
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
        sql::build_limit_offset_paging_query(
            columns,
            tables_and_joins,
            order_by,
            where_clause,
            limit,
            offset,
        )
    }

    /// `PRAGMA table_info` rows carry `cid, name, type, notnull, dflt_value, pk`.
    fn build_table_info_query(&self, owner: Option<&str>, table_name: &str) -> String {
        match owner {
            Some(owner) => format!(
                "PRAGMA {}.table_info({})",
                quote_double(owner),
                sql::quote_literal(table_name)
            ),
            None => format!("PRAGMA table_info({})", sql::quote_literal(table_name)),
        }
    }

    fn get_column_default(&self, column_info: &Record) -> Option<SqlValue> {
        let default = sql::column_default_text(column_info, "dflt_value")?;
        if default.eq_ignore_ascii_case("CURRENT_TIMESTAMP") {
            return Some(SqlValue::now());
        }
        Some(SqlValue::Text(sql::strip_parentheses(default)))
    }

    fn identity_retrieval_function(&self) -> Option<&str> {
        Some("last_insert_rowid()")
    }

    fn set_value(&self, parameter: &mut Parameter, value: SqlValue) {
        match value {
            SqlValue::Uuid(id) => {
                parameter.value = SqlValue::Text(id.to_string());
                parameter.size = Some(36);
            }
            other => parameter.value = other,
        }
    }
}

//! MySQL/MariaDB dialect plugin (Strategy pattern).
//!
//! Provides MySQL-specific SQL syntax for identifier quoting, paging,
//! catalog queries and parameter placeholders.

use crate::core::identifier::quote_backtick;
use crate::core::sql;
use crate::core::traits::DatabasePlugin;
use crate::core::{Parameter, Record, SqlValue};

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlPlugin;

impl MysqlPlugin {
    /// Create a new MySQL plugin instance.
    pub fn new() -> Self {
        Self
    }
}

impl DatabasePlugin for MysqlPlugin {
    fn name(&self) -> &str {
        "mysql"
    }

    fn provider_names(&self) -> &'static [&'static str] {
        &[
            "mysql.data.mysqlclient",
            "mysqlconnector",
            "devart.data.mysql",
            "mysql",
            "mariadb",
        ]
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn parameter_prefix(&self) -> &str {
        "?"
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

    fn build_table_info_query(&self, owner: Option<&str>, table_name: &str) -> String {
        let schema = owner
            .map(sql::quote_literal)
            .unwrap_or_else(|| "DATABASE()".to_string());
        format!(
            "SELECT * FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {} AND TABLE_SCHEMA = {} \
             ORDER BY ORDINAL_POSITION",
            sql::quote_literal(table_name),
            schema
        )
    }

    fn get_column_default(&self, column_info: &Record) -> Option<SqlValue> {
        let default = sql::column_default_text(column_info, "COLUMN_DEFAULT")?;
        // MariaDB reports `current_timestamp()`, MySQL `CURRENT_TIMESTAMP`.
        if default.eq_ignore_ascii_case("CURRENT_TIMESTAMP")
            || default.eq_ignore_ascii_case("current_timestamp()")
        {
            return Some(SqlValue::now());
        }
        Some(SqlValue::Text(sql::strip_parentheses(default)))
    }

    fn identity_retrieval_function(&self) -> Option<&str> {
        Some("LAST_INSERT_ID()")
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

    fn build_procedure_call(&self, name: &str, args: &[String]) -> Option<String> {
        Some(format!("CALL {}({})", name, args.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let plugin = MysqlPlugin::new();
        assert_eq!(plugin.quote_ident("users"), "`users`");
        assert_eq!(plugin.quote_ident("table`name"), "`table``name`");
    }

    #[test]
    fn test_prefix_parameter_name() {
        let plugin = MysqlPlugin::new();
        assert_eq!(plugin.prefix_parameter_name("0", None), "?0");
        assert_eq!(plugin.deprefix_parameter_name("?0", None), "0");
    }

    #[test]
    fn test_build_paging_query() {
        let plugin = MysqlPlugin::new();
        assert_eq!(
            plugin.build_paging_query("*", "Categories", "CategoryID", "", 5, 10),
            "SELECT * FROM Categories ORDER BY CategoryID LIMIT 5 OFFSET 10"
        );
    }

    #[test]
    fn test_build_table_info_query() {
        let plugin = MysqlPlugin::new();
        let sql = plugin.build_table_info_query(None, "Categories");
        assert!(sql.contains("TABLE_NAME = 'Categories'"));
        assert!(sql.contains("TABLE_SCHEMA = DATABASE()"));
        let sql = plugin.build_table_info_query(Some("northwind"), "Categories");
        assert!(sql.contains("TABLE_SCHEMA = 'northwind'"));
    }

    #[test]
    fn test_column_default() {
        let plugin = MysqlPlugin::new();
        for expr in ["CURRENT_TIMESTAMP", "current_timestamp()"] {
            let row = Record::new().with("COLUMN_DEFAULT", expr);
            assert!(matches!(plugin.get_column_default(&row), Some(SqlValue::DateTime(_))));
        }
        let row = Record::new().with("COLUMN_DEFAULT", "(1)");
        assert_eq!(plugin.get_column_default(&row), Some(SqlValue::Text("1".into())));
    }

    #[test]
    fn test_set_value_guid_as_text() {
        let plugin = MysqlPlugin::new();
        let id = uuid::Uuid::new_v4();
        let mut p = Parameter::new("0", SqlValue::NULL);
        plugin.set_value(&mut p, SqlValue::Uuid(id));
        assert_eq!(p.value.as_str().map(str::len), Some(36));
        assert_eq!(p.size, Some(36));
    }

    #[test]
    fn test_identity_and_procedure() {
        let plugin = MysqlPlugin::new();
        assert_eq!(plugin.identity_retrieval_function(), Some("LAST_INSERT_ID()"));
        assert_eq!(
            plugin.build_procedure_call("rewards_report", &["?0".into()]).as_deref(),
            Some("CALL rewards_report(?0)")
        );
    }
}

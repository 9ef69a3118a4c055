//! Oracle dialect plugin (Strategy pattern).
//!
//! Oracle differs from the other vendors in three ways the ORM cares about:
//! keys come from sequences fetched before the insert, parameters are bound
//! by name with a `:` prefix, and GUIDs must be sent as 36-character text.

use crate::core::identifier::quote_double;
use crate::core::sql;
use crate::core::traits::DatabasePlugin;
use crate::core::{Command, Parameter, Record, SqlValue};

/// Provider type marking a cursor parameter.
pub const REF_CURSOR: &str = "RefCursor";

/// Oracle dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct OraclePlugin;

impl OraclePlugin {
    /// Create a new Oracle plugin instance.
    pub fn new() -> Self {
        Self
    }
}

impl DatabasePlugin for OraclePlugin {
    fn name(&self) -> &str {
        "oracle"
    }

    fn provider_names(&self) -> &'static [&'static str] {
        &[
            "oracle.manageddataaccess.client",
            "oracle.dataaccess.client",
            "oracle",
        ]
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn parameter_prefix(&self) -> &str {
        ":"
    }

    fn build_select(
        &self,
        columns: &str,
        tables_and_joins: &str,
        where_clause: &str,
        order_by: &str,
        limit: Option<u64>,
    ) -> String {
        let inner = sql::build_limit_select(columns, tables_and_joins, where_clause, order_by, None);
        match limit {
            // ROWNUM is assigned before ORDER BY, so the cap goes outside.
            Some(n) => format!("SELECT * FROM ({}) WHERE ROWNUM <= {}", inner, n),
            None => inner,
        }
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
        let inner = sql::build_limit_select(columns, tables_and_joins, where_clause, order_by, None);
        format!(
            "SELECT * FROM (SELECT q.*, ROWNUM AS RowNumber FROM ({}) q WHERE ROWNUM <= {}) \
             WHERE RowNumber > {}",
            inner,
            offset.saturating_add(limit),
            offset
        )
    }

    fn build_table_info_query(&self, owner: Option<&str>, table_name: &str) -> String {
        match owner {
            Some(owner) => format!(
                "SELECT * FROM ALL_TAB_COLUMNS WHERE TABLE_NAME = {} AND OWNER = {}",
                sql::quote_literal(table_name),
                sql::quote_literal(owner)
            ),
            None => format!(
                "SELECT * FROM USER_TAB_COLUMNS WHERE TABLE_NAME = {}",
                sql::quote_literal(table_name)
            ),
        }
    }

    fn get_column_default(&self, column_info: &Record) -> Option<SqlValue> {
        let default = sql::column_default_text(column_info, "DATA_DEFAULT")
            .or_else(|| sql::column_default_text(column_info, "COLUMN_DEFAULT"))?;
        Some(match default {
            "SYSDATE" | "(SYSDATE)" => SqlValue::now(),
            other => SqlValue::Text(sql::strip_parentheses(other)),
        })
    }

    fn is_sequence_based(&self) -> bool {
        true
    }

    fn build_next_sequence_value(&self, sequence: &str) -> Option<String> {
        Some(format!("SELECT {}.NEXTVAL FROM DUAL", sequence))
    }

    fn set_provider_specific_command_properties(&self, command: &mut Command) {
        command.bind_by_name = true;
        command.long_fetch_size = Some(-1);
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

    fn set_cursor(&self, parameter: &mut Parameter, value: SqlValue) -> bool {
        parameter.provider_type = Some(REF_CURSOR.to_string());
        parameter.value = value;
        true
    }

    fn is_cursor(&self, parameter: &Parameter) -> bool {
        parameter.provider_type.as_deref() == Some(REF_CURSOR)
    }

    fn build_procedure_call(&self, name: &str, args: &[String]) -> Option<String> {
        Some(format!("BEGIN {}({}); END;", name, args.join(", ")))
    }
}

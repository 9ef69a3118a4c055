//! PostgreSQL dialect plugin (Strategy pattern).
//!
//! Double-quote identifiers, `:name` parameters, `LIMIT/OFFSET` paging,
//! `refcursor` result sets and `lastval()` identity retrieval.

use crate::core::identifier::quote_double;
use crate::core::sql;
use crate::core::traits::DatabasePlugin;
use crate::core::{Parameter, Record, SqlValue};

/// Provider type marking a cursor parameter.
pub const REFCURSOR: &str = "refcursor";

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresPlugin;

impl PostgresPlugin {
    /// Create a new PostgreSQL plugin instance.
    pub fn new() -> Self {
        Self
    }
}

/// Drop a trailing `::type` cast: `'abc'::character varying` → `'abc'`.
///
/// A `::` inside a quoted literal is part of the value.
fn strip_cast(expr: &str) -> &str {
    let bytes = expr.as_bytes();
    let mut in_literal = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_literal = !in_literal,
            b':' if !in_literal && i > 0 && bytes.get(i + 1) == Some(&b':') => {
                return &expr[..i];
            }
            _ => {}
        }
        i += 1;
    }
    expr
}

impl DatabasePlugin for PostgresPlugin {
    fn name(&self) -> &str {
        "postgres"
    }

    fn provider_names(&self) -> &'static [&'static str] {
        &["npgsql", "postgres", "postgresql", "pg"]
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn parameter_prefix(&self) -> &str {
        ":"
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
        let mut query = format!(
            "SELECT * FROM information_schema.columns WHERE table_name = {}",
            sql::quote_literal(table_name)
        );
        if let Some(owner) = owner {
            query.push_str(&format!(" AND table_schema = {}", sql::quote_literal(owner)));
        }
        query.push_str(" ORDER BY ordinal_position");
        query
    }

    fn get_column_default(&self, column_info: &Record) -> Option<SqlValue> {
        let default = sql::column_default_text(column_info, "column_default")?;
        let lowered = default.to_lowercase();
        if lowered.starts_with("nextval(") {
            return None;
        }
        Some(match lowered.as_str() {
            "current_timestamp" | "now()" | "localtimestamp" => SqlValue::now(),
            "gen_random_uuid()" | "uuid_generate_v4()" => SqlValue::new_uuid(),
            _ => SqlValue::Text(sql::strip_parentheses(strip_cast(default))),
        })
    }

    fn identity_retrieval_function(&self) -> Option<&str> {
        Some("lastval()")
    }

    fn set_cursor(&self, parameter: &mut Parameter, value: SqlValue) -> bool {
        parameter.provider_type = Some(REFCURSOR.to_string());
        parameter.value = value;
        true
    }

    fn is_cursor(&self, parameter: &Parameter) -> bool {
        parameter.provider_type.as_deref() == Some(REFCURSOR)
    }

    fn build_procedure_call(&self, name: &str, args: &[String]) -> Option<String> {
        Some(format!("SELECT * FROM {}({})", name, args.join(", ")))
    }
}

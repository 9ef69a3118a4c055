//! SQL text helpers shared by the vendor plugins.
//!
//! These are the building blocks the plugins compose: the two paging shapes
//! (window-function and LIMIT/OFFSET), clause fragments, literal quoting and
//! default-expression cleanup.

use super::record::Record;

/// ` WHERE {clause}` or an empty string.
pub fn where_fragment(where_clause: &str) -> String {
    let trimmed = where_clause.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", trimmed)
    }
}

/// ` ORDER BY {order_by}` or an empty string.
pub fn order_fragment(order_by: &str) -> String {
    let trimmed = order_by.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", trimmed)
    }
}

/// Plain SELECT with an optional trailing `LIMIT`.
pub fn build_limit_select(
    columns: &str,
    tables_and_joins: &str,
    where_clause: &str,
    order_by: &str,
    limit: Option<u64>,
) -> String {
    let mut sql = format!(
        "SELECT {} FROM {}{}{}",
        columns,
        tables_and_joins,
        where_fragment(where_clause),
        order_fragment(order_by)
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}

/// Paging with `LIMIT .. OFFSET ..` (MySQL, PostgreSQL, SQLite).
pub fn build_limit_offset_paging_query(
    columns: &str,
    tables_and_joins: &str,
    order_by: &str,
    where_clause: &str,
    limit: u64,
    offset: u64,
) -> String {
    format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        columns,
        tables_and_joins,
        where_fragment(where_clause),
        order_fragment(order_by),
        limit,
        offset
    )
}

/// Paging with a `ROW_NUMBER()` window over the requested order.
///
/// The outer query selects `*`, so the `RowNumber` column is part of each
/// returned row. An empty `order_by` numbers rows in arbitrary order.
pub fn build_row_number_paging_query(
    columns: &str,
    tables_and_joins: &str,
    order_by: &str,
    where_clause: &str,
    limit: u64,
    offset: u64,
) -> String {
    let order = if order_by.trim().is_empty() {
        "(SELECT NULL)"
    } else {
        order_by.trim()
    };
    format!(
        "SELECT * FROM (SELECT ROW_NUMBER() OVER (ORDER BY {}) AS RowNumber, {} FROM {}{}) AS Paged \
         WHERE RowNumber > {} AND RowNumber <= {} ORDER BY RowNumber",
        order,
        columns,
        tables_and_joins,
        where_fragment(where_clause),
        offset,
        offset.saturating_add(limit)
    )
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Remove every parenthesis from a default expression: `((0))` → `0`.
pub fn strip_parentheses(expr: &str) -> String {
    expr.replace(['(', ')'], "")
}

/// Read a default-expression field from a catalog row.
///
/// Returns `None` for missing, NULL or empty values.
pub fn column_default_text<'a>(column_info: &'a Record, field: &str) -> Option<&'a str> {
    column_info
        .get_str(field)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Split `owner.table` into its parts. A bare name has no owner.
pub fn split_table_name(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((owner, table)) if !owner.is_empty() => (Some(owner), table),
        _ => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments() {
        assert_eq!(where_fragment(""), "");
        assert_eq!(where_fragment("  "), "");
        assert_eq!(where_fragment("(a = 1)"), " WHERE (a = 1)");
        assert_eq!(order_fragment("Id DESC"), " ORDER BY Id DESC");
        assert_eq!(order_fragment(""), "");
    }

    #[test]
    fn test_limit_offset_paging() {
        let sql = build_limit_offset_paging_query("*", "Users", "Id", "", 10, 20);
        assert_eq!(sql, "SELECT * FROM Users ORDER BY Id LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_row_number_paging() {
        let sql = build_row_number_paging_query("Id, Name", "dbo.Users", "Name DESC", "(Id > 5)", 30, 30);
        assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY Name DESC) AS RowNumber, Id, Name"));
        assert!(sql.contains("FROM dbo.Users WHERE (Id > 5)"));
        assert!(sql.contains("RowNumber > 30 AND RowNumber <= 60"));
        assert!(sql.ends_with("ORDER BY RowNumber"));
    }

    #[test]
    fn test_row_number_paging_without_order() {
        let sql = build_row_number_paging_query("*", "T", "", "", 5, 0);
        assert!(sql.contains("OVER (ORDER BY (SELECT NULL))"));
    }

    #[test]
    fn test_quote_literal_escapes() {
        assert_eq!(quote_literal("Users"), "'Users'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_strip_parentheses() {
        assert_eq!(strip_parentheses("(1)"), "1");
        assert_eq!(strip_parentheses("((0))"), "0");
        assert_eq!(strip_parentheses("'abc'"), "'abc'");
    }

    #[test]
    fn test_column_default_text() {
        let row = Record::new()
            .with("COLUMN_DEFAULT", "  ")
            .with("OTHER", "(1)");
        assert_eq!(column_default_text(&row, "COLUMN_DEFAULT"), None);
        assert_eq!(column_default_text(&row, "other"), Some("(1)"));
        assert_eq!(column_default_text(&row, "absent"), None);
    }

    #[test]
    fn test_split_table_name() {
        assert_eq!(split_table_name("Sales.SalesOrderHeader"), (Some("Sales"), "SalesOrderHeader"));
        assert_eq!(split_table_name("Users"), (None, "Users"));
        assert_eq!(split_table_name(".Users"), (None, ".Users"));
    }

    #[test]
    fn test_row_number_paging_saturates_upper_bound() {
        let sql = build_row_number_paging_query("*", "Items", "Id", "", u64::MAX, 1);
        assert!(sql.contains(&format!("RowNumber > 1 AND RowNumber <= {}", u64::MAX)));
    }
}

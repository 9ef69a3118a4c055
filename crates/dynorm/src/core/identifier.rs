//! Identifier validation and quoting.
//!
//! Table and column names cannot be bound as parameters, so the ORM embeds
//! them in SQL text. Names coming from configuration or from record field
//! names are validated here before they reach a statement, and quoted with
//! the vendor's delimiter when the naming mapper asks for it.

use crate::error::{OrmError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - Oracle: 128 bytes (12.2+)
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty names, names containing null bytes, names over
/// [`MAX_IDENTIFIER_LENGTH`] bytes, and names containing statement
/// separators or comment markers.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(OrmError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(OrmError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(OrmError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    if name.contains(';') || name.contains("--") || name.contains("/*") {
        return Err(OrmError::Config(format!(
            "SECURITY: Identifier contains statement separator or comment: {:?}",
            name
        )));
    }

    Ok(())
}

/// Wrap in double quotes, doubling embedded quotes (ANSI, PostgreSQL,
/// Oracle, SQLite).
pub fn quote_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Wrap in backticks, doubling embedded backticks (MySQL).
pub fn quote_backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Wrap in brackets, doubling closing brackets (SQL Server).
pub fn quote_bracket(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Quote each dot-separated part of a possibly qualified name.
///
/// `Sales.Orders` with brackets becomes `[Sales].[Orders]`.
pub fn quote_qualified(name: &str, quote: impl Fn(&str) -> String) -> String {
    name.split('.').map(quote).collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("Sales.SalesOrderHeader").is_ok());
        assert!(validate_identifier("my table").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("   ").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let err = validate_identifier("users\0; DROP TABLE x").unwrap_err();
        assert!(err.to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(validate_identifier(&long).is_err());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_separators() {
        assert!(validate_identifier("users; DROP TABLE users").is_err());
        assert!(validate_identifier("users--").is_err());
        assert!(validate_identifier("users/*x*/").is_err());
    }

    #[test]
    fn test_quote_helpers_escape() {
        assert_eq!(quote_double("table\"name"), "\"table\"\"name\"");
        assert_eq!(quote_backtick("table`name"), "`table``name`");
        assert_eq!(quote_bracket("table]name"), "[table]]name]");
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(quote_qualified("Sales.Orders", quote_bracket), "[Sales].[Orders]");
        assert_eq!(quote_qualified("users", quote_double), "\"users\"");
    }
}

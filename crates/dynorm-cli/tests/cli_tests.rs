//! CLI integration tests for dynorm.
//!
//! SQL rendering commands need no database. The query and describe tests
//! run against a SQLite file in a temporary directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;

fn cmd() -> Command {
    Command::cargo_bin("dynorm").unwrap()
}

/// Write a config pointing at `db` and return its path.
fn sqlite_config(dir: &Path, db: &Path, extra: &str) -> std::path::PathBuf {
    let path = dir.join("dynorm.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "connection:").unwrap();
    writeln!(file, "  provider: System.Data.SQLite").unwrap();
    writeln!(file, "  database: {}", db.display()).unwrap();
    write!(file, "{}", extra).unwrap();
    path
}

fn run_sql(config: &Path, args: &[&str]) {
    cmd()
        .arg("--config")
        .arg(config)
        .arg("query")
        .args(args)
        .assert()
        .success();
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("providers"))
        .stdout(predicate::str::contains("page"))
        .stdout(predicate::str::contains("table-info"))
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("describe"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dynorm"));
}

#[test]
fn test_global_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: dynorm.yaml]"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: warn]"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Rendering Tests
// =============================================================================

#[test]
fn test_providers_lists_aliases() {
    cmd()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("npgsql"))
        .stdout(predicate::str::contains("system.data.sqlclient"))
        .stdout(predicate::str::contains("oracle.manageddataaccess.client"))
        .stdout(predicate::str::contains("mysql.data.mysqlclient"))
        .stdout(predicate::str::contains("system.data.sqlite"));
}

#[test]
fn test_page_limit_offset_vendors() {
    for provider in ["Npgsql", "MySql.Data.MySqlClient", "System.Data.SQLite"] {
        cmd()
            .args([
                "page", "-p", provider, "-t", "Items", "--order-by", "Id",
                "--page", "3", "--page-size", "5",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("LIMIT 5 OFFSET 10"));
    }
}

#[test]
fn test_page_sql_server_uses_row_number() {
    cmd()
        .args([
            "page", "-p", "System.Data.SqlClient", "-t", "Items", "--order-by", "Id",
            "--filter", "Id > 3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ROW_NUMBER() OVER (ORDER BY Id)"))
        .stdout(predicate::str::contains("Id > 3"));
}

#[test]
fn test_page_oracle_uses_rownum() {
    cmd()
        .args(["page", "-p", "Oracle.DataAccess.Client", "-t", "Items", "--order-by", "Id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ROWNUM"));
}

#[test]
fn test_page_size_zero_is_config_error() {
    cmd()
        .args(["page", "-p", "sqlite", "-t", "Items", "--page-size", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--page-size"));
}

#[test]
fn test_page_huge_page_number_saturates() {
    let max = u64::MAX.to_string();
    cmd()
        .args(["page", "-p", "System.Data.SqlClient", "-t", "Items", "--page", &max])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("RowNumber > {}", max)));
}

#[test]
fn test_select_with_limit() {
    cmd()
        .args(["select", "-p", "sqlite", "-t", "Items", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LIMIT 1"));
}

#[test]
fn test_table_info_splits_owner() {
    cmd()
        .args(["table-info", "-p", "System.Data.SqlClient", "-t", "dbo.Categories"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INFORMATION_SCHEMA.COLUMNS"))
        .stdout(predicate::str::contains("TABLE_NAME = 'Categories'"))
        .stdout(predicate::str::contains("TABLE_SCHEMA = 'dbo'"));
}

#[test]
fn test_table_info_leading_dot_has_no_owner() {
    cmd()
        .args(["table-info", "-p", "System.Data.SqlClient", "-t", ".Categories"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TABLE_NAME = '.Categories'"))
        .stdout(predicate::str::contains("TABLE_SCHEMA").not());
}

#[test]
fn test_prefix_per_vendor() {
    let cases = [
        ("System.Data.SqlClient", "@Name"),
        ("Npgsql", ":Name"),
        ("Oracle", ":Name"),
        ("MySql.Data.MySqlClient", "?Name"),
        ("sqlite", "@Name"),
    ];
    for (provider, expected) in cases {
        cmd()
            .args(["prefix", "-p", provider, "Name"])
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{}\n", expected)));
    }
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_unknown_provider_exits_with_code_2() {
    cmd()
        .args(["prefix", "-p", "Acme.Data", "Name"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown database provider"));
}

#[test]
fn test_missing_config_exits_with_code_1() {
    cmd()
        .args(["--config", "nonexistent_dynorm.yaml", "query", "SELECT 1"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "query", "SELECT 1"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_log_format_exits_with_code_1() {
    cmd()
        .args(["--log-format", "xml", "providers"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown log format"));
}

// =============================================================================
// SQLite Round Trips
// =============================================================================

#[test]
fn test_query_against_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(dir.path(), &dir.path().join("cli.db"), "");

    run_sql(
        &config,
        &["CREATE TABLE Categories (CategoryID INTEGER PRIMARY KEY, CategoryName TEXT NOT NULL)"],
    );
    run_sql(
        &config,
        &["INSERT INTO Categories (CategoryID, CategoryName) VALUES (@0, @1)", "1", "Beverages"],
    );
    run_sql(
        &config,
        &["INSERT INTO Categories (CategoryID, CategoryName) VALUES (@0, @1)", "2", "Condiments"],
    );

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["query", "SELECT * FROM Categories WHERE CategoryID = @0", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"CategoryName\": \"Condiments\""))
        .stdout(predicate::str::contains("Beverages").not());
}

#[test]
fn test_query_driver_error_exits_with_code_4() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(dir.path(), &dir.path().join("cli.db"), "");

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["query", "SELECT * FROM NoSuchTable"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("no such table"));
}

#[test]
fn test_describe_reports_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(dir.path(), &dir.path().join("cli.db"), "table: Categories\n");

    run_sql(
        &config,
        &["CREATE TABLE Categories (CategoryID INTEGER PRIMARY KEY, \
           CategoryName TEXT NOT NULL, Priority INTEGER DEFAULT (1))"],
    );

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("describe")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"table\": \"Categories\""))
        .stdout(predicate::str::contains("\"Priority\": \"1\""))
        .stdout(predicate::str::contains("\"CategoryName\": null"));
}

#[test]
fn test_describe_without_table_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(dir.path(), &dir.path().join("cli.db"), "");

    cmd()
        .arg("--config")
        .arg(&config)
        .arg("describe")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no table configured"));
}

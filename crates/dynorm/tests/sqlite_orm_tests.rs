//! End-to-end tests against an in-memory SQLite database.

#![cfg(feature = "sqlite")]

use std::collections::BTreeMap;
use std::sync::Arc;

use dynorm::core::Command;
use dynorm::drivers::{
    MysqlPlugin, OraclePlugin, PostgresPlugin, SqlServerPlugin, SqliteExecutor, SqlitePlugin,
};
use dynorm::orm::RequiredFields;
use dynorm::{
    ConnectionConfig, DatabasePlugin, Executor, MicroOrm, OrmConfig, OrmError, PluginRegistry,
    QueryOptions, Record, SqlValue,
};

const CATEGORIES_DDL: &str = "CREATE TABLE Categories (
    CategoryID INTEGER PRIMARY KEY AUTOINCREMENT,
    CategoryName TEXT NOT NULL,
    Description TEXT,
    Priority INTEGER DEFAULT (1),
    CreatedAt TEXT DEFAULT CURRENT_TIMESTAMP
)";

async fn executor() -> Arc<SqliteExecutor> {
    Arc::new(
        SqliteExecutor::connect(&ConnectionConfig::sqlite_memory())
            .await
            .unwrap(),
    )
}

fn categories_config() -> OrmConfig {
    OrmConfig::new(ConnectionConfig::sqlite_memory())
        .with_table("Categories")
        .with_primary_keys("CategoryID")
}

async fn categories() -> MicroOrm {
    let exec = executor().await;
    exec.execute(&Command::new(CATEGORIES_DDL)).await.unwrap();
    MicroOrm::new(&categories_config(), &PluginRegistry::with_builtins(), exec).unwrap()
}

fn category(name: &str, description: &str) -> Record {
    Record::new()
        .with("CategoryName", name)
        .with("Description", description)
}

async fn seed_items(exec: &SqliteExecutor, count: i64) {
    exec.execute(&Command::new("CREATE TABLE Items (Id INTEGER PRIMARY KEY, Name TEXT)"))
        .await
        .unwrap();
    for id in 1..=count {
        exec.execute(&Command::new(format!(
            "INSERT INTO Items (Id, Name) VALUES ({}, 'item {}')",
            id, id
        )))
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_paging_windows_for_every_executable_dialect() {
    let exec = executor().await;
    seed_items(&exec, 25).await;

    // Oracle's ROWNUM has no SQLite equivalent; the other four shapes run as-is.
    let plugins: Vec<Box<dyn DatabasePlugin>> = vec![
        Box::new(SqlServerPlugin::new()),
        Box::new(MysqlPlugin::new()),
        Box::new(PostgresPlugin::new()),
        Box::new(SqlitePlugin::new()),
    ];

    for plugin in &plugins {
        for (limit, offset) in [(5u64, 0u64), (5, 10), (7, 20), (10, 22), (3, 25)] {
            let sql = plugin.build_paging_query("Id, Name", "Items", "Id", "", limit, offset);
            let rows = exec.query(&Command::new(sql.clone())).await.unwrap();
            let ids: Vec<i64> = rows.iter().map(|r| r.get_i64("Id").unwrap()).collect();
            let expected: Vec<i64> =
                ((offset as i64 + 1)..=((offset + limit) as i64).min(25)).collect();
            assert_eq!(ids, expected, "{}: {}", plugin.name(), sql);
        }
    }
}

#[tokio::test]
async fn test_paging_honours_descending_order_and_filter() {
    let exec = executor().await;
    seed_items(&exec, 25).await;
    let plugin = SqlServerPlugin::new();
    let sql = plugin.build_paging_query("Id", "Items", "Id DESC", "(Id <= 20)", 5, 5);
    let rows = exec.query(&Command::new(sql)).await.unwrap();
    let ids: Vec<i64> = rows.iter().map(|r| r.get_i64("Id").unwrap()).collect();
    assert_eq!(ids, vec![15, 14, 13, 12, 11]);
    // The window column is part of each row.
    assert!(rows[0].contains("RowNumber"));
}

#[test]
fn test_oracle_paging_uses_rownum() {
    let sql = OraclePlugin::new().build_paging_query("*", "Items", "Id", "", 10, 20);
    assert!(sql.contains("ROWNUM <= 30"));
    assert!(sql.contains("RowNumber > 20"));
}

#[tokio::test]
async fn test_insert_fills_identity() {
    let orm = categories().await;
    let first = orm.insert(category("Cool stuff", "You know")).await.unwrap();
    let second = orm.insert(category("Other stuff", "More")).await.unwrap();
    assert_eq!(first.get_i64("CategoryID"), Some(1));
    assert_eq!(second.get_i64("CategoryID"), Some(2));
    assert_eq!(first.get_str("CategoryName"), Some("Cool stuff"));
}

#[tokio::test]
async fn test_insert_many_matches_select_order() {
    let orm = categories().await;
    let inserted = orm
        .insert_many(vec![
            category("Cat Insert_MR", "cat 1 desc"),
            category("Cat Insert_MR", "cat 2 desc"),
        ])
        .await
        .unwrap();
    let selected = orm
        .all(
            &QueryOptions::new()
                .filter("CategoryName=@0")
                .arg("Cat Insert_MR")
                .order_by("CategoryID"),
        )
        .await
        .unwrap();
    assert_eq!(inserted.len(), 2);
    assert_eq!(selected.len(), 2);
    for (ins, sel) in inserted.iter().zip(&selected) {
        assert_eq!(ins.get_i64("CategoryID"), sel.get_i64("CategoryID"));
        assert_eq!(ins.get_str("Description"), sel.get_str("Description"));
    }
}

#[tokio::test]
async fn test_update_single_row_and_reset_to_null() {
    let orm = categories().await;
    let mut inserted = orm.insert(category("Cool stuff", "old")).await.unwrap();
    inserted.insert("Description", "This is all jolly marvellous");
    assert_eq!(orm.update(&inserted).await.unwrap(), 1);

    let id = inserted.get("CategoryID").cloned().unwrap();
    let updated = orm
        .find(Record::new().with("CategoryID", id.clone()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.get_str("Description"), Some("This is all jolly marvellous"));

    let mut cleared = updated.clone();
    cleared.insert("Description", SqlValue::NULL);
    assert_eq!(orm.update(&cleared).await.unwrap(), 1);
    let reread = orm.find(Record::new().with("categoryid", id)).await.unwrap().unwrap();
    assert!(reread.get("Description").unwrap().is_null());
}

#[tokio::test]
async fn test_count_with_args_and_criteria() {
    let orm = categories().await;
    for (name, description) in [("a", "x"), ("a", "y"), ("b", "x")] {
        orm.insert(category(name, description)).await.unwrap();
    }
    assert_eq!(orm.count(&QueryOptions::new()).await.unwrap(), 3);
    assert_eq!(
        orm.count(&QueryOptions::new().filter("WHERE CategoryName=@0").arg("a"))
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        orm.count(
            &QueryOptions::new()
                .filter("CategoryName=@0")
                .arg("a")
                .criterion("Description", "x")
        )
        .await
        .unwrap(),
        1
    );
    // Parentheses keep the OR from swallowing the criteria.
    assert_eq!(
        orm.count(&QueryOptions::new().filter("1=1 OR 0=0").criterion("CategoryName", "b"))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_aggregates() {
    let orm = categories().await;
    for name in ["a", "b", "c"] {
        orm.insert(category(name, "d")).await.unwrap();
    }
    let max = orm.max("CategoryID", &QueryOptions::new()).await.unwrap();
    assert_eq!(max.and_then(|v| v.as_i64()), Some(3));
    let min = orm
        .min("CategoryID", &QueryOptions::new().filter("CategoryID > @0").arg(1))
        .await
        .unwrap();
    assert_eq!(min.and_then(|v| v.as_i64()), Some(2));
    let sum = orm.sum("CategoryID", &QueryOptions::new()).await.unwrap();
    assert_eq!(sum.and_then(|v| v.as_i64()), Some(6));
    let none = orm
        .max("CategoryID", &QueryOptions::new().filter("CategoryID > 100"))
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_all_with_columns_limit_and_order() {
    let orm = categories().await;
    for name in ["a", "b", "c", "d"] {
        orm.insert(category(name, "x")).await.unwrap();
    }
    let rows = orm
        .all(
            &QueryOptions::new()
                .columns("CategoryID AS Id, CategoryName")
                .order_by("CategoryID DESC")
                .limit(2),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].len(), 2);
    assert_eq!(rows[0].get_i64("Id"), Some(4));
    assert_eq!(rows[1].get_str("CategoryName"), Some("c"));
    assert!(orm.single(&QueryOptions::new().criterion("CategoryName", "zzz")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_paged_results() {
    let orm = categories().await;
    for i in 0..25 {
        orm.insert(category(&format!("cat {:02}", i), "x")).await.unwrap();
    }
    let page = orm.paged(&QueryOptions::new(), 2, 10).await.unwrap();
    assert_eq!(page.total_records, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].get_i64("CategoryID"), Some(11));

    let last = orm
        .paged(&QueryOptions::new().order_by("CategoryName DESC"), 3, 10)
        .await
        .unwrap();
    assert_eq!(last.items.len(), 5);
    assert_eq!(last.items[0].get_str("CategoryName"), Some("cat 04"));
    assert!(!last.has_next_page());
}

#[tokio::test]
async fn test_save_updates_keyed_and_inserts_new() {
    let orm = categories().await;
    let existing = orm.insert(category("keep", "old")).await.unwrap();
    let mut changed = existing.clone();
    changed.insert("Description", "new");

    let written = orm
        .save(vec![changed, category("fresh", "row")])
        .await
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(orm.count(&QueryOptions::new()).await.unwrap(), 2);
    let kept = orm
        .find(Record::new().with("CategoryName", "keep"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.get_str("Description"), Some("new"));
}

#[tokio::test]
async fn test_delete_by_key_and_where() {
    let orm = categories().await;
    let first = orm.insert(category("Cat Delete", "1")).await.unwrap();
    orm.insert(category("Cat Delete", "2")).await.unwrap();
    orm.insert(category("Other", "3")).await.unwrap();

    let key = first.get("CategoryID").cloned().unwrap();
    assert_eq!(orm.delete_by_key(&[key]).await.unwrap(), 1);
    assert_eq!(
        orm.delete_where(&QueryOptions::new().filter("CategoryName=@0").arg("Cat Delete"))
            .await
            .unwrap(),
        1
    );
    assert_eq!(orm.count(&QueryOptions::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_where() {
    let orm = categories().await;
    for description in ["a", "b", "c"] {
        orm.insert(category("bulk", description)).await.unwrap();
    }
    let affected = orm
        .update_where(
            &Record::new().with("Description", "same"),
            &QueryOptions::new().filter("CategoryID <= @0").arg(2),
        )
        .await
        .unwrap();
    assert_eq!(affected, 2);
    assert_eq!(
        orm.count(&QueryOptions::new().criterion("Description", "same"))
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_table_metadata_and_defaults() {
    let orm = categories().await;
    let meta = orm.table_meta_data().await.unwrap();
    assert_eq!(meta.len(), 5);

    let created = orm.get_column_default("CreatedAt").await.unwrap();
    assert!(matches!(created, Some(SqlValue::DateTime(_))));
    assert_eq!(
        orm.get_column_default("Priority").await.unwrap(),
        Some(SqlValue::Text("1".into()))
    );
    assert_eq!(orm.get_column_default("Description").await.unwrap(), None);
    assert_eq!(orm.get_column_default("NoSuchColumn").await.unwrap(), None);

    let item = orm.new_item().await.unwrap();
    assert_eq!(item.len(), 5);
    assert!(item.get("CategoryName").unwrap().is_null());
    assert!(matches!(item.get("CreatedAt"), Some(SqlValue::DateTime(_))));
}

#[tokio::test]
async fn test_primary_key_helpers() {
    let orm = categories().await;
    let inserted = orm.insert(category("pk", "check")).await.unwrap();
    assert!(orm.has_primary_key(&inserted));
    assert_eq!(orm.get_primary_key(&inserted), Some(vec![SqlValue::I64(1)]));
    assert!(!orm.has_primary_key(&category("no", "key")));
}

#[tokio::test]
async fn test_validator_blocks_invalid_writes() {
    let orm = categories()
        .await
        .with_validator(RequiredFields::new(["Description"]));
    let bad = Record::new().with("CategoryName", "x");
    assert_eq!(orm.is_valid(&bad), vec!["Description is required"]);
    assert!(matches!(orm.insert(bad).await, Err(OrmError::Validation(_))));
    assert_eq!(orm.count(&QueryOptions::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_column_map_renames_both_ways() {
    let exec = executor().await;
    exec.execute(&Command::new(CATEGORIES_DDL)).await.unwrap();

    let mut column_map = BTreeMap::new();
    column_map.insert("MYCATEGORYID".to_string(), "CategoryID".to_string());
    column_map.insert("TheName".to_string(), "CategoryName".to_string());
    column_map.insert("ItsADescription".to_string(), "Description".to_string());
    let mut config = OrmConfig::new(ConnectionConfig::sqlite_memory())
        .with_table("Categories")
        .with_primary_keys("MYCATEGORYID")
        .with_columns("MYCATEGORYID, TheName, ItsADescription");
    config.column_map = column_map;

    let orm = MicroOrm::new(&config, &PluginRegistry::with_builtins(), exec).unwrap();
    let mut inserted = orm
        .insert(
            Record::new()
                .with("TheName", "Cool stuff")
                .with("ItsADescription", "cool"),
        )
        .await
        .unwrap();
    assert_eq!(inserted.get_i64("MYCATEGORYID"), Some(1));

    inserted.insert("ItsADescription", "This is all jolly marvellous");
    assert_eq!(orm.update(&inserted).await.unwrap(), 1);

    let row = orm
        .find(Record::new().with("MYCATEGORYID", 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.names().collect::<Vec<_>>(), vec!["MYCATEGORYID", "TheName", "ItsADescription"]);
    assert_eq!(row.get_str("ItsADescription"), Some("This is all jolly marvellous"));
}

#[tokio::test]
async fn test_procedures_unsupported_on_sqlite() {
    let orm = categories().await;
    let err = orm.execute_procedure("pr_clearAll", &Record::new()).await.unwrap_err();
    assert!(matches!(err, OrmError::Unsupported(_)));
}

#[tokio::test]
async fn test_raw_query_with_positional_args() {
    let orm = categories().await;
    orm.insert(category("raw", "query")).await.unwrap();
    let rows = orm
        .query(
            "SELECT CategoryName FROM Categories WHERE CategoryID = @0 AND Description = @1",
            &[SqlValue::I64(1), SqlValue::from("query")],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let guid = uuid::Uuid::new_v4();
    let echoed = orm.scalar("SELECT @0 AS val", &[SqlValue::Uuid(guid)]).await.unwrap();
    // SQLite has no GUID type: the plugin binds the 36-character text form.
    assert_eq!(echoed, Some(SqlValue::Text(guid.to_string())));
}

#[tokio::test]
async fn test_driver_errors_propagate() {
    let orm = categories().await;
    let err = orm
        .insert(Record::new().with("Description", "no name"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Driver { .. }));
    assert!(err.to_string().to_lowercase().contains("not null"));
}

#[tokio::test]
async fn test_unknown_provider_is_rejected() {
    let exec = executor().await;
    let config = OrmConfig::new(ConnectionConfig::new("Firebird")).with_table("T");
    let err = MicroOrm::new(&config, &PluginRegistry::with_builtins(), exec).unwrap_err();
    assert!(matches!(err, OrmError::UnknownProvider(_)));
}

#[tokio::test]
async fn test_connect_from_config() {
    let orm = MicroOrm::connect(&categories_config(), &PluginRegistry::with_builtins())
        .await
        .unwrap();
    orm.execute(CATEGORIES_DDL, &[]).await.unwrap();
    orm.insert(category("connected", "yes")).await.unwrap();
    assert_eq!(orm.count(&QueryOptions::new()).await.unwrap(), 1);
    orm.close().await;
}

#[tokio::test]
async fn test_file_database_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("northwind.db");
    let yaml = format!(
        "connection:\n  provider: System.Data.SQLite\n  database: {}\ntable: Categories\nprimary_keys: CategoryID\n",
        db.display()
    );
    let config_path = dir.path().join("dynorm.yaml");
    std::fs::write(&config_path, yaml).unwrap();

    let registry = PluginRegistry::with_builtins();
    let config = OrmConfig::load(&config_path).unwrap();
    let orm = MicroOrm::connect(&config, &registry).await.unwrap();
    orm.execute(CATEGORIES_DDL, &[]).await.unwrap();
    orm.insert(category("Produce", "Fresh")).await.unwrap();
    orm.close().await;

    let connection = ConnectionConfig::from_connection_string(&format!(
        "Data Source={};providerName=Microsoft.Data.Sqlite",
        db.display()
    ))
    .unwrap();
    let config = OrmConfig::new(connection)
        .with_table("Categories")
        .with_primary_keys("CategoryID");
    let orm = MicroOrm::connect(&config, &registry).await.unwrap();
    let row = orm
        .find(Record::new().with("CategoryName", "Produce"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get_str("Description"), Some("Fresh"));
    orm.close().await;
}

/// A vendor the built-in registry does not know, speaking SQLite's dialect.
struct EmbeddedPlugin(SqlitePlugin);

impl DatabasePlugin for EmbeddedPlugin {
    fn name(&self) -> &str {
        "embedded"
    }

    fn provider_names(&self) -> &'static [&'static str] {
        &["firebird.client"]
    }

    fn quote_ident(&self, name: &str) -> String {
        self.0.quote_ident(name)
    }

    fn parameter_prefix(&self) -> &str {
        self.0.parameter_prefix()
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
        self.0
            .build_paging_query(columns, tables_and_joins, order_by, where_clause, limit, offset)
    }

    fn build_table_info_query(&self, owner: Option<&str>, table_name: &str) -> String {
        self.0.build_table_info_query(owner, table_name)
    }

    fn identity_retrieval_function(&self) -> Option<&str> {
        self.0.identity_retrieval_function()
    }
}

#[tokio::test]
async fn test_registered_provider_binds_from_yaml() {
    let config = OrmConfig::from_yaml(
        "connection:\n  provider: Firebird.Client\n  host: fb.local\n  database: northwind\ntable: Categories\nprimary_keys: CategoryID\n",
    )
    .unwrap();

    let exec = executor().await;
    exec.execute(&Command::new(CATEGORIES_DDL)).await.unwrap();

    assert!(matches!(
        MicroOrm::new(&config, &PluginRegistry::with_builtins(), exec.clone()),
        Err(OrmError::UnknownProvider(_))
    ));

    let mut registry = PluginRegistry::with_builtins();
    registry.register(EmbeddedPlugin(SqlitePlugin::new()));
    let orm = MicroOrm::new(&config, &registry, exec).unwrap();
    assert_eq!(orm.plugin().name(), "embedded");

    let inserted = orm.insert(category("Seafood", "Fish")).await.unwrap();
    assert_eq!(inserted.get_i64("CategoryID"), Some(1));
    assert_eq!(orm.count(&QueryOptions::new()).await.unwrap(), 1);
}

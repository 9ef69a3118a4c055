//! The micro-ORM.
//!
//! [`MicroOrm`] binds one table (optionally) to one vendor plugin and one
//! executor. Statements come from [`StatementBuilder`]; execution goes
//! through the [`Executor`] trait so the same code drives every vendor.
//!
//! # Example
//!
//! ```no_run
//! use dynorm::{MicroOrm, OrmConfig, PluginRegistry, QueryOptions, Record};
//!
//! # async fn example() -> dynorm::Result<()> {
//! let config = OrmConfig::load("orm.yaml")?;
//! let orm = MicroOrm::connect(&config, &PluginRegistry::with_builtins()).await?;
//!
//! let inserted = orm
//!     .insert(Record::new().with("CategoryName", "Cool stuff"))
//!     .await?;
//! let rows = orm
//!     .all(&QueryOptions::new().filter("CategoryName = @0").arg("Cool stuff"))
//!     .await?;
//! # let _ = (inserted, rows);
//! # Ok(())
//! # }
//! ```

mod builder;
mod paged;
mod validator;

pub use builder::{QueryOptions, StatementBuilder};
pub use paged::PagedResults;
pub use validator::{RequiredFields, Validator};

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::OrmConfig;
use crate::core::{DatabasePlugin, Executor, PluginRegistry, Record, SqlValue};
use crate::drivers;
use crate::error::{OrmError, Result};
use crate::mapping::SqlNamingMapper;

/// Column-name fields of the vendor catalog rows, in lookup order.
const COLUMN_NAME_FIELDS: &[&str] = &["COLUMN_NAME", "name"];

/// Dynamic, record-based data access for one table.
pub struct MicroOrm {
    builder: StatementBuilder,
    executor: Arc<dyn Executor>,
    validator: Option<Arc<dyn Validator>>,
    table_meta: OnceCell<Vec<Record>>,
}

impl std::fmt::Debug for MicroOrm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MicroOrm")
            .field("builder", &self.builder)
            .field("executor", &self.executor.db_type())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl MicroOrm {
    /// Bind `config` to an existing executor.
    ///
    /// The plugin is resolved from `config.connection.provider` and fixed
    /// for the life of the instance. Columns renamed in `config.column_map`
    /// go through a [`SqlNamingMapper`] built from that map, quoting with the
    /// vendor's identifier quotes when `config.quote_identifiers` is set.
    pub fn new(
        config: &OrmConfig,
        registry: &PluginRegistry,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        let plugin = registry.require(&config.connection.provider)?;
        let mut mapper = SqlNamingMapper::from_column_map(&config.column_map, config.case_insensitive);
        if config.quote_identifiers {
            mapper = mapper.with_vendor_quoting(plugin.clone());
        }
        Ok(Self::with_parts(
            StatementBuilder::from_config(config, plugin, mapper),
            executor,
        ))
    }

    /// Open the connection described by `config` and bind to it.
    pub async fn connect(config: &OrmConfig, registry: &PluginRegistry) -> Result<Self> {
        config.validate()?;
        let plugin = registry.require(&config.connection.provider)?;
        let executor = drivers::connect(plugin.as_ref(), &config.connection).await?;
        Self::new(config, registry, executor)
    }

    /// Assemble from a prepared builder and executor.
    pub fn with_parts(builder: StatementBuilder, executor: Arc<dyn Executor>) -> Self {
        Self {
            builder,
            executor,
            validator: None,
            table_meta: OnceCell::new(),
        }
    }

    /// Replace the naming mapper, keeping table, keys and columns.
    #[must_use]
    pub fn with_mapper(self, config: &OrmConfig, mapper: SqlNamingMapper) -> Self {
        let plugin = self.builder.plugin().clone();
        Self {
            builder: StatementBuilder::from_config(config, plugin, mapper),
            table_meta: OnceCell::new(),
            ..self
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn plugin(&self) -> &Arc<dyn DatabasePlugin> {
        self.builder.plugin()
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn statements(&self) -> &StatementBuilder {
        &self.builder
    }

    // ===== Reads =====

    /// Run arbitrary SQL with positional arguments (`@0`, `@1`, ...).
    pub async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<Record>> {
        self.executor.query(&self.builder.raw(sql, args)).await
    }

    /// Run arbitrary SQL for its affected-row count.
    pub async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<u64> {
        self.executor.execute(&self.builder.raw(sql, args)).await
    }

    /// First column of the first row of arbitrary SQL.
    pub async fn scalar(&self, sql: &str, args: &[SqlValue]) -> Result<Option<SqlValue>> {
        self.executor.scalar(&self.builder.raw(sql, args)).await
    }

    pub async fn all(&self, options: &QueryOptions) -> Result<Vec<Record>> {
        let command = self.builder.all(options)?;
        let rows = self.executor.query(&command).await?;
        Ok(self.map_rows(rows))
    }

    /// First matching row.
    pub async fn single(&self, options: &QueryOptions) -> Result<Option<Record>> {
        let options = QueryOptions {
            limit: Some(1),
            ..options.clone()
        };
        Ok(self.all(&options).await?.into_iter().next())
    }

    /// First row whose fields equal `criteria`.
    pub async fn find(&self, criteria: Record) -> Result<Option<Record>> {
        self.single(&QueryOptions::new().criteria(criteria)).await
    }

    pub async fn count(&self, options: &QueryOptions) -> Result<u64> {
        let command = self.builder.count(options)?;
        let value = self.executor.scalar(&command).await?;
        Ok(value.and_then(|v| v.as_i64()).unwrap_or(0).max(0) as u64)
    }

    pub async fn max(&self, column: &str, options: &QueryOptions) -> Result<Option<SqlValue>> {
        self.aggregate("MAX", column, options).await
    }

    pub async fn min(&self, column: &str, options: &QueryOptions) -> Result<Option<SqlValue>> {
        self.aggregate("MIN", column, options).await
    }

    pub async fn sum(&self, column: &str, options: &QueryOptions) -> Result<Option<SqlValue>> {
        self.aggregate("SUM", column, options).await
    }

    async fn aggregate(
        &self,
        function: &str,
        column: &str,
        options: &QueryOptions,
    ) -> Result<Option<SqlValue>> {
        let command = self.builder.aggregate(function, column, options)?;
        Ok(self
            .executor
            .scalar(&command)
            .await?
            .filter(|v| !v.is_null()))
    }

    /// Page `current_page` (1-based) of `page_size` rows with totals.
    pub async fn paged(
        &self,
        options: &QueryOptions,
        current_page: u64,
        page_size: u64,
    ) -> Result<PagedResults> {
        let (page, count) = self.builder.paged(options, current_page, page_size)?;
        let (rows, total) = futures::try_join!(
            self.executor.query(&page),
            self.executor.scalar(&count)
        )?;
        let total = total.and_then(|v| v.as_i64()).unwrap_or(0).max(0) as u64;
        Ok(PagedResults::new(
            self.map_rows(rows),
            total,
            current_page,
            page_size,
        ))
    }

    // ===== Writes =====

    /// Insert one record and return it with its primary key filled in.
    ///
    /// Sequence-based vendors draw the key from the configured sequence
    /// first; identity-based vendors read it back on the same connection.
    pub async fn insert(&self, mut record: Record) -> Result<Record> {
        self.ensure_valid(&record)?;

        let single_key = match self.builder.primary_keys() {
            [key] => Some(key.clone()),
            _ => None,
        };
        let key_supplied = self.builder.primary_key_values(&record).is_some();

        if let (Some(key), false) = (&single_key, key_supplied) {
            if let Some(next) = self.builder.next_sequence_value()? {
                let value = self.executor.scalar(&next).await?.ok_or_else(|| {
                    OrmError::driver("sequence", "sequence query returned no value")
                })?;
                debug!(key = %key, "drew primary key from sequence");
                let field = self.record_key_name(&record, key);
                record.insert(field, value);
                let command = self.builder.insert(&record)?;
                self.executor.execute(&command).await?;
                return Ok(record);
            }
        }

        let command = self.builder.insert(&record)?;
        match (&single_key, key_supplied, self.builder.identity()) {
            (Some(key), false, Some(identity)) => {
                let id = self
                    .executor
                    .insert_and_fetch_identity(&command, &identity)
                    .await?;
                if let Some(id) = id.filter(|v| !v.is_null()) {
                    let field = self.record_key_name(&record, key);
                    record.insert(field, id);
                }
            }
            _ => {
                self.executor.execute(&command).await?;
            }
        }
        Ok(record)
    }

    /// Insert records in order, returning each with its key filled in.
    pub async fn insert_many(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            inserted.push(self.insert(record).await?);
        }
        Ok(inserted)
    }

    /// Update one record by primary key. Returns the affected-row count.
    pub async fn update(&self, record: &Record) -> Result<u64> {
        self.ensure_valid(record)?;
        let command = self.builder.update(record)?;
        self.executor.execute(&command).await
    }

    /// Set `values` on every row matching `options`.
    pub async fn update_where(&self, values: &Record, options: &QueryOptions) -> Result<u64> {
        let command = self.builder.update_where(values, options)?;
        self.executor.execute(&command).await
    }

    /// Update records that carry a primary key, insert the rest.
    ///
    /// Returns the number of records written.
    pub async fn save(&self, records: Vec<Record>) -> Result<u64> {
        let mut written = 0;
        for record in records {
            if self.has_primary_key(&record) {
                written += self.update(&record).await?;
            } else {
                self.insert(record).await?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Delete by primary key value(s).
    pub async fn delete_by_key(&self, keys: &[SqlValue]) -> Result<u64> {
        let command = self.builder.delete_by_key(keys)?;
        self.executor.execute(&command).await
    }

    pub async fn delete_where(&self, options: &QueryOptions) -> Result<u64> {
        let command = self.builder.delete_where(options)?;
        self.executor.execute(&command).await
    }

    /// Call a stored procedure and return whatever rows it produces.
    pub async fn execute_procedure(&self, name: &str, inputs: &Record) -> Result<Vec<Record>> {
        let command = self.builder.procedure(name, inputs)?;
        self.executor.query(&command).await
    }

    // ===== Metadata =====

    /// Catalog rows for the bound table's columns, fetched once.
    pub async fn table_meta_data(&self) -> Result<&[Record]> {
        let rows = self
            .table_meta
            .get_or_try_init(|| async {
                let command = self.builder.table_info()?;
                self.executor.query(&command).await
            })
            .await?;
        Ok(rows.as_slice())
    }

    /// Parsed default of one column, `None` when it has none or the column
    /// is unknown.
    pub async fn get_column_default(&self, column: &str) -> Result<Option<SqlValue>> {
        let db_column = self.builder.column_name(column);
        let meta = self.table_meta_data().await?;
        Ok(meta
            .iter()
            .find(|row| {
                column_name_of(row).is_some_and(|name| name.eq_ignore_ascii_case(&db_column))
            })
            .and_then(|row| self.plugin().get_column_default(row)))
    }

    /// A new record with one field per table column, set to its default
    /// (NULL when the column has none).
    pub async fn new_item(&self) -> Result<Record> {
        let plugin = self.plugin().clone();
        let meta = self.table_meta_data().await?;
        let item: Record = meta
            .iter()
            .filter_map(|row| {
                let name = column_name_of(row)?.to_string();
                let value = plugin.get_column_default(row).unwrap_or(SqlValue::NULL);
                Some((name, value))
            })
            .collect();
        Ok(self.builder.to_application_names(item))
    }

    // ===== Record helpers =====

    /// Whether every primary key field is present and non-NULL.
    pub fn has_primary_key(&self, record: &Record) -> bool {
        self.builder.primary_key_values(record).is_some()
    }

    /// Primary key values in key order.
    pub fn get_primary_key(&self, record: &Record) -> Option<Vec<SqlValue>> {
        self.builder.primary_key_values(record)
    }

    /// Validation messages for `record`; empty when valid or when no
    /// validator is configured.
    pub fn is_valid(&self, record: &Record) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(ref validator) = self.validator {
            validator.validate(record, &mut errors);
        }
        errors
    }

    fn ensure_valid(&self, record: &Record) -> Result<()> {
        let errors = self.is_valid(record);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(OrmError::Validation(errors))
        }
    }

    /// The record's own spelling of `key`, or `key` itself.
    fn record_key_name(&self, record: &Record, key: &str) -> String {
        let mapper = self.builder.mapper();
        record
            .names()
            .find(|name| mapper.names_match(name, key))
            .unwrap_or(key)
            .to_string()
    }

    fn map_rows(&self, rows: Vec<Record>) -> Vec<Record> {
        rows.into_iter()
            .map(|row| self.builder.to_application_names(row))
            .collect()
    }

    /// Close the executor's connections.
    pub async fn close(&self) {
        self.executor.close().await;
    }
}

fn column_name_of(row: &Record) -> Option<&str> {
    COLUMN_NAME_FIELDS.iter().find_map(|field| row.get_str(field))
}

//! SQL statement construction.
//!
//! [`StatementBuilder`] combines the bound table, the naming mapper and the
//! vendor plugin into ready-to-run [`Command`]s. It performs no I/O.
//!
//! Positional arguments are bound as parameters named `0, 1, 2, ...` and
//! referenced through the plugin's prefix (`@0`, `:0`, `?0`). Criteria and
//! values appended by the builder continue the same numbering.

use std::sync::Arc;

use crate::config::OrmConfig;
use crate::core::identifier::{quote_qualified, validate_identifier};
use crate::core::sql::{split_table_name, where_fragment};
use crate::core::{Command, DatabasePlugin, Parameter, Record, SqlValue};
use crate::error::{OrmError, Result};
use crate::mapping::SqlNamingMapper;

/// Clauses and arguments shared by the read and bulk-write operations.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Select list. Empty selects the configured columns (or `*`).
    pub columns: String,
    /// Filter, with or without a leading `WHERE`.
    pub where_clause: String,
    pub order_by: String,
    pub limit: Option<u64>,
    /// Values for `@0`, `@1`, ... in `where_clause`.
    pub args: Vec<SqlValue>,
    /// Field equality criteria, ANDed with `where_clause`.
    pub criteria: Record,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    #[must_use]
    pub fn filter(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<SqlValue>) -> Self {
        self.args.push(value.into());
        self
    }

    #[must_use]
    pub fn criterion(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.criteria.insert(name, value);
        self
    }

    #[must_use]
    pub fn criteria(mut self, criteria: Record) -> Self {
        self.criteria = criteria;
        self
    }
}

/// Builds commands for one table under one vendor dialect.
#[derive(Clone)]
pub struct StatementBuilder {
    plugin: Arc<dyn DatabasePlugin>,
    mapper: SqlNamingMapper,
    table: Option<String>,
    primary_keys: Vec<String>,
    columns: Vec<String>,
    sequence: Option<String>,
    default_owner: Option<String>,
}

impl std::fmt::Debug for StatementBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementBuilder")
            .field("plugin", &self.plugin.name())
            .field("table", &self.table)
            .field("primary_keys", &self.primary_keys)
            .field("columns", &self.columns)
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl StatementBuilder {
    /// Builder with no table bound.
    pub fn new(plugin: Arc<dyn DatabasePlugin>, mapper: SqlNamingMapper) -> Self {
        Self {
            plugin,
            mapper,
            table: None,
            primary_keys: Vec::new(),
            columns: Vec::new(),
            sequence: None,
            default_owner: None,
        }
    }

    /// Builder for the table, keys, columns and sequence in `config`.
    ///
    /// Without configured primary keys the mapper's
    /// `get_primary_key_name_from_class_name` supplies one, if any.
    pub fn from_config(
        config: &OrmConfig,
        plugin: Arc<dyn DatabasePlugin>,
        mapper: SqlNamingMapper,
    ) -> Self {
        let mut builder = Self::new(plugin, mapper);
        builder.table = config.table.clone();
        builder.primary_keys = config.primary_key_list();
        if builder.primary_keys.is_empty() {
            if let Some(ref table) = builder.table {
                builder.primary_keys = builder
                    .mapper
                    .get_primary_key_name_from_class_name(table)
                    .into_iter()
                    .collect();
            }
        }
        builder.columns = config.column_list();
        builder.sequence = config.sequence.clone();
        builder.default_owner = config.connection.schema.clone();
        builder
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn with_primary_keys(mut self, keys: &[&str]) -> Self {
        self.primary_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    pub fn plugin(&self) -> &Arc<dyn DatabasePlugin> {
        &self.plugin
    }

    pub fn mapper(&self) -> &SqlNamingMapper {
        &self.mapper
    }

    /// Application-side primary key names.
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Application-side table name.
    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    fn class_name(&self) -> &str {
        self.table.as_deref().unwrap_or_default()
    }

    /// Database table name (mapped, unquoted).
    pub fn database_table(&self) -> Result<String> {
        let table = self.table.as_deref().ok_or_else(|| {
            OrmError::Config("operation needs a table but none is configured".into())
        })?;
        Ok(self.mapper.get_table_name_from_class_name(table))
    }

    /// Database table name quoted part by part through the mapper.
    pub fn quoted_table(&self) -> Result<String> {
        let table = self.database_table()?;
        Ok(quote_qualified(&table, |part| {
            self.mapper.quote_database_identifier(part)
        }))
    }

    /// Database column name for an application field (mapped, unquoted).
    pub fn column_name(&self, field: &str) -> String {
        self.mapper
            .get_column_name_from_property_name(self.class_name(), field)
    }

    pub fn quoted_column(&self, field: &str) -> String {
        self.mapper.quote_database_identifier(&self.column_name(field))
    }

    /// Configured select list, or `*`.
    pub fn default_columns(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| self.quoted_column(c))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn select_list(&self, options: &QueryOptions) -> String {
        if options.columns.trim().is_empty() {
            self.default_columns()
        } else {
            options.columns.trim().to_string()
        }
    }

    fn is_primary_key(&self, field: &str) -> bool {
        self.primary_keys
            .iter()
            .any(|pk| self.mapper.names_match(pk, field))
    }

    fn lookup<'r>(&self, record: &'r Record, field: &str) -> Option<&'r SqlValue> {
        if self.mapper.use_case_insensitive_mapping() {
            record.get(field)
        } else {
            record.get_exact(field)
        }
    }

    /// Append a parameter numbered after the existing ones and return its
    /// placeholder text.
    fn push_param(&self, params: &mut Vec<Parameter>, value: SqlValue) -> String {
        let name = params.len().to_string();
        let mut parameter = Parameter::new(name.clone(), SqlValue::NULL);
        self.plugin.set_value(&mut parameter, value);
        params.push(parameter);
        self.plugin.prefix_parameter_name(&name, None)
    }

    fn args_to_params(&self, args: &[SqlValue]) -> Vec<Parameter> {
        let mut params = Vec::with_capacity(args.len());
        for arg in args {
            self.push_param(&mut params, arg.clone());
        }
        params
    }

    /// `WHERE` body combining the explicit filter and the criteria.
    fn filter(&self, options: &QueryOptions, params: &mut Vec<Parameter>) -> Result<String> {
        check_fields(&options.criteria)?;
        let mut parts = Vec::new();
        let explicit = normalize_where(&options.where_clause);
        if !explicit.is_empty() {
            parts.push(explicit);
        }
        for (field, value) in &options.criteria {
            let column = self.quoted_column(field);
            if value.is_null() {
                parts.push(format!("{} IS NULL", column));
            } else {
                let placeholder = self.push_param(params, value.clone());
                parts.push(format!("{} = {}", column, placeholder));
            }
        }
        Ok(parts.join(" AND "))
    }

    fn command(&self, sql: String, params: Vec<Parameter>) -> Command {
        let mut command = Command::new(sql);
        command.parameters = params;
        self.plugin.set_provider_specific_command_properties(&mut command);
        command
    }

    /// Arbitrary SQL with positional arguments.
    pub fn raw(&self, sql: &str, args: &[SqlValue]) -> Command {
        self.command(sql.to_string(), self.args_to_params(args))
    }

    /// SELECT over the table.
    pub fn all(&self, options: &QueryOptions) -> Result<Command> {
        let table = self.quoted_table()?;
        let mut params = self.args_to_params(&options.args);
        let filter = self.filter(options, &mut params)?;
        let sql = self.plugin.build_select(
            &self.select_list(options),
            &table,
            &filter,
            options.order_by.trim(),
            options.limit,
        );
        Ok(self.command(sql, params))
    }

    /// `SELECT COUNT(*)` over the filtered table. `options.columns` is
    /// counted instead of `*` when given.
    pub fn count(&self, options: &QueryOptions) -> Result<Command> {
        let expression = if options.columns.trim().is_empty() {
            "*"
        } else {
            options.columns.trim()
        };
        self.aggregate("COUNT", expression, options)
    }

    /// `SELECT {function}({expression})` over the filtered table.
    ///
    /// A bare field name in `expression` goes through the mapper; anything
    /// else is used verbatim.
    pub fn aggregate(&self, function: &str, expression: &str, options: &QueryOptions) -> Result<Command> {
        let table = self.quoted_table()?;
        let mut params = self.args_to_params(&options.args);
        let filter = self.filter(options, &mut params)?;
        let expression = if is_bare_name(expression) {
            self.quoted_column(expression)
        } else {
            expression.to_string()
        };
        let sql = format!(
            "SELECT {}({}) FROM {}{}",
            function,
            expression,
            table,
            where_fragment(&filter)
        );
        Ok(self.command(sql, params))
    }

    /// Page `current_page` (1-based) of `page_size` rows plus the matching
    /// count command.
    ///
    /// Without an explicit order the primary key orders the rows.
    pub fn paged(
        &self,
        options: &QueryOptions,
        current_page: u64,
        page_size: u64,
    ) -> Result<(Command, Command)> {
        if page_size == 0 {
            return Err(OrmError::Config("page size must be at least 1".into()));
        }
        let table = self.quoted_table()?;
        let order_by = if options.order_by.trim().is_empty() {
            self.primary_keys
                .iter()
                .map(|pk| self.quoted_column(pk))
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            options.order_by.trim().to_string()
        };
        let offset = current_page.max(1).saturating_sub(1).saturating_mul(page_size);

        let mut params = self.args_to_params(&options.args);
        let filter = self.filter(options, &mut params)?;
        let sql = self.plugin.build_paging_query(
            &self.select_list(options),
            &table,
            &order_by,
            &filter,
            page_size,
            offset,
        );
        let page = self.command(sql, params);

        let count_options = QueryOptions {
            columns: String::new(),
            ..options.clone()
        };
        let count = self.count(&count_options)?;
        Ok((page, count))
    }

    /// INSERT of every field in `record`.
    ///
    /// NULL primary key fields are left out so the database can generate
    /// the key.
    pub fn insert(&self, record: &Record) -> Result<Command> {
        let table = self.quoted_table()?;
        check_fields(record)?;
        let mut params = Vec::new();
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (field, value) in record {
            if value.is_null() && self.is_primary_key(field) {
                continue;
            }
            columns.push(self.quoted_column(field));
            values.push(self.push_param(&mut params, value.clone()));
        }
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                values.join(", ")
            )
        };
        Ok(self.command(sql, params))
    }

    /// UPDATE of the non-key fields of `record`, matched by primary key.
    pub fn update(&self, record: &Record) -> Result<Command> {
        let table = self.quoted_table()?;
        check_fields(record)?;
        let keys = self
            .primary_key_values(record)
            .ok_or_else(|| OrmError::NoPrimaryKey(self.class_name().to_string()))?;

        let mut params = Vec::new();
        let mut assignments = Vec::new();
        for (field, value) in record {
            if self.is_primary_key(field) {
                continue;
            }
            let placeholder = self.push_param(&mut params, value.clone());
            assignments.push(format!("{} = {}", self.quoted_column(field), placeholder));
        }
        if assignments.is_empty() {
            return Err(OrmError::Config(format!(
                "nothing to update in {}: record only holds primary key fields",
                self.class_name()
            )));
        }
        let filter = self.key_filter(keys, &mut params);
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments.join(", "),
            filter
        );
        Ok(self.command(sql, params))
    }

    /// UPDATE of every row matching `options`, setting `values`.
    pub fn update_where(&self, values: &Record, options: &QueryOptions) -> Result<Command> {
        if values.is_empty() {
            return Err(OrmError::Config("nothing to update: no values given".into()));
        }
        let table = self.quoted_table()?;
        check_fields(values)?;
        let mut params = self.args_to_params(&options.args);
        let assignments: Vec<String> = values
            .iter()
            .map(|(field, value)| {
                let placeholder = self.push_param(&mut params, value.clone());
                format!("{} = {}", self.quoted_column(field), placeholder)
            })
            .collect();
        let filter = self.filter(options, &mut params)?;
        let sql = format!(
            "UPDATE {} SET {}{}",
            table,
            assignments.join(", "),
            where_fragment(&filter)
        );
        Ok(self.command(sql, params))
    }

    /// DELETE by primary key value(s), in primary key order.
    pub fn delete_by_key(&self, keys: &[SqlValue]) -> Result<Command> {
        let table = self.quoted_table()?;
        if self.primary_keys.is_empty() {
            return Err(OrmError::NoPrimaryKey(self.class_name().to_string()));
        }
        if keys.len() != self.primary_keys.len() {
            return Err(OrmError::Config(format!(
                "{} has {} primary key column(s) but {} value(s) were given",
                self.class_name(),
                self.primary_keys.len(),
                keys.len()
            )));
        }
        let mut params = Vec::new();
        let filter = self.key_filter(keys.to_vec(), &mut params);
        Ok(self.command(format!("DELETE FROM {} WHERE {}", table, filter), params))
    }

    /// DELETE of every row matching `options`.
    pub fn delete_where(&self, options: &QueryOptions) -> Result<Command> {
        let table = self.quoted_table()?;
        let mut params = self.args_to_params(&options.args);
        let filter = self.filter(options, &mut params)?;
        Ok(self.command(
            format!("DELETE FROM {}{}", table, where_fragment(&filter)),
            params,
        ))
    }

    fn key_filter(&self, keys: Vec<SqlValue>, params: &mut Vec<Parameter>) -> String {
        self.primary_keys
            .iter()
            .zip(keys)
            .map(|(pk, value)| {
                let placeholder = self.push_param(params, value);
                format!("{} = {}", self.quoted_column(pk), placeholder)
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Call of stored procedure `name` with `inputs` bound by field name.
    pub fn procedure(&self, name: &str, inputs: &Record) -> Result<Command> {
        let mut params = Vec::with_capacity(inputs.len());
        let mut args = Vec::with_capacity(inputs.len());
        for (field, value) in inputs {
            let mut parameter = Parameter::new(field.clone(), SqlValue::NULL);
            self.plugin.set_value(&mut parameter, value.clone());
            args.push(self.plugin.prefix_parameter_name(field, None));
            params.push(parameter);
        }
        let sql = self.plugin.build_procedure_call(name, &args).ok_or_else(|| {
            OrmError::Unsupported(format!(
                "{} has no stored procedures",
                self.plugin.name()
            ))
        })?;
        Ok(self.command(sql, params))
    }

    /// Catalog query for the bound table's columns.
    ///
    /// The owner comes from a qualified table name, else the connection's
    /// schema.
    pub fn table_info(&self) -> Result<Command> {
        let table = self.database_table()?;
        let (owner, bare) = split_table_name(&table);
        let owner = owner.or(self.default_owner.as_deref());
        Ok(self.command(self.plugin.build_table_info_query(owner, bare), Vec::new()))
    }

    /// Next-value query for sequence-based vendors; `None` otherwise.
    pub fn next_sequence_value(&self) -> Result<Option<Command>> {
        if !self.plugin.is_sequence_based() {
            return Ok(None);
        }
        let sequence = self
            .sequence
            .as_deref()
            .ok_or_else(|| OrmError::MissingSequence(self.plugin.name().to_string()))?;
        Ok(self
            .plugin
            .build_next_sequence_value(sequence)
            .map(|sql| self.command(sql, Vec::new())))
    }

    /// `SELECT {identity function}` for identity-based vendors.
    pub fn identity(&self) -> Option<Command> {
        self.plugin
            .identity_retrieval_function()
            .map(|function| self.command(format!("SELECT {}", function), Vec::new()))
    }

    /// Primary key values of `record`, when every key is present and non-NULL.
    pub fn primary_key_values(&self, record: &Record) -> Option<Vec<SqlValue>> {
        if self.primary_keys.is_empty() {
            return None;
        }
        self.primary_keys
            .iter()
            .map(|pk| self.lookup(record, pk).filter(|v| !v.is_null()).cloned())
            .collect()
    }

    /// Rename result fields from database column names back to the
    /// configured application names.
    pub fn to_application_names(&self, record: Record) -> Record {
        let renames: Vec<(String, &String)> = self
            .columns
            .iter()
            .chain(self.primary_keys.iter())
            .map(|field| (self.column_name(field), field))
            .filter(|(column, field)| column != *field)
            .collect();
        if renames.is_empty() {
            return record;
        }
        record
            .into_iter()
            .map(|(name, value)| {
                let renamed = renames
                    .iter()
                    .find(|(column, _)| self.mapper.names_match(column, &name))
                    .map(|(_, field)| (*field).clone())
                    .unwrap_or(name);
                (renamed, value)
            })
            .collect()
    }
}

/// Field names end up in SQL text, so they get the same checks as
/// configured identifiers.
fn check_fields(record: &Record) -> Result<()> {
    record.names().try_for_each(validate_identifier)
}

/// Strip a leading `WHERE` keyword and parenthesize the rest.
fn normalize_where(where_clause: &str) -> String {
    let trimmed = where_clause.trim();
    let body = match (trimmed.get(..5), trimmed.get(5..)) {
        (Some(keyword), Some(rest))
            if keyword.eq_ignore_ascii_case("where") && rest.starts_with(char::is_whitespace) =>
        {
            rest.trim()
        }
        _ => trimmed,
    };
    if body.is_empty() {
        String::new()
    } else {
        format!("({})", body)
    }
}

fn is_bare_name(expression: &str) -> bool {
    !expression.is_empty()
        && expression
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_')
}

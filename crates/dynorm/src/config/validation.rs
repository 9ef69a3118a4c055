//! Configuration validation.

use super::OrmConfig;
use crate::core::identifier::validate_identifier;
use crate::core::DatabasePlugin;
use crate::drivers::PluginImpl;
use crate::error::{OrmError, Result};

/// Validate the configuration.
pub fn validate(config: &OrmConfig) -> Result<()> {
    let connection = &config.connection;

    if connection.provider.trim().is_empty() {
        return Err(OrmError::Config("connection.provider is required".into()));
    }

    if connection.database.is_empty() {
        return Err(OrmError::Config("connection.database is required".into()));
    }
    // Other providers resolve through the ORM's registry; only the built-in
    // network vendors are known to need a host.
    let needs_host = PluginImpl::from_provider(&connection.provider)
        .is_some_and(|plugin| plugin.name() != "sqlite");
    if needs_host && connection.host.is_empty() {
        return Err(OrmError::Config("connection.host is required".into()));
    }
    if connection.max_connections == 0 {
        return Err(OrmError::Config(
            "connection.max_connections must be at least 1".into(),
        ));
    }

    if let Some(ref table) = config.table {
        validate_identifier(table)?;
    }
    for key in config.primary_key_list() {
        validate_identifier(&key)?;
    }
    for column in config.column_list() {
        validate_identifier(&column)?;
    }
    if let Some(ref sequence) = config.sequence {
        validate_identifier(sequence)?;
    }
    for column in config.column_map.values() {
        validate_identifier(column)?;
    }

    Ok(())
}

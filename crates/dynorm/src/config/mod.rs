//! Configuration loading, connection-string parsing and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::drivers::{PluginImpl, SslMode};
use crate::core::DatabasePlugin;
use crate::error::{OrmError, Result};

impl OrmConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: OrmConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl ConnectionConfig {
    /// Parse an ADO-style connection string with an embedded provider name.
    ///
    /// ```text
    /// Server=localhost;Database=Northwind;User Id=sa;Password=pw;providerName=System.Data.SqlClient
    /// Data Source=northwind.db;providerName=System.Data.SQLite
    /// ```
    ///
    /// Keys are case-insensitive. `providerName` is required. For SQLite,
    /// `Data Source` names the database file; for the other vendors it names
    /// the server. SQL Server `tcp:host,port` server syntax is accepted.
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for segment in connection_string.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                OrmError::Config(format!(
                    "malformed connection string segment '{}' (expected key=value)",
                    segment
                ))
            })?;
            pairs.push((normalize_key(key), value.trim().to_string()));
        }

        let lookup = |keys: &[&str]| {
            pairs
                .iter()
                .find(|(k, _)| keys.contains(&k.as_str()))
                .map(|(_, v)| v.clone())
        };

        let provider = lookup(&["providername", "provider"]).ok_or_else(|| {
            OrmError::Config("connection string has no providerName".to_string())
        })?;
        let is_sqlite = PluginImpl::from_provider(&provider)
            .map(|p| p.name() == "sqlite")
            .unwrap_or(false);

        let mut config = ConnectionConfig::new(provider);

        if is_sqlite {
            config.database = lookup(&["datasource", "database", "filename"]).unwrap_or_default();
        } else {
            let server = lookup(&["server", "datasource", "host", "address"]).unwrap_or_default();
            let server = server.strip_prefix("tcp:").unwrap_or(&server);
            match server.split_once(',') {
                Some((host, port)) => {
                    config.host = host.trim().to_string();
                    config.port = Some(parse_port(port)?);
                }
                None => config.host = server.to_string(),
            }
            config.database =
                lookup(&["database", "initialcatalog", "servicename"]).unwrap_or_default();
        }

        if let Some(port) = lookup(&["port"]) {
            config.port = Some(parse_port(&port)?);
        }
        config.user = lookup(&["userid", "uid", "user", "username"]).unwrap_or_default();
        config.password = lookup(&["password", "pwd"]).unwrap_or_default();
        config.schema = lookup(&["schema", "searchpath"]);

        if let Some(mode) = lookup(&["sslmode", "encrypt"]) {
            config.ssl_mode = SslMode::parse(&mode)?;
        }
        if let Some(trust) = lookup(&["trustservercertificate"]) {
            config.trust_server_cert = parse_bool(&trust);
        }
        if let Some(size) = lookup(&["maxpoolsize", "maximumpoolsize"]) {
            config.max_connections = size.parse().map_err(|_| {
                OrmError::Config(format!("invalid Max Pool Size '{}'", size))
            })?;
        }

        Ok(config)
    }

    /// The configured port, or the vendor's standard port.
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| {
            match PluginImpl::from_provider(&self.provider).as_ref().map(|p| p.name()) {
                Some("sqlserver") => 1433,
                Some("oracle") => 1521,
                Some("mysql") => 3306,
                Some("postgres") => 5432,
                _ => 0,
            }
        })
    }
}

/// Lowercase and drop spaces/underscores: `User Id` → `userid`.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_lowercase()
}

fn parse_port(port: &str) -> Result<u16> {
    port.trim()
        .parse()
        .map_err(|_| OrmError::Config(format!("invalid port '{}'", port.trim())))
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

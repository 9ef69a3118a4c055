//! Configuration types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::drivers::SslMode;

/// Root configuration: one connection plus the table a [`MicroOrm`] is
/// bound to.
///
/// [`MicroOrm`]: crate::orm::MicroOrm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrmConfig {
    /// Database connection settings.
    pub connection: ConnectionConfig,

    /// Table (optionally `owner.table`) the ORM reads and writes.
    #[serde(default)]
    pub table: Option<String>,

    /// Comma-separated primary key column names.
    #[serde(default)]
    pub primary_keys: Option<String>,

    /// Comma-separated default select list (default: `*`).
    #[serde(default)]
    pub columns: Option<String>,

    /// Sequence supplying primary keys on sequence-based vendors.
    #[serde(default)]
    pub sequence: Option<String>,

    /// Match field names to columns case-insensitively (default: true).
    #[serde(default = "default_true")]
    pub case_insensitive: bool,

    /// Field name → column name renames applied by the naming mapper.
    #[serde(default)]
    pub column_map: BTreeMap<String, String>,

    /// Quote table and column names with the vendor's identifier quotes.
    #[serde(default)]
    pub quote_identifiers: bool,
}

impl OrmConfig {
    /// Configuration with only a connection; no table bound.
    pub fn new(connection: ConnectionConfig) -> Self {
        Self {
            connection,
            table: None,
            primary_keys: None,
            columns: None,
            sequence: None,
            case_insensitive: true,
            column_map: BTreeMap::new(),
            quote_identifiers: false,
        }
    }

    /// Bind a table.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the comma-separated primary key list.
    #[must_use]
    pub fn with_primary_keys(mut self, keys: impl Into<String>) -> Self {
        self.primary_keys = Some(keys.into());
        self
    }

    /// Set the default select list.
    #[must_use]
    pub fn with_columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    /// Set the key sequence.
    #[must_use]
    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    /// Primary key names, trimmed, empty entries dropped.
    pub fn primary_key_list(&self) -> Vec<String> {
        split_list(self.primary_keys.as_deref())
    }

    /// Column names of the default select list (empty means `*`).
    pub fn column_list(&self) -> Vec<String> {
        split_list(self.columns.as_deref())
            .into_iter()
            .filter(|c| c != "*")
            .collect()
    }
}

fn split_list(list: Option<&str>) -> Vec<String> {
    list.map(|l| {
        l.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Database connection settings.
///
/// `provider` is a provider name resolved through the
/// [`PluginRegistry`](crate::core::PluginRegistry) (e.g. `Npgsql`,
/// `System.Data.SqlClient`, `sqlite`). For SQLite, `database` is the file
/// path or `:memory:`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Provider name (case-insensitive).
    pub provider: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Port (default: the vendor's standard port).
    #[serde(default)]
    pub port: Option<u16>,

    /// Database name, or file path for SQLite.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Default schema/owner for table-info queries.
    #[serde(default)]
    pub schema: Option<String>,

    /// TLS mode (default: disable).
    #[serde(default)]
    pub ssl_mode: SslMode,

    /// Trust the server certificate without validation.
    #[serde(default)]
    pub trust_server_cert: bool,

    /// Maximum pool size (default: 5).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("provider", &self.provider)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl ConnectionConfig {
    /// Settings for a provider with everything else defaulted.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            host: String::new(),
            port: None,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            schema: None,
            ssl_mode: SslMode::Disable,
            trust_server_cert: false,
            max_connections: default_max_connections(),
        }
    }

    /// In-memory SQLite database.
    pub fn sqlite_memory() -> Self {
        Self {
            database: ":memory:".to_string(),
            ..Self::new("sqlite")
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    5
}

//! Error types for the ORM library.

use thiserror::Error;

/// Main error type for ORM operations.
#[derive(Error, Debug)]
pub enum OrmError {
    /// Configuration error (invalid YAML, missing fields, bad connection string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No plugin is registered for the declared provider name
    #[error("Unknown database provider: '{0}'")]
    UnknownProvider(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Error reported by a vendor driver (connectivity, syntax, constraints)
    #[error("{vendor} driver error: {message}")]
    Driver { vendor: &'static str, message: String },

    /// Operation needs a primary key but none is configured or supplied
    #[error("Table {0} has no primary key configured")]
    NoPrimaryKey(String),

    /// Sequence-based vendor used for an insert without a sequence name
    #[error("Provider {0} is sequence based but no sequence is configured")]
    MissingSequence(String),

    /// Record rejected by the configured validator
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Operation the active vendor or executor cannot perform
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OrmError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        OrmError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Driver error for the given vendor
    pub fn driver(vendor: &'static str, message: impl ToString) -> Self {
        OrmError::Driver {
            vendor,
            message: message.to_string(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            OrmError::Config(_)
            | OrmError::UnknownProvider(_)
            | OrmError::Yaml(_)
            | OrmError::MissingSequence(_) => 2,
            OrmError::Pool { .. } => 3,
            OrmError::Driver { .. } => 4,
            OrmError::NoPrimaryKey(_) | OrmError::Validation(_) | OrmError::Unsupported(_) => 5,
            OrmError::Io(_) | OrmError::Json(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        OrmError::driver("sqlx", err)
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        OrmError::driver("postgres", err)
    }
}

#[cfg(feature = "mssql")]
impl From<tiberius::error::Error> for OrmError {
    fn from(err: tiberius::error::Error) -> Self {
        OrmError::driver("mssql", err)
    }
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;

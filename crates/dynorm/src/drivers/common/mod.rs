//! Common utilities shared across database drivers.
//!
//! - [`placeholders`]: named-placeholder rewriting for positional drivers
//! - [`tls`]: rustls setup for PostgreSQL connections (feature `postgres`)

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, Result};

pub mod placeholders;
#[cfg(feature = "postgres")]
pub mod tls;

pub use placeholders::{prepare, PlaceholderStyle, Prepared};
#[cfg(feature = "postgres")]
pub use tls::postgres_connector;

/// SSL verification modes for network drivers.
///
/// These modes match PostgreSQL's standard `sslmode` parameter. SQL Server
/// maps them onto tiberius encryption levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// No SSL/TLS (plain TCP connection).
    #[default]
    Disable,
    /// Use SSL but don't verify server certificate.
    /// **Security Warning**: Vulnerable to man-in-the-middle attacks.
    Require,
    /// Verify server certificate against CA but not hostname.
    VerifyCa,
    /// Full certificate and hostname verification.
    VerifyFull,
}

impl SslMode {
    /// Parse an SSL mode from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disable" | "false" | "" => Ok(SslMode::Disable),
            "require" | "true" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(OrmError::Config(format!(
                "Invalid ssl_mode '{}'. Valid values: disable, require, verify-ca, verify-full",
                other
            ))),
        }
    }

    /// Check if this mode requires TLS.
    pub fn requires_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }

    /// Check if the server certificate is verified.
    pub fn verifies_certificate(&self) -> bool {
        matches!(self, SslMode::VerifyCa | SslMode::VerifyFull)
    }
}

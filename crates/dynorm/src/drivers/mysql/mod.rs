//! MySQL/MariaDB driver.
//!
//! - [`MysqlPlugin`]: backtick quoting, `LIMIT`/`OFFSET` paging
//! - [`MysqlExecutor`]: SQLx executor (`mysql` feature)
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

#[cfg(feature = "mysql")]
mod executor;
mod plugin;

#[cfg(feature = "mysql")]
pub use executor::MysqlExecutor;
pub use plugin::MysqlPlugin;

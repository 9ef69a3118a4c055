//! PostgreSQL driver.
//!
//! - [`PostgresPlugin`]: `:name` parameters, `LIMIT`/`OFFSET` paging,
//!   refcursor parameters
//! - [`PostgresExecutor`]: tokio-postgres executor pooled with deadpool
//!   (`postgres` feature)

#[cfg(feature = "postgres")]
mod executor;
mod plugin;

#[cfg(feature = "postgres")]
pub use executor::PostgresExecutor;
pub use plugin::{PostgresPlugin, REFCURSOR};

//! Microsoft SQL Server driver.
//!
//! - [`SqlServerPlugin`]: bracket quoting, `TOP`/`ROW_NUMBER()` paging,
//!   `SCOPE_IDENTITY()` identity retrieval
//! - [`MssqlExecutor`]: Tiberius executor pooled with bb8 (`mssql` feature)

#[cfg(feature = "mssql")]
mod executor;
mod plugin;

#[cfg(feature = "mssql")]
pub use executor::{MssqlExecutor, TiberiusConnectionManager};
pub use plugin::SqlServerPlugin;

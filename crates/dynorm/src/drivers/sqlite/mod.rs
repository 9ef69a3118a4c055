//! SQLite driver.

#[cfg(feature = "sqlite")]
mod executor;
mod plugin;

#[cfg(feature = "sqlite")]
pub use executor::SqliteExecutor;
pub use plugin::SqlitePlugin;

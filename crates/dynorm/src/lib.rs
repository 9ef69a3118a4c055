//! # dynorm
//!
//! Dynamic micro-ORM over relational databases, with one dialect plugin per
//! vendor.
//!
//! Rows are [`Record`]s (ordered field → [`SqlValue`] maps) rather than
//! typed structs. Per-vendor differences live in [`DatabasePlugin`]
//! implementations:
//!
//! - **Paging** via `ROW_NUMBER()` (SQL Server), `ROWNUM` (Oracle) or
//!   `LIMIT`/`OFFSET` (MySQL, PostgreSQL, SQLite)
//! - **Column defaults** parsed from catalog rows into runtime values
//! - **Identity retrieval** by sequence or by identity function
//! - **Parameter prefixes** and vendor value coercion
//!
//! Plugins are looked up by ADO-style provider name in a [`PluginRegistry`].
//! Execution goes through an [`Executor`] backed by the vendor's native
//! driver crate (sqlx for SQLite/MySQL, tokio-postgres, tiberius).
//!
//! ## Example
//!
//! ```rust,no_run
//! use dynorm::{MicroOrm, OrmConfig, PluginRegistry, QueryOptions};
//!
//! #[tokio::main]
//! async fn main() -> dynorm::Result<()> {
//!     let config = OrmConfig::load("orm.yaml")?;
//!     let orm = MicroOrm::connect(&config, &PluginRegistry::with_builtins()).await?;
//!     let page = orm.paged(&QueryOptions::new().order_by("Name"), 2, 30).await?;
//!     println!("{} of {} rows", page.items.len(), page.total_records);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod mapping;
pub mod orm;

// Re-exports for convenient access
pub use config::{ConnectionConfig, OrmConfig};
pub use core::{
    Command, DatabasePlugin, Executor, Parameter, PluginRegistry, Record, SqlNullType, SqlValue,
};
pub use drivers::{PluginImpl, SslMode};
pub use error::{OrmError, Result};
pub use mapping::SqlNamingMapper;
pub use orm::{MicroOrm, PagedResults, QueryOptions, StatementBuilder, Validator};

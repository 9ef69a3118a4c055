//! Core abstractions shared by every vendor.
//!
//! - [`value`]: owned SQL values with typed NULLs
//! - [`record`]: dynamically shaped rows (ordered name → value maps)
//! - [`command`]: provider-neutral commands and parameters
//! - [`traits`]: the [`DatabasePlugin`] dialect strategy and the [`Executor`] trait
//! - [`catalog`]: provider-name → plugin registry
//! - [`sql`]: SQL text building blocks used by the plugins
//! - [`identifier`]: identifier validation and quoting
//!
//! # Architecture
//!
//! The core module defines database-agnostic abstractions that are implemented
//! by driver modules (`drivers/sqlserver`, `drivers/postgres`, etc.). New
//! vendors are added by implementing [`DatabasePlugin`] and registering the
//! plugin, without touching the ORM layer.

pub mod catalog;
pub mod command;
pub mod identifier;
pub mod record;
pub mod sql;
pub mod traits;
pub mod value;

pub use catalog::PluginRegistry;
pub use command::{Command, CommandType, Parameter, ParameterDirection};
pub use record::Record;
pub use traits::{DatabasePlugin, Executor};
pub use value::{SqlNullType, SqlValue};

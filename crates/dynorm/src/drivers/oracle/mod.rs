//! Oracle dialect.
//!
//! SQL generation only: no Oracle driver is linked, so [`OraclePlugin`] is
//! used to render statements (CLI `page`/`select`/`table-info`) and by
//! callers that bring their own [`Executor`](crate::core::Executor).

mod plugin;

pub use plugin::{OraclePlugin, REF_CURSOR};

//! Naming policy between application names and database identifiers.

mod naming;

pub use naming::{map_name, SqlNamingMapper, SqlNamingMapperBuilder};

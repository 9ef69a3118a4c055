//! [`SqlNamingMapper`]: table, column and primary-key naming plus identifier
//! quoting, each replaceable by a closure.
//!
//! The default mapper is the identity: the application's table name is the
//! database table name, field names are column names, no primary key is
//! assumed and identifiers are emitted unquoted.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::DatabasePlugin;

type TableNameFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
type ColumnNameFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;
type PrimaryKeyFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;
type QuoteFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Return `to` when `name` is exactly `from`, otherwise `name` unchanged.
///
/// Calls chain into a renaming table:
///
/// ```
/// use dynorm::mapping::map_name;
///
/// let rename = |c: &str| {
///     let c = map_name(c, "MYCATEGORYID", "CategoryID");
///     map_name(&c, "TheName", "CategoryName")
/// };
/// assert_eq!(rename("TheName"), "CategoryName");
/// assert_eq!(rename("Description"), "Description");
/// ```
pub fn map_name(name: &str, from: &str, to: &str) -> String {
    if name == from {
        to.to_string()
    } else {
        name.to_string()
    }
}

/// Naming and quoting policy, immutable once built.
///
/// Every function must be pure and total: the ORM calls them repeatedly and
/// expects the same answer each time.
#[derive(Clone)]
pub struct SqlNamingMapper {
    case_insensitive: bool,
    table_name: TableNameFn,
    column_name: ColumnNameFn,
    primary_key_name: PrimaryKeyFn,
    quote: QuoteFn,
}

impl Default for SqlNamingMapper {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            table_name: Arc::new(|class| class.to_string()),
            column_name: Arc::new(|_, property| property.to_string()),
            primary_key_name: Arc::new(|_| None),
            quote: Arc::new(|id| id.to_string()),
        }
    }
}

impl SqlNamingMapper {
    /// The identity mapper.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SqlNamingMapperBuilder {
        SqlNamingMapperBuilder::default()
    }

    /// Column renames from configuration (`application name → column`).
    ///
    /// Names absent from `column_map` map to themselves. With
    /// `case_insensitive` the lookup ignores ASCII case.
    pub fn from_column_map(column_map: &BTreeMap<String, String>, case_insensitive: bool) -> Self {
        let map = column_map.clone();
        Self::builder()
            .case_insensitive(case_insensitive)
            .column_name(move |_, property| {
                map.get(property)
                    .or_else(|| {
                        if case_insensitive {
                            map.iter()
                                .find(|(k, _)| k.eq_ignore_ascii_case(property))
                                .map(|(_, v)| v)
                        } else {
                            None
                        }
                    })
                    .cloned()
                    .unwrap_or_else(|| property.to_string())
            })
            .build()
    }

    /// This mapper with identifiers quoted by `plugin`.
    #[must_use]
    pub fn with_vendor_quoting(self, plugin: Arc<dyn DatabasePlugin>) -> Self {
        SqlNamingMapperBuilder { mapper: self }.vendor_quoting(plugin).build()
    }

    /// Whether application names match database names ignoring case.
    pub fn use_case_insensitive_mapping(&self) -> bool {
        self.case_insensitive
    }

    pub fn get_table_name_from_class_name(&self, class_name: &str) -> String {
        (self.table_name)(class_name)
    }

    /// `class_name` is the application table name the property belongs to.
    pub fn get_column_name_from_property_name(&self, class_name: &str, property_name: &str) -> String {
        (self.column_name)(class_name, property_name)
    }

    /// `None` means there is no default primary key.
    pub fn get_primary_key_name_from_class_name(&self, class_name: &str) -> Option<String> {
        (self.primary_key_name)(class_name)
    }

    pub fn quote_database_identifier(&self, id: &str) -> String {
        (self.quote)(id)
    }

    /// Compare two names under this mapper's case rule.
    pub fn names_match(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }
}

impl fmt::Debug for SqlNamingMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlNamingMapper")
            .field("case_insensitive", &self.case_insensitive)
            .finish_non_exhaustive()
    }
}

/// Builder for [`SqlNamingMapper`]. Unset functions keep the identity default.
#[derive(Default)]
pub struct SqlNamingMapperBuilder {
    mapper: SqlNamingMapper,
}

impl SqlNamingMapperBuilder {
    pub fn case_insensitive(mut self, value: bool) -> Self {
        self.mapper.case_insensitive = value;
        self
    }

    pub fn table_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.mapper.table_name = Arc::new(f);
        self
    }

    pub fn column_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.mapper.column_name = Arc::new(f);
        self
    }

    pub fn primary_key_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.mapper.primary_key_name = Arc::new(f);
        self
    }

    pub fn quote_identifier<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.mapper.quote = Arc::new(f);
        self
    }

    /// Quote identifiers the way `plugin`'s vendor does.
    pub fn vendor_quoting(self, plugin: Arc<dyn DatabasePlugin>) -> Self {
        self.quote_identifier(move |id| plugin.quote_ident(id))
    }

    pub fn build(self) -> SqlNamingMapper {
        self.mapper
    }
}

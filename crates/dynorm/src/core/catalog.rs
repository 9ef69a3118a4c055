//! Plugin registry for explicit provider resolution.
//!
//! The [`PluginRegistry`] maps normalized provider names to dialect plugins.
//! It is constructed once, then shared by reference or `Arc`; there is no
//! global lookup table.
//!
//! # Design Rationale
//!
//! - **No global state**: callers build the registry and pass it in
//! - **Explicit registration**: custom plugins sit next to the built-ins
//! - **Case-insensitive**: provider names are lowercased on insert and lookup

use std::collections::HashMap;
use std::sync::Arc;

use crate::drivers::PluginImpl;
use crate::error::{OrmError, Result};

use super::traits::DatabasePlugin;

/// Registry of dialect plugins keyed by lowercased provider name.
///
/// # Example
///
/// ```rust
/// use dynorm::core::PluginRegistry;
///
/// let registry = PluginRegistry::with_builtins();
/// let oracle = registry.get("Oracle.ManagedDataAccess.Client").unwrap();
/// assert_eq!(oracle.name(), "oracle");
/// ```
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn DatabasePlugin>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the five built-in vendors registered under
    /// every provider name they answer to.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for plugin in PluginImpl::all() {
            registry.register(plugin);
        }
        registry
    }

    /// Register a plugin under each of its [`DatabasePlugin::provider_names`].
    pub fn register(&mut self, plugin: impl DatabasePlugin + 'static) {
        let plugin: Arc<dyn DatabasePlugin> = Arc::new(plugin);
        for name in plugin.provider_names() {
            self.plugins.insert(name.to_lowercase(), plugin.clone());
        }
    }

    /// Register a shared plugin under an explicit provider name.
    pub fn register_arc(&mut self, provider: &str, plugin: Arc<dyn DatabasePlugin>) {
        self.plugins.insert(provider.to_lowercase(), plugin);
    }

    /// Look a plugin up by provider name (case-insensitive).
    pub fn get(&self, provider: &str) -> Option<Arc<dyn DatabasePlugin>> {
        self.plugins.get(&provider.trim().to_lowercase()).cloned()
    }

    /// Look a plugin up, returning an error for unknown providers.
    pub fn require(&self, provider: &str) -> Result<Arc<dyn DatabasePlugin>> {
        self.get(provider)
            .ok_or_else(|| OrmError::UnknownProvider(provider.to_string()))
    }

    /// Check if a provider name is registered.
    pub fn has_provider(&self, provider: &str) -> bool {
        self.plugins.contains_key(&provider.trim().to_lowercase())
    }

    /// All registered provider names, sorted.
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("providers", &self.provider_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sql;

    struct MockPlugin;

    impl DatabasePlugin for MockPlugin {
        fn name(&self) -> &str {
            "mock"
        }

        fn provider_names(&self) -> &'static [&'static str] {
            &["Mock.Client", "mock"]
        }

        fn quote_ident(&self, name: &str) -> String {
            name.to_string()
        }

        fn parameter_prefix(&self) -> &str {
            "#"
        }

        fn build_paging_query(
            &self,
            columns: &str,
            tables_and_joins: &str,
            order_by: &str,
            where_clause: &str,
            limit: u64,
            offset: u64,
        ) -> String {
            sql::build_limit_offset_paging_query(
                columns,
                tables_and_joins,
                order_by,
                where_clause,
                limit,
                offset,
            )
        }

        fn build_table_info_query(&self, _owner: Option<&str>, table_name: &str) -> String {
            format!("DESCRIBE {}", table_name)
        }
    }

    #[test]
    fn test_registry_custom_registration() {
        let mut registry = PluginRegistry::new();
        assert!(!registry.has_provider("mock"));

        registry.register(MockPlugin);
        assert!(registry.has_provider("mock.client"));
        assert_eq!(registry.get("MOCK.CLIENT").unwrap().name(), "mock");
    }

    #[test]
    fn test_registry_case_insensitive_resolution() {
        let registry = PluginRegistry::with_builtins();
        let mixed = registry.get("Oracle.ManagedDataAccess.Client").unwrap();
        let lower = registry.get("oracle.manageddataaccess.client").unwrap();
        assert!(Arc::ptr_eq(&mixed, &lower));
        assert_eq!(mixed.name(), "oracle");
    }

    #[test]
    fn test_registry_builtin_aliases() {
        let registry = PluginRegistry::with_builtins();
        for (provider, name) in [
            ("System.Data.SqlClient", "sqlserver"),
            ("Microsoft.Data.SqlClient", "sqlserver"),
            ("Oracle.DataAccess.Client", "oracle"),
            ("MySql.Data.MySqlClient", "mysql"),
            ("MySqlConnector", "mysql"),
            ("Devart.Data.MySql", "mysql"),
            ("Npgsql", "postgres"),
            ("System.Data.SQLite", "sqlite"),
            ("Microsoft.Data.Sqlite", "sqlite"),
        ] {
            assert_eq!(registry.get(provider).unwrap().name(), name, "{}", provider);
        }
    }

    #[test]
    fn test_registry_require_unknown() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.get("Firebird.Client").is_none());
        let err = registry.require("Firebird.Client").err().expect("expected error");
        assert!(matches!(err, OrmError::UnknownProvider(ref p) if p == "Firebird.Client"));
    }

    #[test]
    fn test_registry_enumeration_sorted() {
        let registry = PluginRegistry::with_builtins();
        let names = registry.provider_names();
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
        assert!(names.contains(&"npgsql"));
        assert!(names.contains(&"sqlite"));
    }
}

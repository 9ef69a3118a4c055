//! Dynamically shaped rows.
//!
//! A [`Record`] is an ordered field-name → [`SqlValue`] map. It stands in for
//! every "row-like" thing the ORM handles: result rows, catalog metadata rows,
//! insert/update inputs and where-clause criteria.

use indexmap::map::{IntoIter, Iter};
use indexmap::IndexMap;

use super::value::SqlValue;

/// Ordered map from field name to value.
///
/// Insertion order is preserved (it matches select-list order for result
/// rows). Lookups through [`Record::get`] are exact first and then fall back
/// to an ASCII case-insensitive scan, because catalog views disagree on case
/// (`COLUMN_DEFAULT` vs `column_default`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, SqlValue>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, keeping its original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look a field up, exact match first, then case-insensitively.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.fields.get(name).or_else(|| {
            self.fields
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Exact (case-sensitive) lookup.
    pub fn get_exact(&self, name: &str) -> Option<&SqlValue> {
        self.fields.get(name)
    }

    /// Mutable lookup with the same case rules as [`Record::get`].
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SqlValue> {
        let key = self.resolve_key(name)?.to_string();
        self.fields.get_mut(&key)
    }

    /// Remove a field, preserving the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<SqlValue> {
        let key = self.resolve_key(name)?.to_string();
        self.fields.shift_remove(&key)
    }

    /// Whether the field is present (case-insensitive fallback).
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Text value of a field. NULL and missing fields are `None`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(SqlValue::as_str)
    }

    /// Integer value of a field, widened to `i64`.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(SqlValue::as_i64)
    }

    /// Floating-point value of a field.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(SqlValue::as_f64)
    }

    /// Boolean value of a field.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(SqlValue::as_bool)
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate `(name, value)` pairs in order.
    pub fn iter(&self) -> Iter<'_, String, SqlValue> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert to a JSON object for CLI output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    fn resolve_key(&self, name: &str) -> Option<&str> {
        if let Some((k, _)) = self.fields.get_key_value(name) {
            return Some(k.as_str());
        }
        self.fields
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, SqlValue);
    type IntoIter = IntoIter<String, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a SqlValue);
    type IntoIter = Iter<'a, String, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

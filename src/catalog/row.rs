//! Typed row representation.
//!
//! A logical row is physically split: table-backed fields live in the
//! relational table under physical column names, domain-backed fields live
//! in the property store keyed by property display name. `Row` keeps the two
//! sub-maps explicit instead of relying on string-key collision avoidance in
//! one flat map.

use crate::catalog::types::Value;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Ordered, case-insensitive-keyed row split into table-backed and
/// property-backed fields. Setting a field under a case variant of an
/// existing key overwrites in place and keeps the original key spelling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    table: Vec<(CompactString, Value)>,
    properties: Vec<(CompactString, Value)>,
}

fn find_ci(entries: &[(CompactString, Value)], name: &str) -> Option<usize> {
    let needle = name.to_lowercase();
    entries
        .iter()
        .position(|(key, _)| key.to_lowercase() == needle)
}

fn set_ci(entries: &mut Vec<(CompactString, Value)>, name: CompactString, value: Value) {
    match find_ci(entries, &name) {
        Some(idx) => entries[idx].1 = value,
        None => entries.push((name, value)),
    }
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style table field, for callers assembling input rows.
    pub fn with(mut self, name: impl Into<CompactString>, value: Value) -> Self {
        self.set_table(name, value);
        self
    }

    pub fn set_table(&mut self, name: impl Into<CompactString>, value: Value) {
        set_ci(&mut self.table, name.into(), value);
    }

    pub fn set_property(&mut self, name: impl Into<CompactString>, value: Value) {
        set_ci(&mut self.properties, name.into(), value);
    }

    /// Looks up a field by name: table-backed fields first, then properties.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.get_table(name).or_else(|| self.get_property(name))
    }

    pub fn get_table(&self, name: &str) -> Option<&Value> {
        find_ci(&self.table, name).map(|idx| &self.table[idx].1)
    }

    pub fn get_property(&self, name: &str) -> Option<&Value> {
        find_ci(&self.properties, name).map(|idx| &self.properties[idx].1)
    }

    pub fn remove_table(&mut self, name: &str) -> Option<Value> {
        find_ci(&self.table, name).map(|idx| self.table.remove(idx).1)
    }

    pub fn table_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.table.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn property_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.table.len() + self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty() && self.properties.is_empty()
    }

    /// Overlays `other`'s table fields onto this row; used to report the
    /// physical fields an update actually changed.
    pub fn overlay_table(&mut self, other: &Row) {
        for (name, value) in other.table_fields() {
            self.set_table(name, value.clone());
        }
    }
}

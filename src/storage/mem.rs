//! In-memory reference implementations of the storage seams.

use crate::catalog::row::Row;
use crate::catalog::schema::PropertyDescriptor;
use crate::catalog::types::Value;
use crate::storage::{EncodedKey, PropertyStore, StorageError, TableStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MemTableStore {
    rows: RwLock<BTreeMap<EncodedKey, Row>>,
}

impl MemTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl TableStore for MemTableStore {
    fn select(&self, key: &EncodedKey) -> Result<Option<Row>, StorageError> {
        Ok(self.rows.read().get(key).cloned())
    }

    fn insert(&self, key: EncodedKey, row: Row) -> Result<(), StorageError> {
        let mut rows = self.rows.write();
        if rows.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                key: format!("{:02x?}", key.as_slice()),
            });
        }
        rows.insert(key, row);
        Ok(())
    }

    fn update(&self, key: &EncodedKey, changes: &Row) -> Result<Row, StorageError> {
        let mut rows = self.rows.write();
        let stored = rows
            .get_mut(key)
            .ok_or_else(|| StorageError::Other("update target vanished".into()))?;
        let mut changed = Row::new();
        for (name, value) in changes.table_fields() {
            if stored.get_table(name) != Some(value) {
                stored.set_table(name, value.clone());
                changed.set_table(name, value.clone());
            }
        }
        Ok(changed)
    }

    fn delete(&self, key: &EncodedKey) -> Result<Option<Row>, StorageError> {
        Ok(self.rows.write().remove(key))
    }

    fn scan(&self) -> Result<Vec<(EncodedKey, Row)>, StorageError> {
        Ok(self
            .rows
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemPropertyStore {
    objects: RwLock<BTreeMap<String, Vec<(String, Value)>>>,
}

impl MemPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }
}

impl PropertyStore for MemPropertyStore {
    fn values(&self, uri: &str) -> Result<Vec<(String, Value)>, StorageError> {
        Ok(self.objects.read().get(uri).cloned().unwrap_or_default())
    }

    fn insert_values(
        &self,
        uri: &str,
        values: &[(PropertyDescriptor, Value)],
    ) -> Result<(), StorageError> {
        let mut objects = self.objects.write();
        let entry = objects.entry(uri.to_string()).or_default();
        for (prop, value) in values {
            let needle = prop.name.to_lowercase();
            match entry.iter_mut().find(|(name, _)| name.to_lowercase() == needle) {
                Some((_, stored)) => *stored = value.clone(),
                None => entry.push((prop.name.clone(), value.clone())),
            }
        }
        Ok(())
    }

    fn replace_value(
        &self,
        uri: &str,
        prop: &PropertyDescriptor,
        value: &Value,
    ) -> Result<(), StorageError> {
        self.insert_values(uri, std::slice::from_ref(&(prop.clone(), value.clone())))
    }

    fn delete_value(&self, uri: &str, prop_name: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.write();
        if let Some(entry) = objects.get_mut(uri) {
            let needle = prop_name.to_lowercase();
            entry.retain(|(name, _)| name.to_lowercase() != needle);
        }
        Ok(())
    }

    fn delete_object(&self, uri: &str) -> Result<bool, StorageError> {
        Ok(self.objects.write().remove(uri).is_some())
    }

    fn has_object(&self, uri: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().contains_key(uri))
    }
}

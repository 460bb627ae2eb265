//! Physical storage seams.
//!
//! The update service talks to two stores: the relational table holding the
//! fixed columns, and the property (EAV) store holding domain values keyed
//! by object URI. Both are traits so the service stays independent of the
//! actual backend; the in-memory implementations in [`mem`] are the
//! reference backend used by the tests.

pub mod encoded_key;
pub mod mem;

use crate::catalog::row::Row;
use crate::catalog::schema::PropertyDescriptor;
use crate::catalog::types::Value;
pub use encoded_key::EncodedKey;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("duplicate key: {key}")]
    DuplicateKey { key: String },
    #[error("storage failure: {0}")]
    Other(String),
}

/// The fixed relational table. Rows carried across this boundary hold
/// table-backed fields only, keyed by physical column name.
pub trait TableStore: Send + Sync {
    fn select(&self, key: &EncodedKey) -> Result<Option<Row>, StorageError>;

    /// Inserts a new row; an existing row under `key` is a duplicate-key
    /// error.
    fn insert(&self, key: EncodedKey, row: Row) -> Result<(), StorageError>;

    /// Merges `changes` into the stored row and reports the fields whose
    /// value actually changed.
    fn update(&self, key: &EncodedKey, changes: &Row) -> Result<Row, StorageError>;

    /// Removes and returns the row; a missing row is `Ok(None)`.
    fn delete(&self, key: &EncodedKey) -> Result<Option<Row>, StorageError>;

    fn scan(&self) -> Result<Vec<(EncodedKey, Row)>, StorageError>;
}

/// The dynamic property (EAV) store: values attached to an object URI.
pub trait PropertyStore: Send + Sync {
    /// All property values stored for `uri`, as (property name, value)
    /// pairs in insertion order.
    fn values(&self, uri: &str) -> Result<Vec<(String, Value)>, StorageError>;

    fn insert_values(
        &self,
        uri: &str,
        values: &[(PropertyDescriptor, Value)],
    ) -> Result<(), StorageError>;

    /// Direct single-property update, bypassing the batch path.
    fn replace_value(
        &self,
        uri: &str,
        prop: &PropertyDescriptor,
        value: &Value,
    ) -> Result<(), StorageError>;

    fn delete_value(&self, uri: &str, prop_name: &str) -> Result<(), StorageError>;

    /// Deletes the object and every property value attached to it. Returns
    /// whether the object existed.
    fn delete_object(&self, uri: &str) -> Result<bool, StorageError>;

    fn has_object(&self, uri: &str) -> Result<bool, StorageError>;
}

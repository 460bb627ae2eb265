//! Query layer over a dual-storage table: fixed relational columns plus a
//! dynamic property domain stored as EAV values keyed by object URI. Field
//! and schema keys are hierarchical, round-trip through an escaped string
//! form, and compare case-insensitively.

pub mod catalog;
pub mod config;
pub mod error;
pub mod groups;
pub mod keys;
pub mod service;
pub mod storage;
pub mod tenancy;

pub use crate::catalog::{ColumnInfo, PropertyDescriptor, Row, TableInfo, Value};
pub use crate::config::OntodbConfig;
pub use crate::error::{BatchValidationError, OntodbError, OntodbErrorCode, ValidationError};
pub use crate::groups::{ColumnGroups, SuffixConvention};
pub use crate::keys::{FieldKey, SchemaKey};
pub use crate::service::{
    DefaultUpdateService, InsertOption, QueryUpdateService, UpdateConfig,
};
pub use crate::storage::mem::{MemPropertyStore, MemTableStore};
pub use crate::tenancy::{Container, User};

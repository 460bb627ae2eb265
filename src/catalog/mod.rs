//! Table/column metadata model and the typed row representation.

pub mod row;
pub mod schema;
pub mod types;

pub use row::Row;
pub use schema::{ColumnInfo, PropertyDescriptor, TableInfo, ValueConstraint};
pub use types::{coerce, ColumnType, Value};

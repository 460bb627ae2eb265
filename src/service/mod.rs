//! Row-level CRUD over the dual-storage table.

pub mod default;

pub use default::DefaultUpdateService;

use crate::catalog::row::Row;
use crate::error::OntodbError;
use crate::tenancy::{Container, User};
use serde::{Deserialize, Serialize};

/// How a batch of incoming rows is applied. The boolean facets are
/// cross-constrained: `replace` implies `merge_rows`, `identity_insert`
/// implies a batch import, and id reselection only happens on the
/// row-at-a-time paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertOption {
    Insert,
    Upsert,
    Import,
    Merge,
    Replace,
    ImportIdentity,
}

impl InsertOption {
    /// Bulk/import-style path rather than row-at-a-time API inserts.
    pub fn batch(self) -> bool {
        matches!(
            self,
            InsertOption::Import
                | InsertOption::Merge
                | InsertOption::Replace
                | InsertOption::ImportIdentity
        )
    }

    /// Existing rows with matching keys are updated instead of rejected.
    pub fn merge_rows(self) -> bool {
        matches!(
            self,
            InsertOption::Upsert | InsertOption::Merge | InsertOption::Replace
        )
    }

    /// Column import aliases participate in field re-homing.
    pub fn use_import_aliases(self) -> bool {
        self.batch()
    }

    /// Generated keys are reported back on the returned rows.
    pub fn reselect_ids(self) -> bool {
        matches!(self, InsertOption::Insert | InsertOption::Upsert)
    }

    /// Merged rows are fully replaced rather than overlaid.
    pub fn replace(self) -> bool {
        matches!(self, InsertOption::Replace)
    }

    /// Client-supplied values for identity (auto-increment) columns are
    /// honored.
    pub fn identity_insert(self) -> bool {
        matches!(self, InsertOption::ImportIdentity)
    }

    pub const ALL: [InsertOption; 6] = [
        InsertOption::Insert,
        InsertOption::Upsert,
        InsertOption::Import,
        InsertOption::Merge,
        InsertOption::Replace,
        InsertOption::ImportIdentity,
    ];
}

/// Per-call options for the update service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConfig {
    pub insert_option: InsertOption,
    /// Keep caller-supplied `Owner` values on update.
    pub allow_owner: bool,
    /// Keep caller-supplied `Created`/`CreatedBy` values on update.
    pub retain_creation: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            insert_option: InsertOption::Insert,
            allow_owner: false,
            retain_creation: false,
        }
    }
}

impl UpdateConfig {
    pub fn with_insert_option(mut self, option: InsertOption) -> Self {
        self.insert_option = option;
        self
    }

    pub fn with_allow_owner(mut self, allow_owner: bool) -> Self {
        self.allow_owner = allow_owner;
        self
    }

    pub fn with_retain_creation(mut self, retain_creation: bool) -> Self {
        self.retain_creation = retain_creation;
        self
    }
}

/// Row-level CRUD boundary consumed by the rest of the application.
///
/// Single-row semantics fail fast per row; the batch methods here collect
/// per-row validation failures and continue, reporting the full set at the
/// end. Transactions are the caller's concern: nothing in this trait opens
/// one.
pub trait QueryUpdateService {
    /// Fetches one logical row per key map; unmatched keys yield `None`.
    fn get_rows(
        &self,
        user: &User,
        container: &Container,
        keys: &[Row],
    ) -> Result<Vec<Option<Row>>, OntodbError>;

    fn insert_rows(
        &self,
        user: &User,
        container: &Container,
        rows: Vec<Row>,
        config: &UpdateConfig,
    ) -> Result<Vec<Row>, OntodbError>;

    /// `old_rows`, when supplied, must pair positionally with `rows` and
    /// carries the pre-update state used for key resolution and property
    /// cleanup.
    fn update_rows(
        &self,
        user: &User,
        container: &Container,
        rows: Vec<Row>,
        old_rows: Option<Vec<Row>>,
        config: &UpdateConfig,
    ) -> Result<Vec<Row>, OntodbError>;

    fn delete_rows(
        &self,
        user: &User,
        container: &Container,
        old_rows: Vec<Row>,
    ) -> Result<Vec<Row>, OntodbError>;

    /// Bulk delete scoped to the ambient container when the table has a
    /// container column. No row-level validation or triggers fire on this
    /// path.
    fn truncate_rows(&self, user: &User, container: &Container) -> Result<usize, OntodbError>;
}

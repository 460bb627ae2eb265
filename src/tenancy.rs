use serde::{Deserialize, Serialize};

/// Identity of the caller performing an operation.
///
/// This layer performs no permission evaluation of its own; the user is
/// threaded through so stores and audit hooks can attribute writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
}

impl User {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Tenancy scope for rows. Containers form a tree; a workbook is a leaf
/// container whose rows may be placed into its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub workbook: bool,
}

impl Container {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            parent: None,
            workbook: false,
        }
    }

    pub fn workbook(
        id: impl Into<String>,
        path: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            parent: Some(parent.into()),
            workbook: true,
        }
    }

    /// Whether a row handled in this ambient container may carry `target`
    /// as its container: the ambient container itself always qualifies, and
    /// a workbook may place rows into its parent. Everything else is
    /// overridden or rejected by the caller.
    pub fn allows_row_placement(&self, target: &str) -> bool {
        if target == self.id {
            return true;
        }
        self.workbook && self.parent.as_deref() == Some(target)
    }
}

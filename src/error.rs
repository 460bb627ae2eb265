use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Table,
    Row,
    Column,
    Property,
    Object,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Table => write!(f, "table"),
            ResourceType::Row => write!(f, "row"),
            ResourceType::Column => write!(f, "column"),
            ResourceType::Property => write!(f, "property"),
            ResourceType::Object => write!(f, "object"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OntodbErrorCode {
    InvalidKey,
    Validation,
    BatchValidation,
    DuplicateKey,
    Unauthorized,
    TableNotFound,
    RowNotFound,
    ColumnNotFound,
    PropertyNotFound,
    ObjectNotFound,
    IntegrityError,
    Storage,
    Service,
}

impl OntodbErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            OntodbErrorCode::InvalidKey => "invalid_key",
            OntodbErrorCode::Validation => "validation",
            OntodbErrorCode::BatchValidation => "batch_validation",
            OntodbErrorCode::DuplicateKey => "duplicate_key",
            OntodbErrorCode::Unauthorized => "unauthorized",
            OntodbErrorCode::TableNotFound => "table_not_found",
            OntodbErrorCode::RowNotFound => "row_not_found",
            OntodbErrorCode::ColumnNotFound => "column_not_found",
            OntodbErrorCode::PropertyNotFound => "property_not_found",
            OntodbErrorCode::ObjectNotFound => "object_not_found",
            OntodbErrorCode::IntegrityError => "integrity_error",
            OntodbErrorCode::Storage => "storage",
            OntodbErrorCode::Service => "service",
        }
    }
}

/// A business-rule failure scoped to one row, optionally to one field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn row(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "field '{field}': {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Per-row validation failures collected by the batch methods.
///
/// Batch insert/update keep processing past a bad row and report the full
/// set at the end; `row_errors` pairs each failure with the zero-based index
/// of the offending row in the submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub struct BatchValidationError {
    pub row_errors: Vec<(usize, ValidationError)>,
}

impl BatchValidationError {
    pub fn push(&mut self, row: usize, error: ValidationError) {
        self.row_errors.push((row, error));
    }

    pub fn is_empty(&self) -> bool {
        self.row_errors.is_empty()
    }
}

impl std::fmt::Display for BatchValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} row(s) failed validation", self.row_errors.len())?;
        for (row, err) in &self.row_errors {
            write!(f, "; row {row}: {err}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OntodbError {
    #[error("invalid key: {message}")]
    InvalidKey { message: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    BatchValidation(#[from] BatchValidationError),
    #[error("duplicate key in table '{table}': {key}")]
    DuplicateKey { table: String, key: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("integrity error: {message}")]
    IntegrityError { message: String },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("query update service error: {0}")]
    Service(String),
}

impl OntodbError {
    pub fn code(&self) -> OntodbErrorCode {
        match self {
            OntodbError::InvalidKey { .. } => OntodbErrorCode::InvalidKey,
            OntodbError::Validation(_) => OntodbErrorCode::Validation,
            OntodbError::BatchValidation(_) => OntodbErrorCode::BatchValidation,
            OntodbError::DuplicateKey { .. } => OntodbErrorCode::DuplicateKey,
            OntodbError::Unauthorized { .. } => OntodbErrorCode::Unauthorized,
            OntodbError::NotFound { resource_type, .. } => match resource_type {
                ResourceType::Table => OntodbErrorCode::TableNotFound,
                ResourceType::Row => OntodbErrorCode::RowNotFound,
                ResourceType::Column => OntodbErrorCode::ColumnNotFound,
                ResourceType::Property => OntodbErrorCode::PropertyNotFound,
                ResourceType::Object => OntodbErrorCode::ObjectNotFound,
            },
            OntodbError::IntegrityError { .. } => OntodbErrorCode::IntegrityError,
            OntodbError::Storage(_) => OntodbErrorCode::Storage,
            OntodbError::Service(_) => OntodbErrorCode::Service,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    pub fn invalid_key(message: impl Into<String>) -> Self {
        OntodbError::InvalidKey {
            message: message.into(),
        }
    }
}

use crate::catalog::types::{coerce, ColumnType, Value};
use serde::{Deserialize, Serialize};

/// Range check applied to a column or property value after type coercion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ValueConstraint {
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
    TextLength {
        max: usize,
    },
}

impl ValueConstraint {
    /// Checks `value`; nulls always pass (requiredness is a separate rule).
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            ValueConstraint::Range { min, max } => {
                let n = match value {
                    Value::Integer(n) => *n as f64,
                    Value::Float(x) => *x,
                    Value::Timestamp(ts) => *ts as f64,
                    _ => return Ok(()),
                };
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("value {n} is below the minimum of {min}"));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("value {n} is above the maximum of {max}"));
                    }
                }
                Ok(())
            }
            ValueConstraint::TextLength { max } => match value {
                Value::Text(s) if s.chars().count() > *max => {
                    Err(format!("text exceeds the maximum length of {max}"))
                }
                _ => Ok(()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub col_type: ColumnType,
    pub nullable: bool,
    pub required: bool,
    pub auto_increment: bool,
    pub has_default: bool,
    pub read_only: bool,
    pub calculated: bool,
    #[serde(default)]
    pub import_aliases: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<ValueConstraint>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            nullable: true,
            required: false,
            auto_increment: false,
            has_default: false,
            read_only: false,
            calculated: false,
            import_aliases: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn calculated(mut self) -> Self {
        self.calculated = true;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.import_aliases.push(alias.into());
        self
    }

    pub fn with_constraint(mut self, constraint: ValueConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Coerces and constraint-checks a supplied value for this column.
    pub fn convert(&self, value: &Value) -> Result<Value, String> {
        let converted = coerce(value, self.col_type)?;
        for constraint in &self.constraints {
            constraint.check(&converted)?;
        }
        Ok(converted)
    }
}

/// One dynamic domain property (EAV-backed field of a row).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub property_uri: String,
    pub value_type: ColumnType,
    #[serde(default)]
    pub import_aliases: Vec<String>,
    #[serde(default)]
    pub required: bool,
    /// Missing-value aware: a companion indicator can mark the stored value
    /// as absent/suspect without losing the raw value.
    #[serde(default)]
    pub mv_enabled: bool,
    #[serde(default)]
    pub constraints: Vec<ValueConstraint>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, value_type: ColumnType) -> Self {
        let name = name.into();
        let property_uri = format!("urn:ontodb:property:{name}");
        Self {
            name,
            property_uri,
            value_type,
            import_aliases: Vec::new(),
            required: false,
            mv_enabled: false,
            constraints: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn mv_enabled(mut self) -> Self {
        self.mv_enabled = true;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.import_aliases.push(alias.into());
        self
    }

    pub fn with_constraint(mut self, constraint: ValueConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn convert(&self, value: &Value) -> Result<Value, String> {
        let converted = coerce(value, self.value_type)?;
        for constraint in &self.constraints {
            constraint.check(&converted)?;
        }
        Ok(converted)
    }

    pub fn matches_name(&self, name: &str) -> bool {
        let needle = name.to_lowercase();
        if self.name.to_lowercase() == needle {
            return true;
        }
        self.import_aliases
            .iter()
            .any(|alias| alias.to_lowercase() == needle)
    }
}

/// Table metadata: fixed columns plus an optional dynamic property domain
/// attached through the object-URI column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub container_column: Option<String>,
    #[serde(default)]
    pub object_uri_column: Option<String>,
    #[serde(default)]
    pub domain: Vec<PropertyDescriptor>,
    /// Ad-hoc vocabulary properties attachable to rows outside the fixed
    /// domain; updated individually rather than batched.
    #[serde(default)]
    pub vocabulary: Vec<PropertyDescriptor>,
    /// Public (logical) name -> physical column name.
    #[serde(default)]
    pub column_aliases: Vec<(String, String)>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnInfo>, primary_key: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key,
            container_column: None,
            object_uri_column: None,
            domain: Vec::new(),
            vocabulary: Vec::new(),
            column_aliases: Vec::new(),
        }
    }

    pub fn with_container_column(mut self, column: impl Into<String>) -> Self {
        self.container_column = Some(column.into());
        self
    }

    pub fn with_domain(
        mut self,
        object_uri_column: impl Into<String>,
        domain: Vec<PropertyDescriptor>,
    ) -> Self {
        self.object_uri_column = Some(object_uri_column.into());
        self.domain = domain;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: Vec<PropertyDescriptor>) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn with_column_alias(
        mut self,
        public: impl Into<String>,
        physical: impl Into<String>,
    ) -> Self {
        self.column_aliases.push((public.into(), physical.into()));
        self
    }

    /// Domain-backed fields exist only when both the object-URI column and a
    /// non-empty property domain are declared.
    pub fn has_domain(&self) -> bool {
        self.object_uri_column.is_some() && !self.domain.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        let needle = name.to_lowercase();
        self.columns
            .iter()
            .find(|col| col.name.to_lowercase() == needle)
    }

    /// Re-homes a supplied field name to its physical column: exact column
    /// name, then the public alias map, then per-column import aliases when
    /// `use_import_aliases` is set.
    pub fn to_physical(&self, name: &str, use_import_aliases: bool) -> Option<&ColumnInfo> {
        if let Some(col) = self.column(name) {
            return Some(col);
        }
        let needle = name.to_lowercase();
        if let Some((_, physical)) = self
            .column_aliases
            .iter()
            .find(|(public, _)| public.to_lowercase() == needle)
        {
            return self.column(physical);
        }
        if use_import_aliases {
            return self.columns.iter().find(|col| {
                col.import_aliases
                    .iter()
                    .any(|alias| alias.to_lowercase() == needle)
            });
        }
        None
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.domain.iter().find(|prop| prop.matches_name(name))
    }

    pub fn vocabulary_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.vocabulary.iter().find(|prop| prop.matches_name(name))
    }

    pub fn pk_columns(&self) -> Vec<&ColumnInfo> {
        self.primary_key
            .iter()
            .filter_map(|name| self.column(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnInfo, PropertyDescriptor, TableInfo, ValueConstraint};
    use crate::catalog::types::{ColumnType, Value};

    fn sample_table() -> TableInfo {
        TableInfo::new(
            "specimens",
            vec![
                ColumnInfo::new("RowId", ColumnType::Integer).auto_increment(),
                ColumnInfo::new("Label", ColumnType::Text)
                    .required()
                    .with_alias("Specimen Label"),
                ColumnInfo::new("Volume", ColumnType::Float),
            ],
            vec!["RowId".into()],
        )
        .with_column_alias("SpecimenVolume", "Volume")
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let table = sample_table();
        assert!(table.column("rowid").is_some());
        assert!(table.column("LABEL").is_some());
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn physical_rehoming_checks_name_then_alias_map_then_import_aliases() {
        let table = sample_table();
        assert_eq!(table.to_physical("Volume", false).map(|c| c.name.as_str()), Some("Volume"));
        assert_eq!(
            table.to_physical("specimenvolume", false).map(|c| c.name.as_str()),
            Some("Volume")
        );
        assert_eq!(table.to_physical("Specimen Label", false), None);
        assert_eq!(
            table.to_physical("Specimen Label", true).map(|c| c.name.as_str()),
            Some("Label")
        );
    }

    #[test]
    fn domain_requires_uri_column_and_properties() {
        let bare = sample_table();
        assert!(!bare.has_domain());
        let with_domain = sample_table().with_domain(
            "ObjectUri",
            vec![PropertyDescriptor::new("Hemoglobin", ColumnType::Float)],
        );
        assert!(with_domain.has_domain());
        let uri_only = sample_table().with_domain("ObjectUri", Vec::new());
        assert!(!uri_only.has_domain());
    }

    #[test]
    fn range_constraint_applies_after_coercion() {
        let col = ColumnInfo::new("Age", ColumnType::Integer).with_constraint(
            ValueConstraint::Range {
                min: Some(0.0),
                max: Some(150.0),
            },
        );
        assert_eq!(col.convert(&Value::text("30")), Ok(Value::Integer(30)));
        assert!(col.convert(&Value::text("-4")).is_err());
        assert!(col.convert(&Value::Integer(200)).is_err());
        assert_eq!(col.convert(&Value::Null), Ok(Value::Null));
    }

    #[test]
    fn property_matches_name_and_aliases() {
        let prop = PropertyDescriptor::new("Hemoglobin", ColumnType::Float).with_alias("HGB");
        assert!(prop.matches_name("hemoglobin"));
        assert!(prop.matches_name("hgb"));
        assert!(!prop.matches_name("hb"));
    }
}

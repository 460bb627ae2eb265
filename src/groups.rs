//! Property column groups.
//!
//! Presents a dynamic property domain as a flat set of virtual columns. For
//! a measurement property the domain may carry a companion out-of-range
//! (OOR) indicator property; the resolver derives the companion grouping
//! once, by naming convention, and synthesizes the derived columns. The
//! convention is pluggable per table rather than baked into a type
//! hierarchy.

use crate::catalog::schema::PropertyDescriptor;
use serde::{Deserialize, Serialize};

/// Naming convention mapping a base property name to its companion column
/// names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixConvention {
    pub indicator: String,
    pub number: String,
    pub in_range: String,
    pub raw_value: String,
}

impl Default for SuffixConvention {
    fn default() -> Self {
        Self {
            indicator: "OORIndicator".into(),
            number: "Number".into(),
            in_range: "InRange".into(),
            raw_value: "RawValue".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VirtualKind {
    Display,
    Indicator,
    Number,
    InRange,
    RawValue,
}

/// How a virtual column's value is produced from the property store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VirtualExpr {
    /// The stored value of a property.
    Property { property_uri: String },
    /// Numeric cast of a stored property's value.
    NumericCast { property_uri: String },
    /// `CASE WHEN indicator IS NULL THEN number ELSE NULL END`: the numeric
    /// value is exposed only when no out-of-range indicator is set.
    InRangeCase {
        indicator_uri: String,
        number_uri: String,
    },
    /// The missing-value indicator stored alongside a property value.
    MvIndicator { property_uri: String },
    /// The raw stored value, ignoring any missing-value indicator.
    RawValue { property_uri: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualColumn {
    pub name: String,
    pub kind: VirtualKind,
    pub expr: VirtualExpr,
    pub hidden: bool,
    pub editable: bool,
    /// Backing descriptor for columns that map one-to-one onto a stored
    /// property; synthesized columns have none.
    pub descriptor: Option<PropertyDescriptor>,
}

/// One display property with an out-of-range indicator and its two
/// synthesized companions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OorGroup {
    pub display: String,
    pub indicator: String,
    pub number: String,
    pub in_range: String,
}

/// One missing-value-aware property with its synthesized indicator and
/// raw-value companions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcGroup {
    pub display: String,
    pub indicator: String,
    pub raw_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGroups {
    convention: SuffixConvention,
    columns: Vec<VirtualColumn>,
    oor_groups: Vec<OorGroup>,
    qc_groups: Vec<QcGroup>,
}

fn strip_suffix_ci<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    if name.len() <= suffix.len() || !name.is_char_boundary(name.len() - suffix.len()) {
        return None;
    }
    let (base, tail) = name.split_at(name.len() - suffix.len());
    tail.eq_ignore_ascii_case(suffix).then_some(base)
}

fn strip_spaces_lower(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

impl ColumnGroups {
    /// Partitions `domain` into display columns, OOR groups, and QC groups.
    /// Derivation happens once here; the result is immutable.
    pub fn resolve(domain: &[PropertyDescriptor], convention: SuffixConvention) -> Self {
        let known = |name: &str| {
            domain
                .iter()
                .find(|p| p.name.to_lowercase() == name.to_lowercase())
        };

        let mut columns = Vec::new();
        let mut oor_groups = Vec::new();
        let mut qc_groups = Vec::new();

        for prop in domain {
            // A property named like an indicator whose base is itself a
            // known property belongs to that base's group; listing it on its
            // own would double-count the indicator.
            if let Some(base) = strip_suffix_ci(&prop.name, &convention.indicator) {
                if known(base).is_some() {
                    continue;
                }
            }

            let indicator_name = format!("{}{}", prop.name, convention.indicator);
            if let Some(indicator) = known(&indicator_name) {
                let number_name = format!("{}{}", prop.name, convention.number);
                let in_range_name = format!("{}{}", prop.name, convention.in_range);
                columns.push(VirtualColumn {
                    name: prop.name.clone(),
                    kind: VirtualKind::Display,
                    expr: VirtualExpr::Property {
                        property_uri: prop.property_uri.clone(),
                    },
                    hidden: false,
                    editable: true,
                    descriptor: Some(prop.clone()),
                });
                columns.push(VirtualColumn {
                    name: indicator.name.clone(),
                    kind: VirtualKind::Indicator,
                    expr: VirtualExpr::Property {
                        property_uri: indicator.property_uri.clone(),
                    },
                    hidden: false,
                    editable: true,
                    descriptor: Some(indicator.clone()),
                });
                columns.push(VirtualColumn {
                    name: number_name.clone(),
                    kind: VirtualKind::Number,
                    expr: VirtualExpr::NumericCast {
                        property_uri: prop.property_uri.clone(),
                    },
                    hidden: true,
                    editable: false,
                    descriptor: None,
                });
                columns.push(VirtualColumn {
                    name: in_range_name.clone(),
                    kind: VirtualKind::InRange,
                    expr: VirtualExpr::InRangeCase {
                        indicator_uri: indicator.property_uri.clone(),
                        number_uri: prop.property_uri.clone(),
                    },
                    hidden: true,
                    editable: false,
                    descriptor: None,
                });
                oor_groups.push(OorGroup {
                    display: prop.name.clone(),
                    indicator: indicator.name.clone(),
                    number: number_name,
                    in_range: in_range_name,
                });
                continue;
            }

            if prop.mv_enabled {
                let indicator_name = format!("{}{}", prop.name, convention.indicator);
                let raw_name = format!("{}{}", prop.name, convention.raw_value);
                columns.push(VirtualColumn {
                    name: prop.name.clone(),
                    kind: VirtualKind::Display,
                    expr: VirtualExpr::Property {
                        property_uri: prop.property_uri.clone(),
                    },
                    hidden: false,
                    editable: true,
                    descriptor: Some(prop.clone()),
                });
                columns.push(VirtualColumn {
                    name: indicator_name.clone(),
                    kind: VirtualKind::Indicator,
                    expr: VirtualExpr::MvIndicator {
                        property_uri: prop.property_uri.clone(),
                    },
                    hidden: true,
                    editable: false,
                    descriptor: None,
                });
                columns.push(VirtualColumn {
                    name: raw_name.clone(),
                    kind: VirtualKind::RawValue,
                    expr: VirtualExpr::RawValue {
                        property_uri: prop.property_uri.clone(),
                    },
                    hidden: true,
                    editable: false,
                    descriptor: None,
                });
                qc_groups.push(QcGroup {
                    display: prop.name.clone(),
                    indicator: indicator_name,
                    raw_value: raw_name,
                });
                continue;
            }

            columns.push(VirtualColumn {
                name: prop.name.clone(),
                kind: VirtualKind::Display,
                expr: VirtualExpr::Property {
                    property_uri: prop.property_uri.clone(),
                },
                hidden: false,
                editable: true,
                descriptor: Some(prop.clone()),
            });
        }

        Self {
            convention,
            columns,
            oor_groups,
            qc_groups,
        }
    }

    pub fn convention(&self) -> &SuffixConvention {
        &self.convention
    }

    pub fn columns(&self) -> &[VirtualColumn] {
        &self.columns
    }

    pub fn oor_groups(&self) -> &[OorGroup] {
        &self.oor_groups
    }

    pub fn qc_groups(&self) -> &[QcGroup] {
        &self.qc_groups
    }

    /// Resolves a display-field name: exact case-insensitive column name,
    /// then configured import aliases, then a fuzzy match ignoring embedded
    /// spaces.
    pub fn find(&self, name: &str) -> Option<&VirtualColumn> {
        let needle = name.to_lowercase();
        if let Some(col) = self
            .columns
            .iter()
            .find(|col| col.name.to_lowercase() == needle)
        {
            return Some(col);
        }
        if let Some(col) = self.columns.iter().find(|col| {
            col.descriptor
                .as_ref()
                .is_some_and(|d| d.import_aliases.iter().any(|a| a.to_lowercase() == needle))
        }) {
            return Some(col);
        }
        let squashed = strip_spaces_lower(name);
        self.columns
            .iter()
            .find(|col| strip_spaces_lower(&col.name) == squashed)
    }

    /// Every synthesized or otherwise hidden column; callers hide these from
    /// default grids.
    pub fn default_hidden(&self) -> impl Iterator<Item = &VirtualColumn> {
        self.columns.iter().filter(|col| col.hidden)
    }
}

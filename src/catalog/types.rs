use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Json,
    Blob,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
            ColumnType::Blob => "blob",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Text(CompactString),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(i64),
    Json(CompactString),
    Blob(Vec<u8>),
    Null,
}

impl Value {
    pub fn text(s: impl Into<CompactString>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, or an empty/whitespace-only string. Requiredness treats both
    /// as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
            Value::Blob(_) => "blob",
            Value::Null => "null",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Timestamp(_) => 3,
            Value::Float(_) => 4,
            Value::Text(_) => 5,
            Value::Json(_) => 6,
            Value::Blob(_) => 7,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank_cmp = self.kind_rank().cmp(&other.kind_rank());
        if rank_cmp != Ordering::Equal {
            return rank_cmp;
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Json(a), Value::Json(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(s) | Value::Json(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Timestamp(ts) => write!(f, "{ts}"),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Null => f.write_str("null"),
        }
    }
}

/// Converts a supplied value to a column's declared type. Nulls pass
/// through; text parses into the scalar types; numeric widening is allowed
/// and anything converts to text via its display form. Everything else is a
/// conversion failure reported with both type names.
pub fn coerce(value: &Value, target: ColumnType) -> Result<Value, String> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let failure = || {
        format!(
            "cannot convert {} value '{}' to {}",
            value.type_name(),
            value,
            target
        )
    };
    match target {
        ColumnType::Text => Ok(match value {
            Value::Text(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string().into()),
        }),
        ColumnType::Integer => match value {
            Value::Integer(n) => Ok(Value::Integer(*n)),
            // i64::MAX itself is not representable as f64; the exclusive
            // upper bound (2^63) is, and rejects everything that would
            // saturate in the cast.
            Value::Float(x)
                if x.fract() == 0.0 && *x >= i64::MIN as f64 && *x < i64::MAX as f64 =>
            {
                Ok(Value::Integer(*x as i64))
            }
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| failure()),
            _ => Err(failure()),
        },
        ColumnType::Float => match value {
            Value::Float(x) => Ok(Value::Float(*x)),
            Value::Integer(n) => Ok(Value::Float(*n as f64)),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| failure()),
            _ => Err(failure()),
        },
        ColumnType::Boolean => match value {
            Value::Boolean(b) => Ok(Value::Boolean(*b)),
            Value::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(failure()),
            },
            _ => Err(failure()),
        },
        ColumnType::Timestamp => match value {
            Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
            Value::Integer(n) => Ok(Value::Timestamp(*n)),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Timestamp)
                .map_err(|_| failure()),
            _ => Err(failure()),
        },
        ColumnType::Json => match value {
            Value::Json(s) => Ok(Value::Json(s.clone())),
            Value::Text(s) => Ok(Value::Json(s.clone())),
            _ => Err(failure()),
        },
        ColumnType::Blob => match value {
            Value::Blob(b) => Ok(Value::Blob(b.clone())),
            _ => Err(failure()),
        },
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker used in text output for SQL NULL, distinct from an empty string.
pub const NULL_MARKER: &str = "NULL";

/// A single decoded result cell.
///
/// Serializes to the matching native JSON type (`null`, string, bool, number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    String(String),
    Boolean(bool),
    Long(i64),
    Double(f64),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Borrow the inner string, `None` for every other variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Text-forward rendering: `NULL` marker for nulls, `Display` otherwise.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// Native JSON value for typed output.
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Boolean(b) => serde_json::Value::Bool(*b),
            FieldValue::Long(n) => serde_json::Value::from(*n),
            // NaN / infinity have no JSON form.
            FieldValue::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str(NULL_MARKER),
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Long(n) => write!(f, "{}", n),
            FieldValue::Double(d) => write!(f, "{}", d),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Long(n)
    }
}

impl From<f64> for FieldValue {
    fn from(d: f64) -> Self {
        FieldValue::Double(d)
    }
}

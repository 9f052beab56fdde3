//! Typed field values of a Line Protocol point.

use ordered_float::OrderedFloat;
use serde::Serialize;

/// A field value.
///
/// Exactly one variant is active; values never convert implicitly. The lossy
/// `to_*` helpers exist for consumers that want a uniform numeric view.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Quoted string value.
    String(String),

    /// 64-bit floating point value (the default for bare numbers).
    Float(OrderedFloat<f64>),

    /// Signed 64-bit integer (`i` suffix on the wire).
    Integer(i64),

    /// Boolean value.
    Boolean(bool),
}

impl FieldValue {
    /// Returns the value as a string reference if it is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a f64 if it is a `Float` variant.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(f.into_inner()),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it is an `Integer` variant.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a bool if it is a `Boolean` variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Interprets any variant as a boolean.
    ///
    /// Numbers are true when non-zero; strings are true only for `"true"`
    /// (ASCII case-insensitive).
    pub fn to_bool_lossy(&self) -> bool {
        match self {
            FieldValue::String(s) => s.eq_ignore_ascii_case("true"),
            FieldValue::Float(f) => f.into_inner() != 0.0,
            FieldValue::Integer(i) => *i != 0,
            FieldValue::Boolean(b) => *b,
        }
    }

    /// Interprets any variant as an i64.
    ///
    /// Floats truncate toward zero, booleans map to 1/0 and strings that fail
    /// to parse yield 0.
    pub fn to_i64_lossy(&self) -> i64 {
        match self {
            FieldValue::String(s) => {
                if s.contains('.') {
                    s.parse::<f64>().map(|f| f as i64).unwrap_or(0)
                } else {
                    s.parse::<i64>().unwrap_or(0)
                }
            }
            FieldValue::Float(f) => f.into_inner() as i64,
            FieldValue::Integer(i) => *i,
            FieldValue::Boolean(b) => i64::from(*b),
        }
    }

    /// Interprets any variant as an f64. Unparseable strings yield 0.0.
    pub fn to_f64_lossy(&self) -> f64 {
        match self {
            FieldValue::String(s) => s.parse::<f64>().unwrap_or(0.0),
            FieldValue::Float(f) => f.into_inner(),
            FieldValue::Integer(i) => *i as f64,
            FieldValue::Boolean(b) => f64::from(u8::from(*b)),
        }
    }

    /// Plain text rendering without Line Protocol quoting or suffixes.
    pub fn to_string_lossy(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Float(f) => f.into_inner().to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
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

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(OrderedFloat::from(f))
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

/// Renders the value in Line Protocol encoding.
impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::String(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            // `{}` on f64 already omits the fraction for integral values.
            FieldValue::Float(d) => write!(f, "{}", d.into_inner()),
            FieldValue::Integer(i) => write!(f, "{}i", i),
            FieldValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

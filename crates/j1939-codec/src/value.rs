//! Signal values decoded from parameter groups

use std::collections::HashMap;

use serde::Serialize;

/// A decoded signal (SPN) value.
///
/// One parameter group mixes scaled floats, integer counts, flags, and
/// the occasional preformatted string in a single signal map, so the
/// value is a closed variant type rather than one dynamic type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SpnValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Signal-name to value mapping for one message. Keys are unique,
/// insertion order carries no meaning.
pub type SpnMap = HashMap<String, SpnValue>;

impl SpnValue {
    /// Numeric view of the value; flags and text have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SpnValue::Integer(v) => Some(*v as f64),
            SpnValue::Float(v) => Some(*v),
            SpnValue::Bool(_) | SpnValue::Text(_) => None,
        }
    }

    /// Integer view; floats truncate.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SpnValue::Integer(v) => Some(*v),
            SpnValue::Float(v) => Some(*v as i64),
            SpnValue::Bool(_) | SpnValue::Text(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SpnValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SpnValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for SpnValue {
    fn from(v: bool) -> Self {
        SpnValue::Bool(v)
    }
}

impl From<i64> for SpnValue {
    fn from(v: i64) -> Self {
        SpnValue::Integer(v)
    }
}

impl From<u32> for SpnValue {
    fn from(v: u32) -> Self {
        SpnValue::Integer(i64::from(v))
    }
}

impl From<f64> for SpnValue {
    fn from(v: f64) -> Self {
        SpnValue::Float(v)
    }
}

impl From<&str> for SpnValue {
    fn from(v: &str) -> Self {
        SpnValue::Text(v.to_string())
    }
}

impl From<String> for SpnValue {
    fn from(v: String) -> Self {
        SpnValue::Text(v)
    }
}

//! Node metadata values.
//!
//! Every [TimeTreeNode](crate::tree::TimeTreeNode) carries an open map from
//! string keys to [MetaValue]s. Values are written into Newick as
//! `[&key=value,...]` and parsed back from such blocks.

use std::fmt;

// =#========================================================================#=
// META VALUE
// =#========================================================================#=
/// A single metadata value attached to a tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// For floating point values
    Float(f64),
    /// For integer values
    Int(i64),
    /// For strings
    Text(String),
}

impl MetaValue {
    /// Interprets a raw annotation token: integers first, then floats, else text.
    ///
    /// # Example
    /// ```
    /// use phylogen::tree::MetaValue;
    ///
    /// assert_eq!(MetaValue::parse("3"), MetaValue::Int(3));
    /// assert_eq!(MetaValue::parse("0.5"), MetaValue::Float(0.5));
    /// assert_eq!(MetaValue::parse("tumour"), MetaValue::Text("tumour".into()));
    /// ```
    pub fn parse(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            MetaValue::Int(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            MetaValue::Float(v)
        } else {
            MetaValue::Text(raw.to_string())
        }
    }

    /// Returns the value as `f64` if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Float(v) => Some(*v),
            MetaValue::Int(v) => Some(*v as f64),
            MetaValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // `1.0`, not `1`
            MetaValue::Float(v) => write!(f, "{:?}", v),
            MetaValue::Int(v) => write!(f, "{}", v),
            MetaValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<i32> for MetaValue {
    fn from(v: i32) -> Self {
        MetaValue::Int(v as i64)
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

//! Payloads carried by model values.

use crate::ctmc::Alignment;
use crate::generators::population::PopulationFunction;
use crate::tree::TimeTree;
use std::fmt;
use std::sync::Arc;

// =#========================================================================#=
// PAYLOAD KIND
// =#========================================================================#=
/// Tag of a [Payload], used in parameter schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Boolean,
    Integer,
    Number,
    Text,
    IntegerArray,
    NumberArray,
    NumberMatrix,
    TextArray,
    TextMatrix,
    Tree,
    Alignment,
    PopulationFunction,
    PopulationFunctionArray,
}

impl PayloadKind {
    /// Returns whether a payload of kind `found` can be bound where `self` is expected.
    /// Integers widen to numbers, element-wise for arrays.
    pub fn accepts(self, found: PayloadKind) -> bool {
        self == found
            || (self == PayloadKind::Number && found == PayloadKind::Integer)
            || (self == PayloadKind::NumberArray && found == PayloadKind::IntegerArray)
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::Boolean => "boolean",
            PayloadKind::Integer => "integer",
            PayloadKind::Number => "number",
            PayloadKind::Text => "text",
            PayloadKind::IntegerArray => "integer array",
            PayloadKind::NumberArray => "number array",
            PayloadKind::NumberMatrix => "number matrix",
            PayloadKind::TextArray => "text array",
            PayloadKind::TextMatrix => "text matrix",
            PayloadKind::Tree => "time tree",
            PayloadKind::Alignment => "alignment",
            PayloadKind::PopulationFunction => "population function",
            PayloadKind::PopulationFunctionArray => "population function array",
        };
        f.write_str(name)
    }
}

// =#========================================================================#=
// PAYLOAD
// =#========================================================================#=
/// Content of a model value.
#[derive(Debug, Clone)]
pub enum Payload {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    IntegerArray(Vec<i64>),
    NumberArray(Vec<f64>),
    /// Row-major matrix
    NumberMatrix(Vec<Vec<f64>>),
    TextArray(Vec<String>),
    TextMatrix(Vec<Vec<String>>),
    Tree(TimeTree),
    Alignment(Alignment),
    PopulationFunction(Arc<dyn PopulationFunction>),
    PopulationFunctionArray(Vec<Arc<dyn PopulationFunction>>),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Boolean(_) => PayloadKind::Boolean,
            Payload::Integer(_) => PayloadKind::Integer,
            Payload::Number(_) => PayloadKind::Number,
            Payload::Text(_) => PayloadKind::Text,
            Payload::IntegerArray(_) => PayloadKind::IntegerArray,
            Payload::NumberArray(_) => PayloadKind::NumberArray,
            Payload::NumberMatrix(_) => PayloadKind::NumberMatrix,
            Payload::TextArray(_) => PayloadKind::TextArray,
            Payload::TextMatrix(_) => PayloadKind::TextMatrix,
            Payload::Tree(_) => PayloadKind::Tree,
            Payload::Alignment(_) => PayloadKind::Alignment,
            Payload::PopulationFunction(_) => PayloadKind::PopulationFunction,
            Payload::PopulationFunctionArray(_) => PayloadKind::PopulationFunctionArray,
        }
    }

    /// Numeric value of a number or integer payload.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Payload::Number(v) => Some(*v),
            Payload::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Payload::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Rows of a matrix payload, e.g. a rate matrix.
    pub fn as_number_matrix(&self) -> Option<&[Vec<f64>]> {
        match self {
            Payload::NumberMatrix(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&TimeTree> {
        match self {
            Payload::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_alignment(&self) -> Option<&Alignment> {
        match self {
            Payload::Alignment(alignment) => Some(alignment),
            _ => None,
        }
    }

    pub fn as_population_function(&self) -> Option<&Arc<dyn PopulationFunction>> {
        match self {
            Payload::PopulationFunction(function) => Some(function),
            _ => None,
        }
    }
}

/// Payloads compare by content; population functions by identity.
impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Boolean(a), Payload::Boolean(b)) => a == b,
            (Payload::Integer(a), Payload::Integer(b)) => a == b,
            (Payload::Number(a), Payload::Number(b)) => a == b,
            (Payload::Text(a), Payload::Text(b)) => a == b,
            (Payload::IntegerArray(a), Payload::IntegerArray(b)) => a == b,
            (Payload::NumberArray(a), Payload::NumberArray(b)) => a == b,
            (Payload::NumberMatrix(a), Payload::NumberMatrix(b)) => a == b,
            (Payload::TextArray(a), Payload::TextArray(b)) => a == b,
            (Payload::TextMatrix(a), Payload::TextMatrix(b)) => a == b,
            (Payload::Tree(a), Payload::Tree(b)) => a == b,
            (Payload::Alignment(a), Payload::Alignment(b)) => a == b,
            (Payload::PopulationFunction(a), Payload::PopulationFunction(b)) => Arc::ptr_eq(a, b),
            (Payload::PopulationFunctionArray(a), Payload::PopulationFunctionArray(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Boolean(v) => write!(f, "{}", v),
            Payload::Integer(v) => write!(f, "{}", v),
            Payload::Number(v) => write!(f, "{}", v),
            Payload::Text(v) => write!(f, "\"{}\"", v),
            Payload::IntegerArray(v) => write!(f, "{:?}", v),
            Payload::NumberArray(v) => write!(f, "{:?}", v),
            Payload::NumberMatrix(v) => write!(f, "{:?}", v),
            Payload::TextArray(v) => write!(f, "{:?}", v),
            Payload::TextMatrix(v) => write!(f, "{:?}", v),
            Payload::Tree(tree) => write!(f, "{}", tree.to_newick(true)),
            Payload::Alignment(alignment) => write!(
                f,
                "alignment({} taxa x {} sites)",
                alignment.num_taxa(),
                alignment.num_sites()
            ),
            Payload::PopulationFunction(function) => write!(f, "{:?}", function),
            Payload::PopulationFunctionArray(functions) => write!(f, "{:?}", functions),
        }
    }
}

impl From<bool> for Payload {
    fn from(v: bool) -> Self {
        Payload::Boolean(v)
    }
}

impl From<i64> for Payload {
    fn from(v: i64) -> Self {
        Payload::Integer(v)
    }
}

impl From<i32> for Payload {
    fn from(v: i32) -> Self {
        Payload::Integer(v as i64)
    }
}

impl From<f64> for Payload {
    fn from(v: f64) -> Self {
        Payload::Number(v)
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Text(v.to_string())
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Text(v)
    }
}

impl From<Vec<i64>> for Payload {
    fn from(v: Vec<i64>) -> Self {
        Payload::IntegerArray(v)
    }
}

impl From<Vec<f64>> for Payload {
    fn from(v: Vec<f64>) -> Self {
        Payload::NumberArray(v)
    }
}

impl From<Vec<Vec<f64>>> for Payload {
    fn from(v: Vec<Vec<f64>>) -> Self {
        Payload::NumberMatrix(v)
    }
}

impl From<Vec<String>> for Payload {
    fn from(v: Vec<String>) -> Self {
        Payload::TextArray(v)
    }
}

impl From<Vec<Vec<String>>> for Payload {
    fn from(v: Vec<Vec<String>>) -> Self {
        Payload::TextMatrix(v)
    }
}

impl From<TimeTree> for Payload {
    fn from(v: TimeTree) -> Self {
        Payload::Tree(v)
    }
}

impl From<Alignment> for Payload {
    fn from(v: Alignment) -> Self {
        Payload::Alignment(v)
    }
}

impl From<Arc<dyn PopulationFunction>> for Payload {
    fn from(v: Arc<dyn PopulationFunction>) -> Self {
        Payload::PopulationFunction(v)
    }
}

impl From<Vec<Arc<dyn PopulationFunction>>> for Payload {
    fn from(v: Vec<Arc<dyn PopulationFunction>>) -> Self {
        Payload::PopulationFunctionArray(v)
    }
}

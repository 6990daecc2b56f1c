//! Error type shared by the graphical model, the tree operations and the
//! sequence simulator.
//!
//! Argument problems (unknown or missing parameters, wrong payload kinds,
//! out-of-range selectors, singular matrices) are reported as [ModelError].
//! Broken structural invariants of a [TimeTree](crate::tree::TimeTree) are
//! programming faults and panic instead.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ModelError>;

// =#========================================================================#=
// MODEL ERROR
// =#========================================================================#=
/// Errors raised while building, evaluating or resampling a model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Argument outside the accepted range or shape of a generator or operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A parameter name that the generator does not declare.
    #[error("Generator '{generator}' has no parameter named '{name}'")]
    UnknownParameter { generator: String, name: String },

    /// A required parameter was not bound.
    #[error("Generator '{generator}' requires parameter '{name}'")]
    MissingParameter { generator: String, name: String },

    /// The same parameter name was bound twice.
    #[error("Parameter '{name}' of generator '{generator}' bound more than once")]
    DuplicateParameter { generator: String, name: String },

    /// A payload of the wrong kind was bound to or read from a parameter.
    #[error("Parameter '{name}' expects {expected} but found {found}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    /// Rebinding a parameter would make the model graph cyclic.
    #[error("Binding '{name}' would create a dependency cycle")]
    CyclicDependency { name: String },

    /// Eigenvector matrix of a rate matrix could not be inverted.
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// Lookup of a value by name failed.
    #[error("Unknown value '{0}'")]
    UnknownValue(String),
}

impl ModelError {
    /// Convenience constructor for [ModelError::InvalidArgument].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ModelError::InvalidArgument(message.into())
    }

    /// Convenience constructor for [ModelError::TypeMismatch].
    pub fn type_mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ModelError::TypeMismatch {
            name: name.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

//! Error types for expression rewriting.

use crate::ast::ValueType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RewriteError {
    /// A rewriter could not be built from the given roots, paths or converters.
    #[error("Invalid construction: {0}")]
    InvalidConstruction(String),

    /// A rewritten node no longer satisfies the type its context requires.
    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
        context: String,
    },

    /// A node that must stay a path was rewritten into something else.
    #[error("Expected a path, found: {0}")]
    NotAPath(String),

    #[error("Storing into '{0}' is not allowed")]
    DisallowedWrite(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Expression nesting exceeds the limit of {0}")]
    DepthExceeded(usize),

    #[error("Cannot convert {value} to {target}")]
    Conversion { value: String, target: ValueType },

    #[error("No provider registered for {kind} of '{entity}'")]
    UnknownProvider { kind: String, entity: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RewriteError {
    /// Create a type mismatch error.
    pub fn mismatch(
        expected: &ValueType,
        found: &ValueType,
        context: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.clone(),
            found: found.clone(),
            context: context.into(),
        }
    }

    /// Create a conversion error for a value that does not fit its target type.
    pub fn conversion(value: impl std::fmt::Display, target: &ValueType) -> Self {
        Self::Conversion {
            value: value.to_string(),
            target: target.clone(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConstruction(message.into())
    }
}

/// Result type alias for rewrite operations.
pub type RewriteResult<T> = Result<T, RewriteError>;

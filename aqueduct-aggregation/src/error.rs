//! Error types for aggregation pipeline compilation.

use thiserror::Error;

/// Result type for pipeline compilation.
pub type AggregationResult<T> = Result<T, AggregationError>;

/// Errors that can occur while compiling a pipeline to wire documents.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    /// A symbolic field reference did not resolve in the active context.
    #[error("unknown field '{name}' (visible fields: {available})")]
    UnknownField {
        /// The name that failed to resolve.
        name: String,
        /// Names visible at the failing stage, pre-joined for display.
        available: String,
    },

    /// The expression language referenced a function that has no
    /// aggregation operator mapping.
    #[error("unknown aggregation function '{0}'")]
    UnknownFunction(String),

    /// The expression language input did not parse.
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        /// 1-based line of the offending token.
        line: usize,
        /// 1-based column of the offending token.
        column: usize,
        /// Parser diagnostic.
        message: String,
    },

    /// A structural pipeline invariant was violated.
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// An operator was given arguments it cannot accept.
    #[error("invalid argument for {operator}: {message}")]
    InvalidArgument {
        /// The wire-format operator name (e.g. `$divide`).
        operator: String,
        /// What was wrong with the arguments.
        message: String,
    },

    /// The requested construct has no wire-format rendering.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl AggregationError {
    /// Create an unknown-field error.
    pub fn unknown_field(name: impl Into<String>, available: &[&str]) -> Self {
        Self::UnknownField {
            name: name.into(),
            available: if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            },
        }
    }

    /// Create an unknown-function error.
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction(name.into())
    }

    /// Create an invalid-pipeline error.
    pub fn invalid_pipeline(message: impl Into<String>) -> Self {
        Self::InvalidPipeline(message.into())
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operator: operator.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Check if this is an unknown-field error.
    pub fn is_unknown_field(&self) -> bool {
        matches!(self, Self::UnknownField { .. })
    }

    /// Check if this is a parse error.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

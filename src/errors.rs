//! Error types for stack composition and synthesis

use thiserror::Error;

use crate::domain::{HostnameError, NetworkError, ValidationError};

/// Errors that can occur while composing or synthesizing stacks
#[derive(Debug, Error)]
pub enum StackError {
    /// A stack with the same identifier was already added
    #[error("Duplicate stack id: {0}")]
    DuplicateStack(String),

    /// Two resources, parameters, conditions or outputs share a logical id
    #[error("Duplicate logical id '{logical_id}' in stack {stack}")]
    DuplicateLogicalId { stack: String, logical_id: String },

    /// Two outputs across the assembly export the same name
    #[error("Export name '{0}' is already exported by another output")]
    DuplicateExport(String),

    /// A stack imports a value no earlier stack exports
    #[error("Stack {stack} imports '{export}' which no earlier stack exports")]
    UnresolvedImport { stack: String, export: String },

    /// A reference names something the template does not declare
    #[error("Stack {stack}: '{logical_id}' references undeclared '{target}'")]
    UnresolvedReference {
        stack: String,
        logical_id: String,
        target: String,
    },

    /// A composition or parameter invariant failed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Address math failed
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Host header value failed validation
    #[error(transparent)]
    Hostname(#[from] HostnameError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem error while writing the cloud assembly
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for stack operations
pub type StackResult<T> = Result<T, StackError>;

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::Serialization(err.to_string())
    }
}

//! Error types for tsqlkit

use thiserror::Error;

/// Result type alias for tsqlkit operations
pub type TsqlResult<T> = Result<T, TsqlError>;

/// Error types for statement building and catalog introspection
#[derive(Debug, Error)]
pub enum TsqlError {
    /// A referenced table or column does not exist, or an input is malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested shape has no T-SQL expression
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The executor failed to run generated SQL
    #[error("Execution error: {0}")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl TsqlError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Wrap an executor failure without interpreting it
    pub fn upstream(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Upstream(err.into())
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Check if this is an unsupported operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation(_))
    }

    /// Check if this error came from the executor
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}

impl From<serde_json::Error> for TsqlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "tiberius")]
impl From<tiberius::error::Error> for TsqlError {
    fn from(err: tiberius::error::Error) -> Self {
        Self::Upstream(Box::new(err))
    }
}

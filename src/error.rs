use thiserror::Error;

/// Errors produced by the adapter layer.
///
/// Every facade converts these into its own host error convention through
/// [`crate::translate::HostError`]; nothing here is raised before the engine's
/// error flag has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Engine not available, path missing/unreadable, or no open connection.
    #[error("Connection error: {0}")]
    ConnectionFailure(String),

    /// Savepoints, nested transactions and other features the engine lacks.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Commit or rollback without a matching begin.
    #[error("Invalid transaction state: {0}")]
    InvalidTransactionState(String),

    /// The engine rejected the SQL or execution failed; message is verbatim.
    #[error("SQL execution error: {message}")]
    StatementError { message: String },

    /// Unknown abstract column kind, or a column spec missing name/type.
    #[error("Schema error: {0}")]
    SchemaError(String),
}

/// Fieldless classification of [`AdapterError`], used for host code tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConnectionFailure,
    UnsupportedFeature,
    InvalidTransactionState,
    StatementError,
    SchemaError,
}

impl AdapterError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::ConnectionFailure(_) => ErrorKind::ConnectionFailure,
            AdapterError::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            AdapterError::InvalidTransactionState(_) => ErrorKind::InvalidTransactionState,
            AdapterError::StatementError { .. } => ErrorKind::StatementError,
            AdapterError::SchemaError(_) => ErrorKind::SchemaError,
        }
    }

    /// The message without the category prefix added by `Display`.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            AdapterError::ConnectionFailure(m)
            | AdapterError::UnsupportedFeature(m)
            | AdapterError::InvalidTransactionState(m)
            | AdapterError::SchemaError(m) => m,
            AdapterError::StatementError { message } => message,
        }
    }

    pub(crate) fn not_connected() -> Self {
        AdapterError::ConnectionFailure("not connected to a database".into())
    }
}

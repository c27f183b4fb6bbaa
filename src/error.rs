use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlMiddlewareDbError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Empty criteria was used, expected non-empty criteria")]
    EmptyCriteria,

    #[error("Remote execution error: {0}")]
    RemoteExecution(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("{0} not implemented.")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlMiddlewareDbError {
    /// Shorthand for an operation the Spanner execution model cannot honour.
    pub(crate) fn unimplemented(operation: &str) -> Self {
        SqlMiddlewareDbError::Unimplemented(operation.to_string())
    }

    /// True when the error came back from the remote service rather than local validation.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, SqlMiddlewareDbError::RemoteExecution(_))
    }
}

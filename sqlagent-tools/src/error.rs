use sqlagent_core::ToolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlToolError {
    #[error("failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("{0}")]
    Query(#[source] sqlx::Error),
    #[error("unsafe report path '{0}': must be a relative file name inside the report directory")]
    UnsafePath(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SqlToolError> for ToolError {
    fn from(error: SqlToolError) -> Self {
        match error {
            SqlToolError::UnsafePath(_) => ToolError::InvalidInput(error.to_string()),
            SqlToolError::Io(source) => ToolError::Io(source),
            other => ToolError::ExecutionFailed(other.to_string()),
        }
    }
}

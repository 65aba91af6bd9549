use thiserror::Error;

/// Errors a tool can raise. Anything user-correctable (bad path, ambiguous
/// edit) is returned as an `"Error:"` result string instead; these variants
/// cover genuinely broken invocations and infrastructure failures.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Execution failed: {0}")]
    ExecutionError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<String> for ToolError {
    fn from(s: String) -> Self {
        ToolError::ExecutionError(s)
    }
}

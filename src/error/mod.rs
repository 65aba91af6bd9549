//! Error types, re-exported from their home modules plus a combining enum.

pub use crate::language_models::ModelError;
pub use crate::persistence::PersistenceError;
pub use crate::tools::ToolError;

/// Top-level error combining every subsystem, for callers that want one
/// `?`-friendly type across the crate.
#[derive(thiserror::Error, Debug)]
pub enum DeepAgentError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DeepAgentError>;

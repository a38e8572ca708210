//! Server-side errors

use docsign_core::{ConfigError, SignatureError};
use shared_pdf::FormError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Failed to load document: {0}")]
    DocumentLoad(String),

    #[error("Tool call timed out after {0}ms")]
    Timeout(u64),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ServerError {
    /// Name reported as `error_kind` in failed tool results.
    ///
    /// Form and signature failures keep their taxonomy kind; bad arguments
    /// count as `InvalidRequest`. Local I/O and protocol faults fall
    /// outside the taxonomy and report `InternalError`.
    pub fn error_kind(&self) -> &'static str {
        match self {
            ServerError::Form(e) => e.kind().as_str(),
            ServerError::Signature(e) => e.kind().as_str(),
            ServerError::InvalidArgument(_)
            | ServerError::UnknownTool(_)
            | ServerError::DocumentLoad(_)
            | ServerError::JsonError(_) => "InvalidRequest",
            ServerError::Timeout(_) => "Timeout",
            ServerError::Config(_) | ServerError::ProtocolError(_) | ServerError::IoError(_) => {
                "InternalError"
            }
        }
    }
}

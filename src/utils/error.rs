//! Error types and handling
//!
//! Common error types used across the engine.

use crate::capture::CaptureError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Storage error: {0}")]
    Storage(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Error response for host UIs
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<EngineError> for ErrorResponse {
    fn from(error: EngineError) -> Self {
        let code = match &error {
            EngineError::Io(_) => "IO_ERROR",
            EngineError::Serialization(_) => "SERIALIZATION_ERROR",
            EngineError::Capture(CaptureError::PermissionDenied(_)) => "PERMISSION_DENIED",
            EngineError::Capture(_) => "CAPTURE_ERROR",
            EngineError::Recording(_) => "RECORDING_ERROR",
            EngineError::Render(_) => "RENDER_ERROR",
            EngineError::Session(_) => "SESSION_ERROR",
            EngineError::Storage(_) => "STORAGE_ERROR",
            EngineError::Config(_) => "CONFIG_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;

//! Error types for the media service

use element_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error code carried by error responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Requested element or resource does not exist
    NotFound,
    /// Malformed create/update payload
    ValidationError,
    /// Unexpected failure
    InternalError,
    /// The resource does not offer this operation
    NotSupported,
}

impl ErrorCode {
    /// Equivalent HTTP status, for hosts that speak HTTP
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::ValidationError => 400,
            ErrorCode::InternalError => 500,
            ErrorCode::NotSupported => 405,
        }
    }
}

/// Errors that can occur while serving requests
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Element not found within a resource
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// No resource registered under this name
    #[error("Resource {0} not found")]
    ResourceNotFound(String),

    /// Payload failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Payload could not be decoded
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Operation not offered by this resource
    #[error("{resource} does not support {operation}")]
    NotSupported {
        resource: &'static str,
        operation: &'static str,
    },

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Timer runtime could not be started
    #[error("Failed to start timer runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ServiceError {
    /// Machine-readable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::NotFound { .. } | ServiceError::ResourceNotFound(_) => ErrorCode::NotFound,
            ServiceError::Validation(_) | ServiceError::InvalidPayload(_) => {
                ErrorCode::ValidationError
            }
            ServiceError::NotSupported { .. } => ErrorCode::NotSupported,
            ServiceError::Internal(_) | ServiceError::Config(_) | ServiceError::Runtime(_) => {
                ErrorCode::InternalError
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound { kind: "element", id },
            StoreError::DuplicateId(id) => {
                ServiceError::Internal(format!("generated id {} collides with an existing element", id))
            }
        }
    }
}

/// Result type for media service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

//! Error types for element stores

use thiserror::Error;

/// Errors returned by [`ElementStore`](crate::ElementStore) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No element with this id exists in the store
    #[error("Element {0} not found")]
    NotFound(String),

    /// An element with this id is already stored
    #[error("Element id {0} is already in use")]
    DuplicateId(String),
}

/// Result type for element store operations
pub type Result<T> = std::result::Result<T, StoreError>;

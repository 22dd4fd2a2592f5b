//! Custom error types for the common library
//!
//! This module defines the storage error types used by every component
//! that touches the durable key-value store.

use redis::RedisError;
use thiserror::Error;

/// Custom error type for durable-store operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error occurred while connecting to the store
    #[error("Store connection error: {0}")]
    Connection(#[source] RedisError),

    /// Error occurred while executing a store command
    #[error("Store command error: {0}")]
    Command(#[source] RedisError),

    /// Stored value could not be encoded or decoded
    #[error("Store encoding error: {0}")]
    Encoding(String),

    /// Configuration error
    #[error("Store configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;

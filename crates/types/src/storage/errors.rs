//! Storage error type

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
	#[error("Item not found: {id}")]
	NotFound { id: String },
	#[error("Storage operation failed: {message}")]
	Operation { message: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

//! Swap routing and execution errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwapError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("HTTP {status_code}: {reason}")]
	HttpStatus { status_code: u16, reason: String },

	#[error("Invalid swap response: {reason}")]
	InvalidResponse { reason: String },

	#[error("Swap execution failed: {message}")]
	ExecutionFailed { code: Option<i64>, message: String },

	#[error("Swap execution {execution_id} is not in flight")]
	UnknownExecution { execution_id: String },
}

pub type SwapResult<T> = Result<T, SwapError>;

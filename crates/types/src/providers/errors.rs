//! Errors raised by provider adapters

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("HTTP {status_code}: {reason}")]
	HttpStatus { status_code: u16, reason: String },

	#[error("Provider {provider} rejected the request: {message}")]
	Rejected { provider: String, message: String },

	#[error("Invalid response from {provider}: {reason}")]
	InvalidResponse { provider: String, reason: String },

	#[error("Order {order_id} not found on {provider}")]
	OrderNotFound { provider: String, order_id: String },

	#[error("Chain {chain_id} is not supported by {provider}")]
	ChainNotSupported { provider: String, chain_id: u64 },

	#[error("Unsupported operation: {operation} for provider {provider}")]
	UnsupportedOperation { operation: String, provider: String },

	#[error("Configuration error: {reason}")]
	Config { reason: String },

	#[error("Timeout occurred after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("Catalog error: {0}")]
	Catalog(#[from] crate::storage::StorageError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
	pub fn invalid_response(provider: &str, reason: impl Into<String>) -> Self {
		Self::InvalidResponse {
			provider: provider.to_string(),
			reason: reason.into(),
		}
	}
}

//! Error types for quote operations

use thiserror::Error;

use crate::storage::StorageError;

/// Malformed quote requests. Raised before any provider is contacted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteValidationError {
	#[error("Exactly one of amount or fiatAmount must be set, both were given")]
	ConflictingAmounts,

	#[error("Exactly one of amount or fiatAmount must be set, none was given")]
	MissingAmount,

	#[error("Invalid amount: {field} - {reason}")]
	InvalidAmount { field: String, reason: String },

	#[error("Unsupported route type: {route_type}")]
	UnsupportedRouteType { route_type: String },

	#[error("Unsupported chain: {chain_id}")]
	UnsupportedChain { chain_id: u64 },

	#[error("Unsupported fiat currency: {currency}")]
	UnsupportedFiatCurrency { currency: String },

	#[error("Missing required field: {field}")]
	MissingRequiredField { field: String },

	#[error("Token {address} not found on chain {chain_id}")]
	TokenNotFound { chain_id: u64, address: String },

	#[error("Token {symbol} cannot be priced: {reason}")]
	UnpriceableToken { symbol: String, reason: String },
}

pub type QuoteValidationResult<T> = Result<T, QuoteValidationError>;

/// Errors surfaced by the quote aggregator.
///
/// Individual provider failures never show up here, they only remove that provider from the
/// result.
#[derive(Error, Debug)]
pub enum QuoteError {
	#[error("Quote validation failed: {0}")]
	Validation(#[from] QuoteValidationError),

	#[error("Quote engine is not ready: {reason}")]
	NotReady { reason: String },

	#[error("Catalog error: {0}")]
	Catalog(#[from] StorageError),
}

pub type QuoteResult<T> = Result<T, QuoteError>;

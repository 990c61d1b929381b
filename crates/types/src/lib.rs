//! On-ramp Types
//!
//! Shared models and traits for the on-ramp quote aggregator.
//! This crate contains all domain models organized by business entity.

pub mod execution;
pub mod models;
pub mod orders;
pub mod providers;
pub mod quotes;
pub mod storage;
pub mod swaps;

// Re-export chrono and serde_json for convenience
pub use chrono;
pub use serde_json;

pub use models::{
	find_supported_chain, is_chain_supported, supported_chains, AmountError, Chain, FiatCurrency,
	SecretString, Token, TokenAmount, TokenKey, ETHEREUM_CHAIN_ID, ZKSYNC_ERA_CHAIN_ID,
};

pub use providers::{
	KycRequirement, PaymentMethod, ProviderAdapter, ProviderError, ProviderMeta, ProviderResult,
	ProviderType, RouteType, SupportedToken, SyncReport,
};

pub use quotes::{
	PayDetails, PaymentMethodQuote, ProviderQuote, QuoteError, QuoteOptions, QuoteRequest,
	QuoteResponse, QuoteResult, QuoteStep, QuoteValidationError, QuoteValidationResult,
	ReceiveDetails, StepKind,
};

pub use swaps::{
	GasCost, SwapError, SwapExecutionRequest, SwapExecutionService, SwapExecutionUpdate,
	SwapProcessUpdate, SwapQuote, SwapQuoteRequest, SwapResult, SwapRouteResolver,
	SwapUpdateHook,
};

pub use execution::{
	step_id, Executable, Execution, ExecutionError, ExecutionResult, ExecutionSettings,
	ExecutionStatus, Process, ProcessStatus, ProcessType, ProcessUpdate, Route, RouteStatus,
	StepExtended, UnexecutedRoute,
};

pub use orders::{OrderStatus, OrderStatusError, OrderStatusRecord};

pub use storage::{
	CatalogStorage, ProviderRouteStorageTrait, ReconcileOutcome, StorageError, StorageResult,
	SyncStateStorageTrait, TokenStorageTrait,
};

#[cfg(any(test, feature = "mocks"))]
pub use providers::MockProviderAdapter;
#[cfg(any(test, feature = "mocks"))]
pub use swaps::{MockSwapExecutionService, MockSwapRouteResolver};

//! Swap service contracts

use async_trait::async_trait;
use std::sync::Arc;

use super::{SwapExecutionRequest, SwapExecutionUpdate, SwapQuote, SwapQuoteRequest, SwapResult};

/// Callback receiving every progress snapshot of a swap execution
pub type SwapUpdateHook = Arc<dyn Fn(SwapExecutionUpdate) + Send + Sync>;

/// Client of an external swap-routing service
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait SwapRouteResolver: Send + Sync {
	/// Estimate a swap. `Ok(None)` means no route exists for this pair and amount.
	async fn get_swap_quote(&self, request: &SwapQuoteRequest) -> SwapResult<Option<SwapQuote>>;
}

/// External service that signs and submits swap transactions
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait SwapExecutionService: Send + Sync {
	/// Run (or resume) a swap to a terminal state, reporting progress through `on_update`
	async fn execute(
		&self,
		request: SwapExecutionRequest,
		on_update: SwapUpdateHook,
	) -> SwapResult<SwapExecutionUpdate>;

	/// Toggle background mode of an in-flight swap
	async fn update_execution(&self, execution_id: &str, execute_in_background: bool) -> SwapResult<()>;
}

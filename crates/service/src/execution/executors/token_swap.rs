//! Hand a swap leg to the external swap-execution service and mirror its progress

use async_trait::async_trait;
use onramp_types::{
	ExecutionError, ExecutionResult, ExecutionStatus, ProcessType, ProcessUpdate,
	SwapExecutionRequest, SwapExecutionService, SwapExecutionUpdate, SwapUpdateHook,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::StepExecutor;
use crate::execution::context::{StepContext, StepOutcome};

const DEFAULT_FAILURE_MESSAGE: &str = "Action failed.";

/// Human readable message for a swap-executor error code
pub fn swap_error_message(code: Option<i64>) -> &'static str {
	match code {
		Some(1002) => "Transaction was underpriced.",
		Some(1003) => "Transaction reverted.",
		Some(1007) => "Please switch to the right chain in your wallet.",
		Some(1009) => "Gas limit is too low.",
		Some(1010) => "Transaction was cancelled.",
		Some(1011) => "Slippage exceeded the allowed limit.",
		Some(1012) => "Signature was rejected.",
		Some(1013) => "Balance is too low.",
		Some(1015) => "Insufficient funds.",
		Some(1017) => "Wallet changed during the transaction.",
		_ => DEFAULT_FAILURE_MESSAGE,
	}
}

/// Fold a service snapshot into the step's SWAP process
fn swap_process_update(update: &SwapExecutionUpdate) -> ProcessUpdate {
	let latest = update.processes.last();
	let message = match latest {
		Some(process) => match (&process.message, process.status) {
			(Some(message), _) => message.clone(),
			(None, ExecutionStatus::Failed) => swap_error_message(process.error_code).to_string(),
			(None, status) => format!("Swap {} is {:?}.", process.kind, status).to_lowercase(),
		},
		None => match update.status {
			ExecutionStatus::Done => "Swap completed.".to_string(),
			ExecutionStatus::Failed => DEFAULT_FAILURE_MESSAGE.to_string(),
			_ => "Swap in progress.".to_string(),
		},
	};

	let mut process = ProcessUpdate::new(ProcessType::Swap, update.status, message)
		.with_param("executionId", update.execution_id.clone());
	if let Some(latest) = latest {
		process = process.with_param("phase", latest.kind.clone());
		if let Some(tx_hash) = &latest.tx_hash {
			process = process.with_param("txHash", tx_hash.clone());
		}
		if let Some(code) = latest.error_code {
			process = process.with_param("errorCode", code);
		}
	}
	if let Some(state) = &update.state {
		process = process.with_param("state", state.clone());
	}
	process
}

pub struct TokenSwapExecutor {
	service: Arc<dyn SwapExecutionService>,
}

impl TokenSwapExecutor {
	pub fn new(service: Arc<dyn SwapExecutionService>) -> Self {
		Self { service }
	}
}

#[async_trait]
impl StepExecutor for TokenSwapExecutor {
	async fn execute(&self, ctx: &StepContext) -> ExecutionResult<StepOutcome> {
		let step = ctx.step()?;
		let quote = match &step.step {
			onramp_types::QuoteStep::TokenSwap { swap_quote } => swap_quote.clone(),
			other => {
				return Err(ExecutionError::InvalidStep {
					step_id: ctx.step_id().to_string(),
					reason: format!("expected a token swap step, got {}", other.kind()),
				})
			},
		};

		// Progress the service reported before a halt lets it pick up where it left off
		let resume_state = step
			.execution
			.as_ref()
			.and_then(|execution| execution.find_process(ProcessType::Swap))
			.and_then(|process| process.params.get("state").cloned());

		ctx.set_status(ExecutionStatus::Pending)?;

		let on_update: SwapUpdateHook = {
			let ctx = ctx.clone();
			Arc::new(move |update: SwapExecutionUpdate| {
				if let Err(e) = ctx.update_process(swap_process_update(&update)) {
					debug!(step_id = %ctx.step_id(), "Dropping swap progress: {}", e);
				}
			})
		};

		let request = SwapExecutionRequest {
			execution_id: ctx.step_id().to_string(),
			quote,
			resume_state,
			execute_in_background: ctx.execute_in_background(),
		};

		let result = match self.service.execute(request, on_update).await {
			Ok(result) => result,
			Err(e) => {
				ctx.fail(ProcessUpdate::new(
					ProcessType::Swap,
					ExecutionStatus::Failed,
					e.to_string(),
				))?;
				return Err(ExecutionError::Swap {
					step_id: ctx.step_id().to_string(),
					message: e.to_string(),
				});
			},
		};

		let process = ctx.update_process(swap_process_update(&result))?;
		match result.status {
			ExecutionStatus::Done => {
				ctx.set_status(ExecutionStatus::Done)?;
				info!(step_id = %ctx.step_id(), "Swap completed");
				Ok(StepOutcome::Done)
			},
			ExecutionStatus::Failed => {
				ctx.set_status(ExecutionStatus::Failed)?;
				Err(ExecutionError::Swap {
					step_id: ctx.step_id().to_string(),
					message: process.message,
				})
			},
			status => {
				ctx.set_status(status)?;
				info!(step_id = %ctx.step_id(), "Swap returned without completing: {:?}", status);
				Ok(StepOutcome::Parked)
			},
		}
	}
}

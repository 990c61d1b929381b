//! Pay through a provider's hosted payment page, then follow the order until it settles

use async_trait::async_trait;
use onramp_types::{
	ExecutionError, ExecutionResult, ExecutionStatus, OrderStatus, OrderStatusRecord,
	ProcessType, ProcessUpdate, ProviderAdapter,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::StepExecutor;
use crate::execution::context::{StepContext, StepOutcome};
use crate::execution::payment_flow::{PaymentFlow, PaymentFlowOutcome, PaymentFlowRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
	pub interval: Duration,
	/// Give up polling after this long. `None` polls until the route is stopped.
	pub timeout: Option<Duration>,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(3),
			timeout: None,
		}
	}
}

/// STATUS_CHECK process update for one observed order status
fn status_check_update(
	provider_name: &str,
	order_id: &str,
	record: &OrderStatusRecord,
) -> ProcessUpdate {
	let (status, message) = match record.status {
		OrderStatus::AwaitingPaymentFromUser | OrderStatus::PaymentDoneMarkedByUser => {
			(ExecutionStatus::Pending, "Order is awaiting payment.".to_string())
		},
		OrderStatus::Processing | OrderStatus::PendingDelivery => (
			ExecutionStatus::Pending,
			format!("Payment is pending processing with {}.", provider_name),
		),
		OrderStatus::OnHoldPendingDelivery => (
			ExecutionStatus::Pending,
			format!(
				"Order is on hold pending delivery from {}. Order ID: {}",
				provider_name, order_id
			),
		),
		OrderStatus::Completed => (
			ExecutionStatus::Done,
			record
				.status_message
				.clone()
				.unwrap_or_else(|| "Payment completed successfully.".to_string()),
		),
		OrderStatus::Cancelled => (ExecutionStatus::Cancelled, "Payment was cancelled.".to_string()),
		OrderStatus::Expired => (ExecutionStatus::Cancelled, "Order expired.".to_string()),
		OrderStatus::Refunded => (ExecutionStatus::Cancelled, "Order was refunded.".to_string()),
		OrderStatus::Failed => (
			ExecutionStatus::Failed,
			format!(
				"Order failed: {}",
				record.status_message.as_deref().unwrap_or("unknown reason")
			),
		),
	};

	let mut update =
		ProcessUpdate::new(ProcessType::StatusCheck, status, message).with_order_id(order_id);
	if record.status == OrderStatus::Completed {
		if let Some(crypto_amount) = record.crypto_amount {
			update = update.with_param("to_amount", crypto_amount);
		}
		if !record.crypto_currency.is_empty() {
			update = update.with_param("to_token", record.crypto_currency.clone());
		}
		if let Some(fiat_amount) = record.fiat_amount {
			update = update.with_param("from_amount", fiat_amount);
		}
		if !record.fiat_currency.is_empty() {
			update = update.with_param("from_currency", record.fiat_currency.clone());
		}
	}
	update
}

pub struct ExternalLinkExecutor {
	provider: Arc<dyn ProviderAdapter>,
	payment_flow: Arc<dyn PaymentFlow>,
	poll: PollConfig,
}

impl ExternalLinkExecutor {
	pub fn new(
		provider: Arc<dyn ProviderAdapter>,
		payment_flow: Arc<dyn PaymentFlow>,
		poll: PollConfig,
	) -> Self {
		Self {
			provider,
			payment_flow,
			poll,
		}
	}

	/// Open the payment page, or return the order id of a payment already completed
	async fn open_payment(&self, ctx: &StepContext, link: &str) -> ExecutionResult<Option<String>> {
		let step = ctx.step()?;
		let paid_order = step.execution.as_ref().and_then(|execution| {
			execution
				.find_process(ProcessType::External)
				.filter(|p| p.status == ExecutionStatus::Done)
				.and_then(|p| p.order_id.clone())
		});
		if let Some(order_id) = paid_order {
			debug!(step_id = %ctx.step_id(), order_id = %order_id, "Resuming after completed payment");
			return Ok(Some(order_id));
		}

		let provider_name = &ctx.provider().name;
		ctx.update_process(ProcessUpdate::new(
			ProcessType::External,
			ExecutionStatus::ActionRequired,
			format!("Complete payment process in {} window.", provider_name),
		))?;
		ctx.set_status(ExecutionStatus::ActionRequired)?;

		// Nobody is around to complete the payment
		if ctx.execute_in_background() {
			info!(step_id = %ctx.step_id(), "Payment needs the user, parking step");
			return Ok(None);
		}

		let outcome = self
			.payment_flow
			.open(PaymentFlowRequest {
				route_id: ctx.route_id().to_string(),
				step_id: ctx.step_id().to_string(),
				provider: ctx.provider().clone(),
				link: link.to_string(),
			})
			.await;

		match outcome {
			PaymentFlowOutcome::Completed { order_id } => {
				ctx.update_process(
					ProcessUpdate::new(
						ProcessType::External,
						ExecutionStatus::Done,
						format!("Payment completed with {}. Order ID: {}", provider_name, order_id),
					)
					.with_order_id(order_id.clone())
					.with_param("orderId", order_id.clone()),
				)?;
				ctx.set_status(ExecutionStatus::Pending)?;
				Ok(Some(order_id))
			},
			PaymentFlowOutcome::Closed => {
				ctx.update_process(ProcessUpdate::new(
					ProcessType::External,
					ExecutionStatus::Cancelled,
					"Payment window was closed before completing the process.",
				))?;
				ctx.set_status(ExecutionStatus::Cancelled)?;
				Ok(None)
			},
			PaymentFlowOutcome::FailedToOpen { reason } => {
				ctx.fail(ProcessUpdate::new(
					ProcessType::External,
					ExecutionStatus::Failed,
					"Payment window failed to open.",
				))?;
				Err(ExecutionError::PaymentFlow { message: reason })
			},
		}
	}

	/// Poll the order until it settles, the route is stopped, or the poll budget runs out
	async fn poll_order(&self, ctx: &StepContext, order_id: &str) -> ExecutionResult<StepOutcome> {
		let provider_name = ctx.provider().name.clone();
		let started = Instant::now();
		let mut control = ctx.control();
		let mut ticker = interval(self.poll.interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = ticker.tick() => {},
				changed = control.changed() => {
					// Settings sender gone means the route left the store
					if changed.is_err() {
						return Ok(StepOutcome::Stopped);
					}
				},
			}

			if !ctx.allow_execution() {
				debug!(step_id = %ctx.step_id(), "Stop observed while polling order status");
				return Ok(StepOutcome::Stopped);
			}

			if let Some(budget) = self.poll.timeout {
				let elapsed = started.elapsed();
				if elapsed >= budget {
					ctx.fail(
						ProcessUpdate::new(
							ProcessType::StatusCheck,
							ExecutionStatus::Failed,
							"Gave up waiting for the order to settle.",
						)
						.with_order_id(order_id),
					)?;
					return Err(ExecutionError::PollTimeout {
						step_id: ctx.step_id().to_string(),
						elapsed_ms: elapsed.as_millis() as u64,
					});
				}
			}

			let record = self
				.provider
				.get_order_status(order_id, ctx.dev())
				.await
				.map_err(|e| ExecutionError::Provider {
					provider: self.provider.meta().key.clone(),
					message: e.to_string(),
				})?;

			// The lookup cannot be interrupted, drop its result if a stop arrived meanwhile
			if !ctx.allow_execution() {
				return Ok(StepOutcome::Stopped);
			}

			let update = status_check_update(&provider_name, order_id, &record);
			let status = update.status;
			let process = ctx.update_process(update)?;
			match status {
				ExecutionStatus::Done => {
					ctx.set_status(ExecutionStatus::Done)?;
					info!(step_id = %ctx.step_id(), order_id = %order_id, "Order settled");
					return Ok(StepOutcome::Done);
				},
				ExecutionStatus::Cancelled => {
					ctx.set_status(ExecutionStatus::Cancelled)?;
					warn!(step_id = %ctx.step_id(), order_id = %order_id, "{}", process.message);
					return Ok(StepOutcome::Parked);
				},
				ExecutionStatus::Failed => {
					ctx.set_status(ExecutionStatus::Failed)?;
					return Err(ExecutionError::StepFailed {
						step_id: ctx.step_id().to_string(),
						message: process.message,
					});
				},
				ExecutionStatus::Pending | ExecutionStatus::ActionRequired => {
					debug!(step_id = %ctx.step_id(), order_id = %order_id, "{}", process.message);
				},
			}
		}
	}
}

#[async_trait]
impl StepExecutor for ExternalLinkExecutor {
	async fn execute(&self, ctx: &StepContext) -> ExecutionResult<StepOutcome> {
		let step = ctx.step()?;
		let link = step
			.step
			.link()
			.ok_or_else(|| ExecutionError::InvalidStep {
				step_id: ctx.step_id().to_string(),
				reason: format!("expected a payment link step, got {}", step.kind()),
			})?
			.to_string();

		match self.open_payment(ctx, &link).await? {
			Some(order_id) => self.poll_order(ctx, &order_id).await,
			None => Ok(StepOutcome::Parked),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(status: OrderStatus) -> OrderStatusRecord {
		OrderStatusRecord::new(status)
	}

	#[test]
	fn test_pending_statuses() {
		let update = status_check_update("Kado", "o-1", &record(OrderStatus::Processing));
		assert_eq!(update.status, ExecutionStatus::Pending);
		assert_eq!(update.message, "Payment is pending processing with Kado.");

		let update = status_check_update("Kado", "o-1", &record(OrderStatus::OnHoldPendingDelivery));
		assert_eq!(
			update.message,
			"Order is on hold pending delivery from Kado. Order ID: o-1"
		);
	}

	#[test]
	fn test_completed_carries_amounts() {
		let mut completed = record(OrderStatus::Completed);
		completed.crypto_amount = Some(96.5);
		completed.crypto_currency = "USDC".to_string();
		completed.fiat_amount = Some(100.0);
		completed.fiat_currency = "USD".to_string();

		let update = status_check_update("Transak", "o-1", &completed);
		assert_eq!(update.status, ExecutionStatus::Done);
		assert_eq!(update.message, "Payment completed successfully.");
		assert_eq!(update.params["to_token"], "USDC");
		assert_eq!(update.params["from_amount"], 100.0);

		let settled = record(OrderStatus::Completed)
			.with_message("Payment successful. Kado transfer settled successfully.");
		let update = status_check_update("Kado", "o-1", &settled);
		assert_eq!(
			update.message,
			"Payment successful. Kado transfer settled successfully."
		);
	}

	#[test]
	fn test_terminal_failures() {
		let update = status_check_update("Kado", "o-1", &record(OrderStatus::Expired));
		assert_eq!(update.status, ExecutionStatus::Cancelled);
		assert_eq!(update.message, "Order expired.");

		let failed = record(OrderStatus::Failed).with_message("card declined");
		let update = status_check_update("Kado", "o-1", &failed);
		assert_eq!(update.status, ExecutionStatus::Failed);
		assert_eq!(update.message, "Order failed: card declined");
	}
}

//! Route execution errors

use thiserror::Error;

/// Errors that abort a route.
///
/// `Clone` so that every caller joined on the same execution receives the same outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
	#[error("Route not found: {route_id}")]
	RouteNotFound { route_id: String },

	#[error("No executor for provider {provider} and step {step_kind}")]
	ExecutorNotFound { provider: String, step_kind: String },

	#[error("Step {step_id} cannot be executed: {reason}")]
	InvalidStep { step_id: String, reason: String },

	#[error("Step {step_id} failed: {message}")]
	StepFailed { step_id: String, message: String },

	#[error("Provider {provider} error: {message}")]
	Provider { provider: String, message: String },

	#[error("Swap in step {step_id} failed: {message}")]
	Swap { step_id: String, message: String },

	#[error("Payment flow error: {message}")]
	PaymentFlow { message: String },

	#[error("Status polling for step {step_id} gave up after {elapsed_ms}ms")]
	PollTimeout { step_id: String, elapsed_ms: u64 },

	#[error("Route {route_id} was removed while executing")]
	Evicted { route_id: String },
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

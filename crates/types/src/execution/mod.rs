//! Executable routes and their per-step execution log

pub mod errors;

pub use errors::{ExecutionError, ExecutionResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::{KycRequirement, PaymentMethod, ProviderMeta, RouteType};
use crate::quotes::{PayDetails, PaymentMethodQuote, QuoteStep, ReceiveDetails, StepKind};

/// Route lifecycle. There is no failed state, failures surface as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
	Running,
	Halting,
	Halted,
	Done,
}

/// Status of a step execution, a process, or a swap phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
	Pending,
	ActionRequired,
	Done,
	Failed,
	Cancelled,
}

pub type ProcessStatus = ExecutionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessType {
	/// User-facing payment flow
	External,
	/// Polling of the provider's order status
	StatusCheck,
	/// Phase mirrored from the swap-execution service
	Swap,
}

/// One logged phase or attempt within a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
	#[serde(rename = "type")]
	pub process_type: ProcessType,
	pub status: ProcessStatus,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
	#[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
	pub params: serde_json::Map<String, serde_json::Value>,
	pub started_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub done_at: Option<DateTime<Utc>>,
}

impl Process {
	pub fn new(process_type: ProcessType, status: ProcessStatus, message: impl Into<String>) -> Self {
		let mut process = Self {
			process_type,
			status,
			message: message.into(),
			order_id: None,
			params: serde_json::Map::new(),
			started_at: Utc::now(),
			done_at: None,
		};
		process.stamp();
		process
	}

	pub(crate) fn stamp(&mut self) {
		self.done_at = match self.status {
			ExecutionStatus::Done | ExecutionStatus::Failed | ExecutionStatus::Cancelled => {
				Some(self.done_at.unwrap_or_else(Utc::now))
			},
			_ => None,
		};
	}
}

/// Partial update applied to a process
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessUpdate {
	pub process_type: ProcessType,
	pub status: ProcessStatus,
	pub message: String,
	pub order_id: Option<String>,
	pub params: serde_json::Map<String, serde_json::Value>,
}

impl ProcessUpdate {
	pub fn new(process_type: ProcessType, status: ProcessStatus, message: impl Into<String>) -> Self {
		Self {
			process_type,
			status,
			message: message.into(),
			order_id: None,
			params: serde_json::Map::new(),
		}
	}

	pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
		self.order_id = Some(order_id.into());
		self
	}

	pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.params.insert(key.to_string(), value.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
	pub status: ExecutionStatus,
	pub process: Vec<Process>,
}

impl Default for Execution {
	fn default() -> Self {
		Self {
			status: ExecutionStatus::Pending,
			process: Vec::new(),
		}
	}
}

impl Execution {
	pub fn find_process(&self, process_type: ProcessType) -> Option<&Process> {
		self.process.iter().find(|p| p.process_type == process_type)
	}

	/// Drop every process that did not reach DONE
	pub fn prune_unfinished(&mut self) {
		self.process.retain(|p| p.status == ExecutionStatus::Done);
	}

	/// Merge `update` into the process of the same type, creating it if missing
	pub fn apply(&mut self, update: ProcessUpdate) -> &Process {
		let index = match self
			.process
			.iter()
			.position(|p| p.process_type == update.process_type)
		{
			Some(index) => index,
			None => {
				self.process.push(Process::new(
					update.process_type,
					update.status,
					update.message.clone(),
				));
				self.process.len() - 1
			},
		};
		let process = &mut self.process[index];
		process.status = update.status;
		process.message = update.message;
		if update.order_id.is_some() {
			process.order_id = update.order_id;
		}
		process.params.extend(update.params);
		process.stamp();
		&self.process[index]
	}
}

/// A quote step with its id and execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExtended {
	pub id: String,
	#[serde(flatten)]
	pub step: QuoteStep,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub execution: Option<Execution>,
}

impl StepExtended {
	pub fn kind(&self) -> StepKind {
		self.step.kind()
	}

	pub fn status(&self) -> Option<ExecutionStatus> {
		self.execution.as_ref().map(|e| e.status)
	}

	pub fn is_done(&self) -> bool {
		self.status() == Some(ExecutionStatus::Done)
	}
}

/// A selected quote that has not been handed to the coordinator yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnexecutedRoute {
	pub provider: ProviderMeta,
	#[serde(flatten)]
	pub quote: PaymentMethodQuote,
}

impl UnexecutedRoute {
	pub fn new(provider: ProviderMeta, quote: PaymentMethodQuote) -> Self {
		Self { provider, quote }
	}
}

/// Executable instance of a quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
	pub id: String,
	pub status: RouteStatus,
	pub provider: ProviderMeta,
	#[serde(rename = "type")]
	pub route_type: RouteType,
	pub pay: PayDetails,
	pub receive: ReceiveDetails,
	pub payment_methods: Vec<PaymentMethod>,
	pub kyc: Vec<KycRequirement>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country: Option<String>,
	pub steps: Vec<StepExtended>,
}

impl Route {
	/// Promote a quote, assigning `id` and step ids of the form `{id}:{index}`
	pub fn from_quote(id: impl Into<String>, unexecuted: UnexecutedRoute) -> Self {
		let id = id.into();
		let UnexecutedRoute { provider, quote } = unexecuted;
		let steps = quote
			.steps
			.into_iter()
			.enumerate()
			.map(|(index, step)| StepExtended {
				id: step_id(&id, index),
				step,
				execution: None,
			})
			.collect();
		Self {
			id,
			status: RouteStatus::Running,
			provider,
			route_type: quote.route_type,
			pay: quote.pay,
			receive: quote.receive,
			payment_methods: quote.payment_methods,
			kyc: quote.kyc,
			country: quote.country,
			steps,
		}
	}

	/// Clear non-DONE processes of failed steps so they are retried from scratch
	pub fn prune_failed_steps(&mut self) {
		for step in &mut self.steps {
			if let Some(execution) = step.execution.as_mut() {
				if execution.status == ExecutionStatus::Failed {
					execution.prune_unfinished();
				}
			}
		}
	}
}

pub fn step_id(route_id: &str, index: usize) -> String {
	format!("{}:{}", route_id, index)
}

/// Input accepted by the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum Executable {
	Quote(UnexecutedRoute),
	Route(Route),
}

impl From<UnexecutedRoute> for Executable {
	fn from(quote: UnexecutedRoute) -> Self {
		Executable::Quote(quote)
	}
}

impl From<Route> for Executable {
	fn from(route: Route) -> Self {
		Executable::Route(route)
	}
}

/// Per-route flags read by executors at their safe points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSettings {
	pub allow_execution: bool,
	pub execute_in_background: bool,
}

impl Default for ExecutionSettings {
	fn default() -> Self {
		Self {
			allow_execution: true,
			execute_in_background: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{Chain, FiatCurrency, Token, TokenAmount};
	use crate::providers::ProviderType;

	fn unexecuted() -> UnexecutedRoute {
		let token = Token::new(324, "0xusdc", "USDC", 6, 1.0);
		UnexecutedRoute::new(
			ProviderMeta::new("kado", ProviderType::Onramp, "Kado", ""),
			PaymentMethodQuote {
				route_type: RouteType::Buy,
				pay: PayDetails {
					currency: FiatCurrency::Usd,
					fiat_amount: 100.0,
					total_fee_fiat: 3.0,
					min_amount_fiat: None,
					max_amount_fiat: None,
				},
				receive: ReceiveDetails {
					to: "0xme".to_string(),
					token,
					chain: Chain::new(324, "ZKsync Era"),
					amount_units: TokenAmount::from(97_000_000u64),
					amount_fiat: 97.0,
				},
				steps: vec![QuoteStep::PayViaExternalLink {
					link: "https://pay.example".to_string(),
				}],
				payment_methods: vec![PaymentMethod::CreditCard],
				kyc: vec![],
				country: None,
			},
		)
	}

	#[test]
	fn test_from_quote_assigns_step_ids() {
		let route = Route::from_quote("r1", unexecuted());
		assert_eq!(route.status, RouteStatus::Running);
		assert_eq!(route.steps[0].id, "r1:0");
		assert!(route.steps[0].execution.is_none());
	}

	#[test]
	fn test_apply_merges_by_process_type() {
		let mut execution = Execution::default();
		execution.apply(ProcessUpdate::new(
			ProcessType::External,
			ExecutionStatus::ActionRequired,
			"open",
		));
		let process = execution.apply(
			ProcessUpdate::new(ProcessType::External, ExecutionStatus::Done, "paid")
				.with_order_id("o-1")
				.with_param("orderId", "o-1"),
		);
		assert_eq!(process.status, ExecutionStatus::Done);
		assert!(process.done_at.is_some());
		assert_eq!(execution.process.len(), 1);
		assert_eq!(execution.process[0].order_id.as_deref(), Some("o-1"));
	}

	#[test]
	fn test_prune_failed_steps_keeps_done_processes() {
		let mut route = Route::from_quote("r1", unexecuted());
		let mut execution = Execution {
			status: ExecutionStatus::Failed,
			process: vec![],
		};
		execution.apply(ProcessUpdate::new(ProcessType::External, ExecutionStatus::Done, "paid"));
		execution.apply(ProcessUpdate::new(
			ProcessType::StatusCheck,
			ExecutionStatus::Failed,
			"declined",
		));
		route.steps[0].execution = Some(execution);

		route.prune_failed_steps();
		let execution = route.steps[0].execution.as_ref().unwrap();
		assert_eq!(execution.process.len(), 1);
		assert_eq!(execution.process[0].process_type, ProcessType::External);
	}

	#[test]
	fn test_route_serializes_flattened_steps() {
		let route = Route::from_quote("r1", unexecuted());
		let json = serde_json::to_value(&route).unwrap();
		assert_eq!(json["steps"][0]["type"], "pay_via_external_link");
		assert_eq!(json["steps"][0]["id"], "r1:0");
		assert_eq!(json["status"], "RUNNING");
	}
}

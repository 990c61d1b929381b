//! Host-side collaborators: payment flow, swap routing and swap execution

#![allow(dead_code)]

use async_trait::async_trait;
use onramp_aggregator::models::{
	ExecutionStatus, GasCost, SwapError, SwapExecutionRequest, SwapExecutionService,
	SwapExecutionUpdate, SwapProcessUpdate, SwapQuote, SwapQuoteRequest, SwapResult,
	SwapRouteResolver, SwapUpdateHook,
};
use onramp_aggregator::{PaymentFlow, PaymentFlowOutcome, PaymentFlowRequest};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Answers payment requests from a script, after an optional delay.
///
/// Once the script runs out every request is answered with `Closed`.
pub struct ScriptedPaymentFlow {
	outcomes: Mutex<VecDeque<PaymentFlowOutcome>>,
	delay: Duration,
	requests: Mutex<Vec<PaymentFlowRequest>>,
}

impl ScriptedPaymentFlow {
	pub fn new(outcomes: Vec<PaymentFlowOutcome>) -> Self {
		Self {
			outcomes: Mutex::new(outcomes.into()),
			delay: Duration::ZERO,
			requests: Mutex::new(Vec::new()),
		}
	}

	/// User pays and the provider assigns `order_id`
	pub fn paying(order_id: &str) -> Self {
		Self::new(vec![PaymentFlowOutcome::Completed {
			order_id: order_id.to_string(),
		}])
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}

	pub fn requests(&self) -> Vec<PaymentFlowRequest> {
		self.requests.lock().unwrap().clone()
	}
}

#[async_trait]
impl PaymentFlow for ScriptedPaymentFlow {
	async fn open(&self, request: PaymentFlowRequest) -> PaymentFlowOutcome {
		self.requests.lock().unwrap().push(request);
		if !self.delay.is_zero() {
			tokio::time::sleep(self.delay).await;
		}
		self.outcomes
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or(PaymentFlowOutcome::Closed)
	}
}

/// Swaps at a fixed output ratio and gas cost, valued at catalog prices
pub struct FixedSwapResolver {
	output_ratio: f64,
	gas_usd: f64,
	/// Input symbols there is no route from
	no_route_from: Vec<String>,
	calls: AtomicUsize,
}

impl FixedSwapResolver {
	pub fn new(output_ratio: f64, gas_usd: f64) -> Self {
		Self {
			output_ratio,
			gas_usd,
			no_route_from: Vec::new(),
			calls: AtomicUsize::new(0),
		}
	}

	pub fn without_route_from(mut self, symbol: &str) -> Self {
		self.no_route_from.push(symbol.to_string());
		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl SwapRouteResolver for FixedSwapResolver {
	async fn get_swap_quote(&self, request: &SwapQuoteRequest) -> SwapResult<Option<SwapQuote>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if self.no_route_from.contains(&request.from_token.symbol) {
			return Ok(None);
		}

		let invalid = |e: onramp_aggregator::models::AmountError| SwapError::InvalidResponse {
			reason: e.to_string(),
		};
		let from_amount_usd = request
			.from_token
			.fiat_for_units(&request.from_amount)
			.map_err(invalid)?;
		let to_amount_usd = from_amount_usd * self.output_ratio;
		let to_amount = request
			.to_token
			.units_for_fiat(to_amount_usd)
			.map_err(invalid)?;

		Ok(Some(SwapQuote {
			id: format!("swap-{}-{}", request.from_token.symbol, request.to_token.symbol),
			tool: "fixed".to_string(),
			from_token: request.from_token.clone(),
			to_token: request.to_token.clone(),
			from_amount: request.from_amount.clone(),
			to_amount: to_amount.clone(),
			to_amount_min: to_amount,
			from_amount_usd,
			to_amount_usd,
			gas_costs: vec![GasCost {
				amount_usd: self.gas_usd,
				token_symbol: Some("ETH".to_string()),
			}],
			from_address: Some(request.from_address.clone()),
			to_address: Some(request.to_address.clone()),
			transaction_request: None,
		}))
	}
}

/// Completes swaps after reporting one progress snapshot. The first `fail_first` calls fail.
pub struct RecordingSwapService {
	fail_first: usize,
	requests: Mutex<Vec<SwapExecutionRequest>>,
	background_toggles: Mutex<Vec<(String, bool)>>,
}

impl RecordingSwapService {
	pub fn new() -> Self {
		Self::failing_first(0)
	}

	pub fn failing_first(fail_first: usize) -> Self {
		Self {
			fail_first,
			requests: Mutex::new(Vec::new()),
			background_toggles: Mutex::new(Vec::new()),
		}
	}

	pub fn requests(&self) -> Vec<SwapExecutionRequest> {
		self.requests.lock().unwrap().clone()
	}

	pub fn background_toggles(&self) -> Vec<(String, bool)> {
		self.background_toggles.lock().unwrap().clone()
	}
}

#[async_trait]
impl SwapExecutionService for RecordingSwapService {
	async fn execute(
		&self,
		request: SwapExecutionRequest,
		on_update: SwapUpdateHook,
	) -> SwapResult<SwapExecutionUpdate> {
		let attempt = {
			let mut requests = self.requests.lock().unwrap();
			requests.push(request.clone());
			requests.len()
		};

		on_update(SwapExecutionUpdate {
			execution_id: request.execution_id.clone(),
			status: ExecutionStatus::Pending,
			processes: vec![SwapProcessUpdate {
				kind: "TOKEN_ALLOWANCE".to_string(),
				status: ExecutionStatus::Pending,
				message: Some("Approve token spending".to_string()),
				tx_hash: None,
				error_code: None,
			}],
			state: Some(serde_json::json!({ "attempt": attempt })),
		});

		if attempt <= self.fail_first {
			return Err(SwapError::ExecutionFailed {
				code: Some(1011),
				message: "slippage exceeded".to_string(),
			});
		}

		Ok(SwapExecutionUpdate {
			execution_id: request.execution_id,
			status: ExecutionStatus::Done,
			processes: vec![SwapProcessUpdate {
				kind: "SWAP".to_string(),
				status: ExecutionStatus::Done,
				message: Some("Swap completed".to_string()),
				tx_hash: Some(format!("0xswap{}", attempt)),
				error_code: None,
			}],
			state: None,
		})
	}

	async fn update_execution(&self, execution_id: &str, execute_in_background: bool) -> SwapResult<()> {
		self.background_toggles
			.lock()
			.unwrap()
			.push((execution_id.to_string(), execute_in_background));
		Ok(())
	}
}

//! Swap legs: estimates from the swap-routing service and progress from its executor

pub mod errors;
pub mod traits;

pub use errors::{SwapError, SwapResult};
pub use traits::{SwapExecutionService, SwapRouteResolver, SwapUpdateHook};

#[cfg(any(test, feature = "mocks"))]
pub use traits::{MockSwapExecutionService, MockSwapRouteResolver};

use serde::{Deserialize, Serialize};

use crate::execution::ExecutionStatus;
use crate::models::{Token, TokenAmount};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasCost {
	pub amount_usd: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_symbol: Option<String>,
}

/// Swap estimate converting `from_token` into `to_token` on one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
	pub id: String,
	pub tool: String,
	pub from_token: Token,
	pub to_token: Token,
	pub from_amount: TokenAmount,
	pub to_amount: TokenAmount,
	pub to_amount_min: TokenAmount,
	pub from_amount_usd: f64,
	pub to_amount_usd: f64,
	#[serde(default)]
	pub gas_costs: Vec<GasCost>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to_address: Option<String>,
	/// Opaque transaction payload handed back to the swap executor
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction_request: Option<serde_json::Value>,
}

impl SwapQuote {
	pub fn gas_cost_usd(&self) -> f64 {
		self.gas_costs.iter().map(|g| g.amount_usd).sum()
	}

	/// Share of the input value that survives the swap after gas.
	///
	/// Zero when the input has no value or the swap would not return anything.
	pub fn net_output_ratio(&self) -> f64 {
		if self.from_amount_usd <= 0.0 {
			return 0.0;
		}
		let ratio = (self.to_amount_usd - self.gas_cost_usd()) / self.from_amount_usd;
		if ratio.is_finite() && ratio > 0.0 {
			ratio
		} else {
			0.0
		}
	}
}

/// Request for a swap estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteRequest {
	pub chain_id: u64,
	pub from_token: Token,
	pub to_token: Token,
	pub from_amount: TokenAmount,
	pub from_address: String,
	pub to_address: String,
}

/// Instruction for the swap-execution service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapExecutionRequest {
	/// Stable id for this swap; the owning step id
	pub execution_id: String,
	pub quote: SwapQuote,
	/// Progress state last reported by the service, used to resume
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resume_state: Option<serde_json::Value>,
	pub execute_in_background: bool,
}

/// One phase reported by the swap-execution service (allowance, swap, receive, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapProcessUpdate {
	pub kind: String,
	pub status: ExecutionStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tx_hash: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_code: Option<i64>,
}

/// Snapshot of a swap execution as reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapExecutionUpdate {
	pub execution_id: String,
	pub status: ExecutionStatus,
	#[serde(default)]
	pub processes: Vec<SwapProcessUpdate>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub state: Option<serde_json::Value>,
}

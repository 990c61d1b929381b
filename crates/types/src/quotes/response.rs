//! Priced quotes returned by the aggregator

use serde::{Deserialize, Serialize};

use crate::models::{Chain, FiatCurrency, Token, TokenAmount};
use crate::providers::{KycRequirement, PaymentMethod, ProviderMeta, RouteType};
use crate::swaps::SwapQuote;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayDetails {
	pub currency: FiatCurrency,
	pub fiat_amount: f64,
	pub total_fee_fiat: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min_amount_fiat: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_amount_fiat: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveDetails {
	pub to: String,
	pub token: Token,
	pub chain: Chain,
	pub amount_units: TokenAmount,
	pub amount_fiat: f64,
}

/// Discriminant of [`QuoteStep`], used to pick a step executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
	PayViaExternalLink,
	TokenSwap,
}

impl std::fmt::Display for StepKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			StepKind::PayViaExternalLink => f.write_str("pay_via_external_link"),
			StepKind::TokenSwap => f.write_str("token_swap"),
		}
	}
}

/// One unit of work in a quote. Steps run strictly in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuoteStep {
	PayViaExternalLink {
		link: String,
	},
	#[serde(rename_all = "camelCase")]
	TokenSwap {
		swap_quote: SwapQuote,
	},
}

impl QuoteStep {
	pub fn kind(&self) -> StepKind {
		match self {
			QuoteStep::PayViaExternalLink { .. } => StepKind::PayViaExternalLink,
			QuoteStep::TokenSwap { .. } => StepKind::TokenSwap,
		}
	}

	pub fn link(&self) -> Option<&str> {
		match self {
			QuoteStep::PayViaExternalLink { link } => Some(link),
			QuoteStep::TokenSwap { .. } => None,
		}
	}
}

/// Offer from one provider for one (or several equivalent) payment methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodQuote {
	#[serde(rename = "type")]
	pub route_type: RouteType,
	pub pay: PayDetails,
	pub receive: ReceiveDetails,
	pub steps: Vec<QuoteStep>,
	pub payment_methods: Vec<PaymentMethod>,
	pub kyc: Vec<KycRequirement>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country: Option<String>,
}

impl PaymentMethodQuote {
	pub fn payment_link(&self) -> Option<&str> {
		self.steps.iter().find_map(QuoteStep::link)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuote {
	pub provider: ProviderMeta,
	pub payment_methods: Vec<PaymentMethodQuote>,
}

impl ProviderQuote {
	/// Highest receive value across this provider's payment methods
	pub fn best_receive_fiat(&self) -> f64 {
		self.payment_methods
			.iter()
			.map(|q| q.receive.amount_fiat)
			.fold(0.0, f64::max)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QuoteResponse {
	pub quotes: Vec<ProviderQuote>,
}

impl QuoteResponse {
	/// The single best payment-method quote across all providers
	pub fn best_quote(&self) -> Option<(&ProviderMeta, &PaymentMethodQuote)> {
		self.quotes
			.iter()
			.flat_map(|pq| pq.payment_methods.iter().map(move |q| (&pq.provider, q)))
			.fold(None, |best, candidate| match best {
				Some((_, b)) if b.receive.amount_fiat >= candidate.1.receive.amount_fiat => best,
				_ => Some(candidate),
			})
	}
}

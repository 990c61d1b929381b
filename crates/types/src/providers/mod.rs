//! Provider domain: metadata, enumerations shared with quotes, and the adapter contract

pub mod errors;
pub mod traits;

pub use errors::{ProviderError, ProviderResult};
pub use traits::ProviderAdapter;

#[cfg(any(test, feature = "mocks"))]
pub use traits::MockProviderAdapter;

use serde::{Deserialize, Serialize};

use crate::models::Token;

/// Kind of business behind a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
	Cex,
	Onramp,
}

/// Static description of a provider, attached to every quote and route it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMeta {
	pub key: String,
	#[serde(rename = "type")]
	pub provider_type: ProviderType,
	pub name: String,
	pub icon_url: String,
}

impl ProviderMeta {
	pub fn new(
		key: impl Into<String>,
		provider_type: ProviderType,
		name: impl Into<String>,
		icon_url: impl Into<String>,
	) -> Self {
		Self {
			key: key.into(),
			provider_type,
			name: name.into(),
			icon_url: icon_url.into(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
	CreditCard,
	ApplePayCredit,
	GooglePayCredit,
	DebitCard,
	ApplePayDebit,
	GooglePayDebit,
	Wire,
	Pix,
	Sepa,
	Ach,
	Koywe,
}

impl PaymentMethod {
	pub fn all() -> Vec<PaymentMethod> {
		vec![
			PaymentMethod::CreditCard,
			PaymentMethod::ApplePayCredit,
			PaymentMethod::GooglePayCredit,
			PaymentMethod::DebitCard,
			PaymentMethod::ApplePayDebit,
			PaymentMethod::GooglePayDebit,
			PaymentMethod::Wire,
			PaymentMethod::Pix,
			PaymentMethod::Sepa,
			PaymentMethod::Ach,
			PaymentMethod::Koywe,
		]
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycRequirement {
	NoKyc,
	Basic,
	DocumentBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
	#[default]
	Buy,
	Sell,
}

impl std::fmt::Display for RouteType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RouteType::Buy => f.write_str("buy"),
			RouteType::Sell => f.write_str("sell"),
		}
	}
}

/// A token a provider can deliver directly for a given route type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedToken {
	pub provider_key: String,
	pub token: Token,
	pub route_type: RouteType,
}

/// Result of a provider route sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
	pub tokens: crate::storage::ReconcileOutcome,
	pub countries: crate::storage::ReconcileOutcome,
	pub kyc: crate::storage::ReconcileOutcome,
}

impl SyncReport {
	pub fn changed(&self) -> bool {
		!self.tokens.is_empty() || !self.countries.is_empty() || !self.kyc.is_empty()
	}
}

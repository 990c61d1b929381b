//! Token metadata resolved from the catalog

use serde::{Deserialize, Serialize};

use super::amount::{AmountResult, TokenAmount};

/// Chain id and lowercased address identifying a token across the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenKey {
	pub chain_id: u64,
	pub address: String,
}

impl TokenKey {
	pub fn new(chain_id: u64, address: impl AsRef<str>) -> Self {
		Self {
			chain_id,
			address: address.as_ref().to_ascii_lowercase(),
		}
	}
}

impl std::fmt::Display for TokenKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.chain_id, self.address)
	}
}

/// Snapshot of a token as known to the catalog. The core never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
	pub address: String,
	pub chain_id: u64,
	pub decimals: u8,
	pub symbol: String,
	pub name: String,
	pub usd_price: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub market_cap: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub icon_url: Option<String>,
}

impl Token {
	pub fn new(
		chain_id: u64,
		address: impl Into<String>,
		symbol: impl Into<String>,
		decimals: u8,
		usd_price: f64,
	) -> Self {
		let symbol = symbol.into();
		Self {
			address: address.into(),
			chain_id,
			decimals,
			name: symbol.clone(),
			symbol,
			usd_price,
			market_cap: None,
			icon_url: None,
		}
	}

	pub fn key(&self) -> TokenKey {
		TokenKey::new(self.chain_id, &self.address)
	}

	/// Addresses are compared case-insensitively
	pub fn is_same_token(&self, other: &Token) -> bool {
		self.key() == other.key()
	}

	/// Base units of this token worth `fiat` USD
	pub fn units_for_fiat(&self, fiat: f64) -> AmountResult<TokenAmount> {
		TokenAmount::from_fiat(fiat, self.usd_price, self.decimals)
	}

	/// USD value of `units` of this token
	pub fn fiat_for_units(&self, units: &TokenAmount) -> AmountResult<f64> {
		units.to_fiat(self.usd_price, self.decimals)
	}
}

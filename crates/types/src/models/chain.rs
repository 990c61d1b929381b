//! Chains and fiat currencies the aggregator can quote for

use serde::{Deserialize, Serialize};

pub const ZKSYNC_ERA_CHAIN_ID: u64 = 324;
pub const ETHEREUM_CHAIN_ID: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chain {
	pub id: u64,
	pub name: String,
}

impl Chain {
	pub fn new(id: u64, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
		}
	}
}

/// Chains quotes can be requested on
pub fn supported_chains() -> Vec<Chain> {
	vec![
		Chain::new(ZKSYNC_ERA_CHAIN_ID, "ZKsync Era"),
		Chain::new(ETHEREUM_CHAIN_ID, "Ethereum"),
	]
}

pub fn find_supported_chain(chain_id: u64) -> Option<Chain> {
	supported_chains().into_iter().find(|c| c.id == chain_id)
}

pub fn is_chain_supported(chain_id: u64) -> bool {
	find_supported_chain(chain_id).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FiatCurrency {
	#[default]
	Usd,
}

impl FiatCurrency {
	pub fn all() -> Vec<FiatCurrency> {
		vec![FiatCurrency::Usd]
	}

	pub fn code(&self) -> &'static str {
		match self {
			FiatCurrency::Usd => "USD",
		}
	}

	pub fn parse(code: &str) -> Option<FiatCurrency> {
		match code.to_ascii_uppercase().as_str() {
			"USD" => Some(FiatCurrency::Usd),
			_ => None,
		}
	}
}

impl std::fmt::Display for FiatCurrency {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.code())
	}
}

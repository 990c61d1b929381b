//! On-ramp Adapters
//!
//! Provider adapters (Transak, Kado) and the LiFi swap route resolver, together with the HTTP
//! plumbing they share.

pub mod client_cache;
pub mod http;
pub mod kado_adapter;
pub mod lifi_resolver;
pub mod timed_cache;
pub mod transak_adapter;

pub use client_cache::{global_client_cache, AuthConfig, ClientCache, ClientConfig};
pub use kado_adapter::{KadoAdapter, KadoConfig, KADO_KEY};
pub use lifi_resolver::{LifiConfig, LifiSwapResolver, LIFI_API_URL};
pub use timed_cache::TimedCache;
pub use transak_adapter::{TransakAdapter, TransakConfig, TransakCredentials, TRANSAK_KEY};

use onramp_types::{ProviderAdapter, ETHEREUM_CHAIN_ID, ZKSYNC_ERA_CHAIN_ID};
use std::sync::Arc;
use std::time::Duration;

/// How long provider reference data (countries, assets) is reused between syncs
pub const REFERENCE_DATA_TTL: Duration = Duration::from_secs(60 * 60);

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
/// Native ETH on zkSync Era is the L2 base token contract
pub const ZKSYNC_BASE_TOKEN_ADDRESS: &str = "0x000000000000000000000000000000000000800a";

/// Address under which the catalog stores a provider-reported token.
///
/// Providers report native ETH without an address or with the zero address. On zkSync Era the
/// catalog keys it by the base token contract instead.
pub fn canonical_token_address(chain_id: u64, address: Option<&str>) -> String {
	let address = address.map(str::trim).filter(|a| !a.is_empty());
	match (chain_id, address) {
		(ZKSYNC_ERA_CHAIN_ID, None) => ZKSYNC_BASE_TOKEN_ADDRESS.to_string(),
		(ZKSYNC_ERA_CHAIN_ID, Some(a)) if a.eq_ignore_ascii_case(ZERO_ADDRESS) => {
			ZKSYNC_BASE_TOKEN_ADDRESS.to_string()
		},
		(ETHEREUM_CHAIN_ID, None) => ZERO_ADDRESS.to_string(),
		(_, Some(a)) => a.to_ascii_lowercase(),
		(_, None) => ZERO_ADDRESS.to_string(),
	}
}

/// Registered provider adapters, in registration order
#[derive(Clone, Default)]
pub struct ProviderRegistry {
	adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register an adapter. A later registration with the same key replaces the earlier one.
	pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
		let key = adapter.meta().key.clone();
		match self.adapters.iter().position(|a| a.meta().key == key) {
			Some(index) => self.adapters[index] = adapter,
			None => self.adapters.push(adapter),
		}
	}

	pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
		self.register(adapter);
		self
	}

	pub fn get(&self, key: &str) -> Option<Arc<dyn ProviderAdapter>> {
		self.adapters.iter().find(|a| a.meta().key == key).cloned()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ProviderAdapter>> {
		self.adapters.iter()
	}

	pub fn keys(&self) -> Vec<String> {
		self.adapters.iter().map(|a| a.meta().key.clone()).collect()
	}

	pub fn len(&self) -> usize {
		self.adapters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.adapters.is_empty()
	}
}

//! Read-only view of the catalog for clients

use onramp_adapters::ProviderRegistry;
use onramp_types::{
	supported_chains, CatalogStorage, Chain, FiatCurrency, ProviderMeta, RouteType, StorageResult,
	Token,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
	#[serde(flatten)]
	pub provider: ProviderMeta,
	pub supported_tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
	pub tokens: Vec<Token>,
	pub fiat_currencies: Vec<FiatCurrency>,
	pub chains: Vec<Chain>,
	pub providers: Vec<ProviderConfig>,
}

#[derive(Clone)]
pub struct CatalogService {
	catalog: Arc<dyn CatalogStorage>,
	providers: Arc<ProviderRegistry>,
}

impl CatalogService {
	pub fn new(catalog: Arc<dyn CatalogStorage>, providers: Arc<ProviderRegistry>) -> Self {
		Self { catalog, providers }
	}

	/// Tokens, currencies, chains and what each registered provider can deliver
	pub async fn get_config(&self) -> StorageResult<ConfigResponse> {
		let tokens = self.catalog.list_tokens().await?;

		let mut providers = Vec::with_capacity(self.providers.len());
		for adapter in self.providers.iter() {
			let meta = adapter.meta().clone();
			let keys = self
				.catalog
				.supported_token_keys(&meta.key, RouteType::Buy)
				.await?;
			let supported_tokens = tokens
				.iter()
				.filter(|token| keys.contains(&token.key()))
				.cloned()
				.collect();
			providers.push(ProviderConfig {
				provider: meta,
				supported_tokens,
			});
		}

		Ok(ConfigResponse {
			tokens,
			fiat_currencies: FiatCurrency::all(),
			chains: supported_chains(),
			providers,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use onramp_storage::MemoryStore;
	use onramp_types::{MockProviderAdapter, ProviderRouteStorageTrait, ProviderType};

	#[tokio::test]
	async fn test_config_lists_provider_tokens() {
		let usdc = Token::new(324, "0xusdc", "USDC", 6, 1.0);
		let zk = Token::new(324, "0xzk", "ZK", 18, 0.5);
		let store = MemoryStore::with_tokens([usdc.clone(), zk.clone()]);
		store
			.add_supported_tokens("kado", RouteType::Buy, vec![usdc.key()])
			.await
			.unwrap();

		let mut kado = MockProviderAdapter::new();
		kado.expect_meta()
			.return_const(ProviderMeta::new("kado", ProviderType::Onramp, "Kado", ""));
		let service = CatalogService::new(
			Arc::new(store),
			Arc::new(ProviderRegistry::new().with(Arc::new(kado))),
		);

		let config = service.get_config().await.unwrap();
		assert_eq!(config.tokens.len(), 2);
		assert_eq!(config.fiat_currencies, vec![FiatCurrency::Usd]);
		assert_eq!(config.providers.len(), 1);
		assert_eq!(config.providers[0].supported_tokens, vec![usdc]);
		assert!(config.chains.iter().any(|c| c.id == 324));
	}
}

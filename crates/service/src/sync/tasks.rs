//! Concrete sync tasks

use async_trait::async_trait;
use onramp_types::{CatalogStorage, ProviderAdapter, Token};
use std::sync::Arc;
use tracing::{debug, info};

use super::{SyncResult, SyncTask};

/// Reconcile one provider's supported tokens, countries and KYC levels
pub struct ProviderSyncTask {
	adapter: Arc<dyn ProviderAdapter>,
}

impl ProviderSyncTask {
	pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
		Self { adapter }
	}
}

#[async_trait]
impl SyncTask for ProviderSyncTask {
	fn key(&self) -> String {
		format!("provider:{}", self.adapter.meta().key)
	}

	async fn run(&self) -> SyncResult<()> {
		let report = self.adapter.sync_routes().await?;
		if report.changed() {
			info!(
				provider = %self.adapter.meta().key,
				"Provider routes changed: {} token, {} country and {} kyc updates",
				report.tokens.added + report.tokens.removed,
				report.countries.added + report.countries.removed,
				report.kyc.added + report.kyc.removed
			);
		} else {
			debug!(provider = %self.adapter.meta().key, "Provider routes unchanged");
		}
		Ok(())
	}
}

/// Seed the catalog with the configured tokens
pub struct TokenCatalogSyncTask {
	catalog: Arc<dyn CatalogStorage>,
	tokens: Vec<Token>,
}

impl TokenCatalogSyncTask {
	pub fn new(catalog: Arc<dyn CatalogStorage>, tokens: Vec<Token>) -> Self {
		Self { catalog, tokens }
	}
}

#[async_trait]
impl SyncTask for TokenCatalogSyncTask {
	fn key(&self) -> String {
		"catalog:tokens".to_string()
	}

	async fn run(&self) -> SyncResult<()> {
		for token in &self.tokens {
			self.catalog.upsert_token(token.clone()).await?;
		}
		debug!("Upserted {} catalog tokens", self.tokens.len());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use onramp_storage::MemoryStore;
	use onramp_types::{
		MockProviderAdapter, ProviderError, ProviderMeta, ProviderType, SyncReport, TokenKey,
		TokenStorageTrait,
	};

	#[tokio::test]
	async fn test_token_catalog_task_upserts_tokens() {
		let store = Arc::new(MemoryStore::new());
		let task = TokenCatalogSyncTask::new(
			store.clone(),
			vec![Token::new(324, "0xUSDC", "USDC", 6, 1.0)],
		);
		assert_eq!(task.key(), "catalog:tokens");

		task.run().await.unwrap();
		let token = store.get_token(&TokenKey::new(324, "0xusdc")).await.unwrap();
		assert_eq!(token.unwrap().symbol, "USDC");
	}

	#[tokio::test]
	async fn test_provider_task_propagates_errors() {
		let mut adapter = MockProviderAdapter::new();
		adapter
			.expect_meta()
			.return_const(ProviderMeta::new("kado", ProviderType::Onramp, "Kado", ""));
		adapter.expect_sync_routes().times(1).returning(|| {
			Err(ProviderError::Timeout { timeout_ms: 10 })
		});

		let task = ProviderSyncTask::new(Arc::new(adapter));
		assert_eq!(task.key(), "provider:kado");
		assert!(task.run().await.is_err());
	}

	#[tokio::test]
	async fn test_provider_task_succeeds_on_report() {
		let mut adapter = MockProviderAdapter::new();
		adapter
			.expect_meta()
			.return_const(ProviderMeta::new("kado", ProviderType::Onramp, "Kado", ""));
		adapter
			.expect_sync_routes()
			.returning(|| Ok(SyncReport::default()));

		ProviderSyncTask::new(Arc::new(adapter)).run().await.unwrap();
	}
}

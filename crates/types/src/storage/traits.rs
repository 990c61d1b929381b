//! Catalog storage traits
//!
//! The catalog is read-only to quoting and execution. Provider route syncs are the only
//! writers, through the `reconcile_*` helpers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use super::StorageResult;
use crate::models::{Token, TokenKey};
use crate::providers::{KycRequirement, RouteType, SupportedToken};

/// Counts of entries touched by a reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
	pub added: usize,
	pub removed: usize,
}

impl ReconcileOutcome {
	pub fn is_empty(&self) -> bool {
		self.added == 0 && self.removed == 0
	}
}

/// Split `current` against `desired` into (to_add, to_remove), leaving the intersection alone
pub fn diff_sets<T: Ord + Clone>(current: &BTreeSet<T>, desired: &BTreeSet<T>) -> (Vec<T>, Vec<T>) {
	let to_add = desired.difference(current).cloned().collect();
	let to_remove = current.difference(desired).cloned().collect();
	(to_add, to_remove)
}

#[async_trait]
pub trait TokenStorageTrait: Send + Sync {
	async fn upsert_token(&self, token: Token) -> StorageResult<()>;

	async fn get_token(&self, key: &TokenKey) -> StorageResult<Option<Token>>;

	async fn list_tokens(&self) -> StorageResult<Vec<Token>>;
}

#[async_trait]
pub trait ProviderRouteStorageTrait: Send + Sync {
	/// Keys of the tokens a provider delivers directly
	async fn supported_token_keys(
		&self,
		provider_key: &str,
		route_type: RouteType,
	) -> StorageResult<BTreeSet<TokenKey>>;

	/// Every (provider, token) pair on `chain_id`, with tokens resolved from the catalog
	async fn supported_tokens_for_chain(
		&self,
		chain_id: u64,
		route_type: RouteType,
	) -> StorageResult<Vec<SupportedToken>>;

	async fn add_supported_tokens(
		&self,
		provider_key: &str,
		route_type: RouteType,
		keys: Vec<TokenKey>,
	) -> StorageResult<()>;

	async fn remove_supported_tokens(
		&self,
		provider_key: &str,
		route_type: RouteType,
		keys: Vec<TokenKey>,
	) -> StorageResult<()>;

	async fn supported_countries(&self, provider_key: &str) -> StorageResult<BTreeSet<String>>;

	async fn add_supported_countries(&self, provider_key: &str, countries: Vec<String>) -> StorageResult<()>;

	async fn remove_supported_countries(
		&self,
		provider_key: &str,
		countries: Vec<String>,
	) -> StorageResult<()>;

	async fn supported_kyc(&self, provider_key: &str) -> StorageResult<BTreeSet<KycRequirement>>;

	async fn add_supported_kyc(&self, provider_key: &str, levels: Vec<KycRequirement>) -> StorageResult<()>;

	async fn remove_supported_kyc(
		&self,
		provider_key: &str,
		levels: Vec<KycRequirement>,
	) -> StorageResult<()>;

	async fn reconcile_supported_tokens(
		&self,
		provider_key: &str,
		route_type: RouteType,
		desired: BTreeSet<TokenKey>,
	) -> StorageResult<ReconcileOutcome> {
		let current = self.supported_token_keys(provider_key, route_type).await?;
		let (to_add, to_remove) = diff_sets(&current, &desired);
		let outcome = ReconcileOutcome {
			added: to_add.len(),
			removed: to_remove.len(),
		};
		if !to_remove.is_empty() {
			self.remove_supported_tokens(provider_key, route_type, to_remove)
				.await?;
		}
		if !to_add.is_empty() {
			self.add_supported_tokens(provider_key, route_type, to_add)
				.await?;
		}
		Ok(outcome)
	}

	async fn reconcile_supported_countries(
		&self,
		provider_key: &str,
		desired: BTreeSet<String>,
	) -> StorageResult<ReconcileOutcome> {
		let current = self.supported_countries(provider_key).await?;
		let (to_add, to_remove) = diff_sets(&current, &desired);
		let outcome = ReconcileOutcome {
			added: to_add.len(),
			removed: to_remove.len(),
		};
		if !to_remove.is_empty() {
			self.remove_supported_countries(provider_key, to_remove).await?;
		}
		if !to_add.is_empty() {
			self.add_supported_countries(provider_key, to_add).await?;
		}
		Ok(outcome)
	}

	async fn reconcile_supported_kyc(
		&self,
		provider_key: &str,
		desired: BTreeSet<KycRequirement>,
	) -> StorageResult<ReconcileOutcome> {
		let current = self.supported_kyc(provider_key).await?;
		let (to_add, to_remove) = diff_sets(&current, &desired);
		let outcome = ReconcileOutcome {
			added: to_add.len(),
			removed: to_remove.len(),
		};
		if !to_remove.is_empty() {
			self.remove_supported_kyc(provider_key, to_remove).await?;
		}
		if !to_add.is_empty() {
			self.add_supported_kyc(provider_key, to_add).await?;
		}
		Ok(outcome)
	}
}

/// Shared last-synced timestamps used by the sync workers to skip fresh cycles
#[async_trait]
pub trait SyncStateStorageTrait: Send + Sync {
	async fn last_synced(&self, key: &str) -> StorageResult<Option<DateTime<Utc>>>;

	async fn mark_synced(&self, key: &str, at: DateTime<Utc>) -> StorageResult<()>;
}

/// Everything the aggregator needs from its catalog
#[async_trait]
pub trait CatalogStorage:
	TokenStorageTrait + ProviderRouteStorageTrait + SyncStateStorageTrait
{
	async fn health_check(&self) -> StorageResult<bool> {
		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_diff_sets_keeps_intersection() {
		let current: BTreeSet<&str> = ["US", "DE", "FR"].into_iter().collect();
		let desired: BTreeSet<&str> = ["US", "FR", "GB"].into_iter().collect();
		let (to_add, to_remove) = diff_sets(&current, &desired);
		assert_eq!(to_add, vec!["GB"]);
		assert_eq!(to_remove, vec!["DE"]);
	}
}

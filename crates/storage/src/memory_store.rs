//! In-memory catalog using DashMap

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use onramp_types::{KycRequirement, RouteType, SupportedToken, Token, TokenKey};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::traits::{ProviderRouteStorage, Storage, StorageResult, SyncStateStorage, TokenStorage};

/// In-memory catalog of tokens, provider routes and sync timestamps
#[derive(Clone, Default)]
pub struct MemoryStore {
	pub tokens: Arc<DashMap<TokenKey, Token>>,
	/// Token keys per (provider, route type)
	pub supported_tokens: Arc<DashMap<(String, RouteType), BTreeSet<TokenKey>>>,
	pub supported_countries: Arc<DashMap<String, BTreeSet<String>>>,
	pub supported_kyc: Arc<DashMap<String, BTreeSet<KycRequirement>>>,
	pub sync_state: Arc<DashMap<String, DateTime<Utc>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a store pre-populated with `tokens`
	pub fn with_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
		let store = Self::new();
		for token in tokens {
			store.tokens.insert(token.key(), token);
		}
		store
	}
}

#[async_trait]
impl TokenStorage for MemoryStore {
	async fn upsert_token(&self, token: Token) -> StorageResult<()> {
		self.tokens.insert(token.key(), token);
		Ok(())
	}

	async fn get_token(&self, key: &TokenKey) -> StorageResult<Option<Token>> {
		Ok(self.tokens.get(key).map(|t| t.clone()))
	}

	async fn list_tokens(&self) -> StorageResult<Vec<Token>> {
		let mut tokens: Vec<Token> = self.tokens.iter().map(|t| t.value().clone()).collect();
		tokens.sort_by(|a, b| a.key().cmp(&b.key()));
		Ok(tokens)
	}
}

#[async_trait]
impl ProviderRouteStorage for MemoryStore {
	async fn supported_token_keys(
		&self,
		provider_key: &str,
		route_type: RouteType,
	) -> StorageResult<BTreeSet<TokenKey>> {
		Ok(self
			.supported_tokens
			.get(&(provider_key.to_string(), route_type))
			.map(|keys| keys.clone())
			.unwrap_or_default())
	}

	async fn supported_tokens_for_chain(
		&self,
		chain_id: u64,
		route_type: RouteType,
	) -> StorageResult<Vec<SupportedToken>> {
		let mut supported = Vec::new();
		for entry in self.supported_tokens.iter() {
			let (provider_key, entry_route_type) = entry.key();
			if *entry_route_type != route_type {
				continue;
			}
			for key in entry.value().iter().filter(|k| k.chain_id == chain_id) {
				match self.tokens.get(key) {
					Some(token) => supported.push(SupportedToken {
						provider_key: provider_key.clone(),
						token: token.clone(),
						route_type,
					}),
					None => debug!("Supported token {} of {} missing from catalog", key, provider_key),
				}
			}
		}
		supported.sort_by(|a, b| {
			(&a.provider_key, a.token.key()).cmp(&(&b.provider_key, b.token.key()))
		});
		Ok(supported)
	}

	async fn add_supported_tokens(
		&self,
		provider_key: &str,
		route_type: RouteType,
		keys: Vec<TokenKey>,
	) -> StorageResult<()> {
		self.supported_tokens
			.entry((provider_key.to_string(), route_type))
			.or_default()
			.extend(keys);
		Ok(())
	}

	async fn remove_supported_tokens(
		&self,
		provider_key: &str,
		route_type: RouteType,
		keys: Vec<TokenKey>,
	) -> StorageResult<()> {
		if let Some(mut current) = self
			.supported_tokens
			.get_mut(&(provider_key.to_string(), route_type))
		{
			for key in &keys {
				current.remove(key);
			}
		}
		Ok(())
	}

	async fn supported_countries(&self, provider_key: &str) -> StorageResult<BTreeSet<String>> {
		Ok(self
			.supported_countries
			.get(provider_key)
			.map(|c| c.clone())
			.unwrap_or_default())
	}

	async fn add_supported_countries(&self, provider_key: &str, countries: Vec<String>) -> StorageResult<()> {
		self.supported_countries
			.entry(provider_key.to_string())
			.or_default()
			.extend(countries);
		Ok(())
	}

	async fn remove_supported_countries(
		&self,
		provider_key: &str,
		countries: Vec<String>,
	) -> StorageResult<()> {
		if let Some(mut current) = self.supported_countries.get_mut(provider_key) {
			for country in &countries {
				current.remove(country);
			}
		}
		Ok(())
	}

	async fn supported_kyc(&self, provider_key: &str) -> StorageResult<BTreeSet<KycRequirement>> {
		Ok(self
			.supported_kyc
			.get(provider_key)
			.map(|k| k.clone())
			.unwrap_or_default())
	}

	async fn add_supported_kyc(&self, provider_key: &str, levels: Vec<KycRequirement>) -> StorageResult<()> {
		self.supported_kyc
			.entry(provider_key.to_string())
			.or_default()
			.extend(levels);
		Ok(())
	}

	async fn remove_supported_kyc(
		&self,
		provider_key: &str,
		levels: Vec<KycRequirement>,
	) -> StorageResult<()> {
		if let Some(mut current) = self.supported_kyc.get_mut(provider_key) {
			for level in &levels {
				current.remove(level);
			}
		}
		Ok(())
	}
}

#[async_trait]
impl SyncStateStorage for MemoryStore {
	async fn last_synced(&self, key: &str) -> StorageResult<Option<DateTime<Utc>>> {
		Ok(self.sync_state.get(key).map(|at| *at))
	}

	async fn mark_synced(&self, key: &str, at: DateTime<Utc>) -> StorageResult<()> {
		self.sync_state.insert(key.to_string(), at);
		Ok(())
	}
}

#[async_trait]
impl Storage for MemoryStore {}

//! HTTP client cache for provider and swap-routing clients
//!
//! Provides per-provider client instances with connection pooling, keep-alive and a request
//! timeout baked in.

use dashmap::DashMap;
use onramp_types::SecretString;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for creating HTTP clients
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientConfig {
	pub base_url: String,
	/// Provider key for cache differentiation
	pub provider_key: String,
	pub request_timeout_ms: u64,
	pub max_idle_per_host: usize,
	pub keep_alive_timeout_ms: u64,
	/// Default headers (auth etc.)
	pub headers: Vec<(String, String)>,
}

impl ClientConfig {
	pub fn new(provider_key: &str, base_url: &str, request_timeout_ms: u64) -> Self {
		Self {
			base_url: base_url.to_string(),
			provider_key: provider_key.to_string(),
			request_timeout_ms,
			max_idle_per_host: 10,
			keep_alive_timeout_ms: 90_000,
			headers: vec![
				("User-Agent".to_string(), "Onramp-Aggregator/1.0".to_string()),
				("Accept".to_string(), "application/json".to_string()),
			],
		}
	}
}

/// Authentication baked into a client's default headers
#[derive(Debug, Clone)]
pub enum AuthConfig {
	None,
	ApiKey { header: String, key: SecretString },
}

impl AuthConfig {
	pub fn api_key(header: &str, key: Option<&SecretString>) -> Self {
		match key {
			Some(key) => Self::ApiKey {
				header: header.to_string(),
				key: key.clone(),
			},
			None => Self::None,
		}
	}
}

/// Cached client with creation timestamp for TTL management
#[derive(Debug, Clone)]
struct CachedClient {
	client: Arc<Client>,
	created_at: Instant,
}

impl CachedClient {
	fn new(client: Client) -> Self {
		Self {
			client: Arc::new(client),
			created_at: Instant::now(),
		}
	}

	fn is_expired(&self, ttl: Duration) -> bool {
		self.created_at.elapsed() > ttl
	}
}

/// Thread-safe cache of HTTP clients keyed by their configuration, with TTL
#[derive(Clone, Debug)]
pub struct ClientCache {
	clients: Arc<DashMap<ClientConfig, CachedClient>>,
	ttl: Duration,
}

impl ClientCache {
	/// Create a new client cache with default 30-minute TTL
	pub fn new() -> Self {
		Self::with_ttl(Duration::from_secs(30 * 60))
	}

	pub fn with_ttl(ttl: Duration) -> Self {
		Self {
			clients: Arc::new(DashMap::new()),
			ttl,
		}
	}

	/// Get or create a client for the given configuration
	pub fn get_client(&self, config: &ClientConfig) -> Result<Arc<Client>, reqwest::Error> {
		self.clients.remove_if(config, |_, cached_client| {
			let is_expired = cached_client.is_expired(self.ttl);
			if is_expired {
				warn!(
					"Client cache expired for {} (age: {:?}), will create new client",
					config.base_url,
					cached_client.created_at.elapsed()
				);
			}
			is_expired
		});

		if let Some(cached_client) = self.clients.get(config) {
			debug!(
				"Reusing cached client for {} (age: {:?})",
				config.base_url,
				cached_client.created_at.elapsed()
			);
			return Ok(cached_client.client.clone());
		}

		debug!("Creating new client for {}", config.base_url);
		let cached_client = CachedClient::new(Self::create_client(config)?);

		use dashmap::mapref::entry::Entry;
		match self.clients.entry(config.clone()) {
			Entry::Occupied(entry) => {
				// Lost the race, use the winner's client
				Ok(entry.get().client.clone())
			},
			Entry::Vacant(entry) => {
				let client = cached_client.client.clone();
				entry.insert(cached_client);
				Ok(client)
			},
		}
	}

	pub fn get_client_with_auth(
		&self,
		config: &ClientConfig,
		auth_config: &AuthConfig,
	) -> Result<Arc<Client>, reqwest::Error> {
		match auth_config {
			AuthConfig::None => self.get_client(config),
			AuthConfig::ApiKey { header, key } => {
				let mut config = config.clone();
				config
					.headers
					.push((header.clone(), key.expose_secret().to_string()));
				self.get_client(&config)
			},
		}
	}

	fn create_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
		let mut header_map = reqwest::header::HeaderMap::new();
		for (key, value) in &config.headers {
			if let (Ok(header_name), Ok(header_value)) = (
				reqwest::header::HeaderName::from_bytes(key.as_bytes()),
				reqwest::header::HeaderValue::from_str(value),
			) {
				header_map.insert(header_name, header_value);
			}
		}

		ClientBuilder::new()
			.timeout(Duration::from_millis(config.request_timeout_ms))
			.pool_max_idle_per_host(config.max_idle_per_host)
			.pool_idle_timeout(Duration::from_millis(config.keep_alive_timeout_ms))
			.tcp_keepalive(Duration::from_secs(60))
			.default_headers(header_map)
			.build()
	}

	/// Remove all expired clients from the cache
	pub fn cleanup_expired(&self) -> usize {
		let mut removed_count = 0;
		self.clients.retain(|_, cached_client| {
			let is_expired = cached_client.is_expired(self.ttl);
			if is_expired {
				removed_count += 1;
			}
			!is_expired
		});

		if removed_count > 0 {
			debug!("Cleaned up {} expired clients from cache", removed_count);
		}
		removed_count
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Shared process-wide cache for adapters
	pub fn for_adapter() -> Self {
		global_client_cache().clone()
	}
}

impl Default for ClientCache {
	fn default() -> Self {
		Self::new()
	}
}

lazy_static::lazy_static! {
	static ref GLOBAL_CLIENT_CACHE: ClientCache = ClientCache::new();
}

pub fn global_client_cache() -> &'static ClientCache {
	&GLOBAL_CLIENT_CACHE
}

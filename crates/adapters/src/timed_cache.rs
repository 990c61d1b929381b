//! TTL memoization for provider reference data and swap estimates

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CachedValue<V> {
	value: V,
	expires_at: Instant,
}

/// Keyed memo with a fixed default TTL.
///
/// Successful results are kept until they expire. A failed fetch clears the key so the next
/// caller retries instead of waiting out the TTL.
#[derive(Debug, Clone)]
pub struct TimedCache<K, V>
where
	K: Eq + Hash,
{
	entries: Arc<DashMap<K, CachedValue<V>>>,
	ttl: Duration,
}

impl<K, V> TimedCache<K, V>
where
	K: Eq + Hash + Clone,
	V: Clone,
{
	pub fn new(ttl: Duration) -> Self {
		Self {
			entries: Arc::new(DashMap::new()),
			ttl,
		}
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Fresh value for `key`, if any. Expired entries are dropped on the way.
	pub fn get(&self, key: &K) -> Option<V> {
		let now = Instant::now();
		self.entries.remove_if(key, |_, cached| cached.expires_at <= now);
		self.entries.get(key).map(|cached| cached.value.clone())
	}

	pub fn insert(&self, key: K, value: V) {
		self.insert_with_ttl(key, value, self.ttl);
	}

	/// Insert with a per-entry TTL, e.g. an access token with a server-given expiry.
	///
	/// Expired entries under other keys are swept first, so keys that are never read again
	/// do not pile up.
	pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
		let now = Instant::now();
		self.entries.retain(|_, cached| cached.expires_at > now);
		self.entries.insert(
			key,
			CachedValue {
				value,
				expires_at: now + ttl,
			},
		);
	}

	/// Number of stored entries, expired ones not swept yet included
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn invalidate(&self, key: &K) {
		self.entries.remove(key);
	}

	pub fn clear(&self) {
		self.entries.clear();
	}

	/// Return the memoized value or run `fetch` and memoize its success
	pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<V, E>>,
	{
		if let Some(value) = self.get(&key) {
			return Ok(value);
		}

		match fetch().await {
			Ok(value) => {
				self.insert(key, value.clone());
				Ok(value)
			},
			Err(e) => {
				self.invalidate(&key);
				Err(e)
			},
		}
	}
}

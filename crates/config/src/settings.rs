//! Configuration settings structures

use crate::{configurable_value::ConfigurableValue, ConfigurableValueError};
use onramp_types::{is_chain_supported, SecretString, Token};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
	pub logging: LoggingSettings,
	pub timeouts: TimeoutSettings,
	pub aggregation: AggregationSettings,
	pub sync: SyncSettings,
	pub execution: ExecutionConfig,
	pub providers: ProvidersSettings,
	pub swap: SwapSettings,
	/// Token metadata seeded into the catalog at startup
	pub tokens: Vec<TokenConfig>,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
	pub structured: bool,
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

/// Timeout configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutSettings {
	/// Request timeout for provider and swap HTTP clients
	pub request_ms: u64,
}

/// Quote aggregation configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AggregationSettings {
	/// Budget for a single provider's quote call; exceeding it drops the provider
	pub per_provider_timeout_ms: u64,
	/// Swap notional used to probe swap routes in dev mode
	pub dev_swap_notional_usd: f64,
	pub swap_quote_ttl_secs: u64,
}

/// Provider route sync configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SyncSettings {
	pub resync_delay_secs: u64,
	pub on_fail_retry_secs: u64,
	/// How long quote requests wait for the first sync cycle
	pub readiness_timeout_ms: u64,
}

/// Route execution configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutionConfig {
	pub status_poll_interval_ms: u64,
	/// Optional budget for a single order-status polling loop. Unset means poll until stopped.
	pub status_poll_timeout_ms: Option<u64>,
	/// Use provider sandboxes for order lookups during execution
	pub dev: bool,
}

/// Provider credentials and toggles
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersSettings {
	pub transak: TransakSettings,
	pub kado: KadoSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TransakSettings {
	pub enabled: bool,
	pub api_key: Option<ConfigurableValue>,
	pub secret_key: Option<ConfigurableValue>,
	pub staging_api_key: Option<ConfigurableValue>,
	pub staging_secret_key: Option<ConfigurableValue>,
	/// Override for the partner API base url
	pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct KadoSettings {
	pub enabled: bool,
	pub api_key: Option<ConfigurableValue>,
	/// Override for the public API base url
	pub base_url: Option<String>,
}

/// Swap routing service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SwapSettings {
	pub enabled: bool,
	pub base_url: String,
	pub integrator: String,
	pub api_key: Option<ConfigurableValue>,
	/// Answer dev-mode swap probes with a fixed estimate instead of calling the service
	pub dev_fixed_quote: bool,
}

/// Catalog token entry
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenConfig {
	pub chain_id: u64,
	pub address: String,
	pub symbol: String,
	pub name: Option<String>,
	pub decimals: u8,
	pub usd_price: f64,
	pub market_cap: Option<f64>,
	pub icon_url: Option<String>,
}

impl From<TokenConfig> for Token {
	fn from(config: TokenConfig) -> Self {
		let mut token = Token::new(
			config.chain_id,
			config.address,
			config.symbol,
			config.decimals,
			config.usd_price,
		);
		if let Some(name) = config.name {
			token.name = name;
		}
		token.market_cap = config.market_cap;
		token.icon_url = config.icon_url;
		token
	}
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
	#[error("{field} must be greater than zero")]
	ZeroDuration { field: &'static str },
	#[error("aggregation.dev_swap_notional_usd must be a positive number")]
	InvalidDevNotional,
	#[error("Token {symbol} is on unsupported chain {chain_id}")]
	UnsupportedTokenChain { symbol: String, chain_id: u64 },
	#[error("Token {symbol} has an invalid usd_price {price}")]
	InvalidTokenPrice { symbol: String, price: f64 },
	#[error("Token {symbol} has too many decimals ({decimals})")]
	InvalidTokenDecimals { symbol: String, decimals: u8 },
	#[error("Provider {provider} is enabled but {field} is not configured")]
	MissingCredential {
		provider: &'static str,
		field: &'static str,
	},
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
			structured: false,
		}
	}
}

impl Default for TimeoutSettings {
	fn default() -> Self {
		Self { request_ms: 10_000 }
	}
}

impl Default for AggregationSettings {
	fn default() -> Self {
		Self {
			per_provider_timeout_ms: 15_000,
			dev_swap_notional_usd: 0.25,
			swap_quote_ttl_secs: 60,
		}
	}
}

impl Default for SyncSettings {
	fn default() -> Self {
		Self {
			resync_delay_secs: 3_600,
			on_fail_retry_secs: 30,
			readiness_timeout_ms: 120_000,
		}
	}
}

impl Default for ExecutionConfig {
	fn default() -> Self {
		Self {
			status_poll_interval_ms: 3_000,
			status_poll_timeout_ms: None,
			dev: false,
		}
	}
}

impl Default for SwapSettings {
	fn default() -> Self {
		Self {
			enabled: true,
			base_url: "https://li.quest/v1".to_string(),
			integrator: "onramp-aggregator".to_string(),
			api_key: None,
			dev_fixed_quote: false,
		}
	}
}

impl Settings {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.timeouts.request_ms)
	}

	pub fn per_provider_timeout(&self) -> Duration {
		Duration::from_millis(self.aggregation.per_provider_timeout_ms)
	}

	pub fn readiness_timeout(&self) -> Duration {
		Duration::from_millis(self.sync.readiness_timeout_ms)
	}

	/// Tokens to seed into the catalog
	pub fn catalog_tokens(&self) -> Vec<Token> {
		self.tokens.iter().cloned().map(Token::from).collect()
	}

	/// Resolve an optional secret, treating an absent value as unset
	pub fn resolve_secret(
		value: Option<&ConfigurableValue>,
	) -> Result<Option<SecretString>, ConfigurableValueError> {
		value.map(|v| v.resolve_for_secret()).transpose()
	}

	/// Check cross-field constraints that serde can't express
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		let durations = [
			("timeouts.request_ms", self.timeouts.request_ms),
			(
				"aggregation.per_provider_timeout_ms",
				self.aggregation.per_provider_timeout_ms,
			),
			("sync.resync_delay_secs", self.sync.resync_delay_secs),
			("sync.on_fail_retry_secs", self.sync.on_fail_retry_secs),
			(
				"execution.status_poll_interval_ms",
				self.execution.status_poll_interval_ms,
			),
		];
		if let Some((field, _)) = durations.iter().find(|(_, value)| *value == 0) {
			return Err(ConfigValidationError::ZeroDuration { field });
		}
		if self.execution.status_poll_timeout_ms == Some(0) {
			return Err(ConfigValidationError::ZeroDuration {
				field: "execution.status_poll_timeout_ms",
			});
		}
		if !(self.aggregation.dev_swap_notional_usd.is_finite()
			&& self.aggregation.dev_swap_notional_usd > 0.0)
		{
			return Err(ConfigValidationError::InvalidDevNotional);
		}

		for token in &self.tokens {
			if !is_chain_supported(token.chain_id) {
				return Err(ConfigValidationError::UnsupportedTokenChain {
					symbol: token.symbol.clone(),
					chain_id: token.chain_id,
				});
			}
			if !token.usd_price.is_finite() || token.usd_price < 0.0 {
				return Err(ConfigValidationError::InvalidTokenPrice {
					symbol: token.symbol.clone(),
					price: token.usd_price,
				});
			}
			if token.decimals > 28 {
				return Err(ConfigValidationError::InvalidTokenDecimals {
					symbol: token.symbol.clone(),
					decimals: token.decimals,
				});
			}
		}

		if self.providers.transak.enabled && self.providers.transak.api_key.is_none() {
			return Err(ConfigValidationError::MissingCredential {
				provider: "transak",
				field: "api_key",
			});
		}
		if self.providers.kado.enabled && self.providers.kado.api_key.is_none() {
			return Err(ConfigValidationError::MissingCredential {
				provider: "kado",
				field: "api_key",
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn usdc() -> TokenConfig {
		TokenConfig {
			chain_id: 324,
			address: "0x1d17CBcF0D6D143135aE902365D2E5e2A16538D4".to_string(),
			symbol: "USDC".to_string(),
			name: Some("USD Coin".to_string()),
			decimals: 6,
			usd_price: 1.0,
			market_cap: None,
			icon_url: None,
		}
	}

	#[test]
	fn test_defaults_are_valid() {
		let settings = Settings::default();
		assert!(settings.validate().is_ok());
		assert_eq!(settings.execution.status_poll_interval_ms, 3_000);
		assert!(settings.execution.status_poll_timeout_ms.is_none());
		assert_eq!(settings.aggregation.dev_swap_notional_usd, 0.25);
		assert_eq!(settings.aggregation.swap_quote_ttl_secs, 60);
	}

	#[test]
	fn test_partial_json_fills_defaults() {
		let json = r#"{
			"execution": { "status_poll_timeout_ms": 600000 },
			"providers": { "kado": { "enabled": true, "api_key": { "type": "env", "value": "KADO_API_KEY" } } }
		}"#;
		let settings: Settings = serde_json::from_str(json).unwrap();
		assert_eq!(settings.execution.status_poll_timeout_ms, Some(600_000));
		assert_eq!(settings.execution.status_poll_interval_ms, 3_000);
		assert!(settings.providers.kado.enabled);
		assert!(!settings.providers.transak.enabled);
		assert_eq!(settings.logging.format, LogFormat::Pretty);
		assert!(settings.validate().is_ok());
	}

	#[test]
	fn test_enabled_provider_requires_key() {
		let mut settings = Settings::default();
		settings.providers.transak.enabled = true;
		assert_eq!(
			settings.validate(),
			Err(ConfigValidationError::MissingCredential {
				provider: "transak",
				field: "api_key",
			})
		);
	}

	#[test]
	fn test_token_validation() {
		let mut settings = Settings::default();
		let mut token = usdc();
		token.chain_id = 10;
		settings.tokens = vec![token];
		assert!(matches!(
			settings.validate(),
			Err(ConfigValidationError::UnsupportedTokenChain { chain_id: 10, .. })
		));

		let mut token = usdc();
		token.usd_price = f64::NAN;
		settings.tokens = vec![token];
		assert!(matches!(
			settings.validate(),
			Err(ConfigValidationError::InvalidTokenPrice { .. })
		));
	}

	#[test]
	fn test_zero_poll_interval_rejected() {
		let mut settings = Settings::default();
		settings.execution.status_poll_interval_ms = 0;
		assert_eq!(
			settings.validate(),
			Err(ConfigValidationError::ZeroDuration {
				field: "execution.status_poll_interval_ms"
			})
		);
	}

	#[test]
	fn test_catalog_tokens() {
		let settings = Settings {
			tokens: vec![usdc()],
			..Default::default()
		};
		let tokens = settings.catalog_tokens();
		assert_eq!(tokens.len(), 1);
		assert_eq!(tokens[0].name, "USD Coin");
		assert_eq!(tokens[0].decimals, 6);
		assert_eq!(
			tokens[0].key().address,
			"0x1d17cbcf0d6d143135ae902365d2e5e2a16538d4"
		);
	}
}

//! LiFi swap route resolver
//!
//! Estimates same-chain swaps through the LiFi `/quote` endpoint. Estimates are memoized per
//! (chain, from token, to token, amount) for a short TTL since the aggregator asks for the same
//! pairs on every quote request.

use async_trait::async_trait;
use onramp_types::{
	is_chain_supported, GasCost, SecretString, SwapError, SwapQuote, SwapQuoteRequest,
	SwapResult, SwapRouteResolver, TokenAmount,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::client_cache::{AuthConfig, ClientCache, ClientConfig};
use crate::timed_cache::TimedCache;

pub const LIFI_KEY: &str = "lifi";
pub const LIFI_API_URL: &str = "https://li.quest/v1";
const API_KEY_HEADER: &str = "x-lifi-api-key";

#[derive(Debug, Clone)]
pub struct LifiConfig {
	pub base_url: String,
	pub integrator: String,
	pub api_key: Option<SecretString>,
	/// Skip the network and answer with a price-based estimate
	pub dev_fixed_quote: bool,
	pub quote_ttl: Duration,
	pub request_timeout_ms: u64,
}

impl Default for LifiConfig {
	fn default() -> Self {
		Self {
			base_url: LIFI_API_URL.to_string(),
			integrator: "onramp-aggregator".to_string(),
			api_key: None,
			dev_fixed_quote: false,
			quote_ttl: Duration::from_secs(60),
			request_timeout_ms: 10_000,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QuoteKey {
	chain_id: u64,
	from_token: String,
	to_token: String,
	from_amount: TokenAmount,
}

impl From<&SwapQuoteRequest> for QuoteKey {
	fn from(request: &SwapQuoteRequest) -> Self {
		Self {
			chain_id: request.chain_id,
			from_token: request.from_token.key().address,
			to_token: request.to_token.key().address,
			from_amount: request.from_amount.clone(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiQuote {
	id: String,
	tool: String,
	estimate: LifiEstimate,
	#[serde(default)]
	action: Option<LifiAction>,
	#[serde(default)]
	transaction_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiAction {
	#[serde(default)]
	from_address: Option<String>,
	#[serde(default)]
	to_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiEstimate {
	from_amount: TokenAmount,
	to_amount: TokenAmount,
	to_amount_min: TokenAmount,
	#[serde(rename = "fromAmountUSD", default)]
	from_amount_usd: Option<String>,
	#[serde(rename = "toAmountUSD", default)]
	to_amount_usd: Option<String>,
	#[serde(default)]
	gas_costs: Vec<LifiGasCost>,
}

#[derive(Debug, Deserialize)]
struct LifiGasCost {
	#[serde(rename = "amountUSD", default)]
	amount_usd: Option<String>,
	#[serde(default)]
	token: Option<LifiGasToken>,
}

#[derive(Debug, Deserialize)]
struct LifiGasToken {
	symbol: String,
}

/// LiFi reports USD values as decimal strings
fn parse_usd(value: Option<&str>, field: &str) -> SwapResult<f64> {
	let Some(value) = value else {
		return Ok(0.0);
	};
	value
		.parse::<f64>()
		.ok()
		.filter(|v| v.is_finite())
		.ok_or_else(|| SwapError::InvalidResponse {
			reason: format!("{} is not a number: '{}'", field, value),
		})
}

pub struct LifiSwapResolver {
	config: LifiConfig,
	client_cache: ClientCache,
	quotes: TimedCache<QuoteKey, Option<SwapQuote>>,
}

impl LifiSwapResolver {
	pub fn new(config: LifiConfig) -> Self {
		Self::with_cache(config, ClientCache::for_adapter())
	}

	pub fn with_cache(config: LifiConfig, client_cache: ClientCache) -> Self {
		let quotes = TimedCache::new(config.quote_ttl);
		Self {
			config,
			client_cache,
			quotes,
		}
	}

	fn client(&self) -> SwapResult<Arc<Client>> {
		let client_config =
			ClientConfig::new(LIFI_KEY, &self.config.base_url, self.config.request_timeout_ms);
		let auth = AuthConfig::api_key(API_KEY_HEADER, self.config.api_key.as_ref());
		Ok(self.client_cache.get_client_with_auth(&client_config, &auth)?)
	}

	fn quote_url(&self) -> SwapResult<Url> {
		let mut base = Url::parse(&self.config.base_url).map_err(|e| SwapError::InvalidResponse {
			reason: format!("Invalid LiFi base URL '{}': {}", self.config.base_url, e),
		})?;
		if !base.path().ends_with('/') {
			base.set_path(&format!("{}/", base.path()));
		}
		base.join("quote").map_err(|e| SwapError::InvalidResponse {
			reason: e.to_string(),
		})
	}

	async fn fetch_quote(&self, request: &SwapQuoteRequest) -> SwapResult<Option<SwapQuote>> {
		if self.config.dev_fixed_quote {
			return fixed_quote(request).map(Some);
		}

		let chain = request.chain_id.to_string();
		let query = [
			("fromChain", chain.as_str()),
			("toChain", chain.as_str()),
			("fromToken", request.from_token.address.as_str()),
			("toToken", request.to_token.address.as_str()),
			("fromAddress", request.from_address.as_str()),
			("toAddress", request.to_address.as_str()),
			("fromAmount", request.from_amount.as_str()),
			("integrator", self.config.integrator.as_str()),
		];

		let response = self
			.client()?
			.get(self.quote_url()?)
			.query(&query)
			.send()
			.await?;
		let status = response.status();
		let body = response.text().await?;

		// LiFi answers 404 when it has no route for the pair
		if status == StatusCode::NOT_FOUND {
			debug!(
				"No LiFi route for {} -> {} on chain {}",
				request.from_token.symbol, request.to_token.symbol, request.chain_id
			);
			return Ok(None);
		}
		if !status.is_success() {
			return Err(SwapError::HttpStatus {
				status_code: status.as_u16(),
				reason: body,
			});
		}

		let quote: LifiQuote = serde_json::from_str(&body).map_err(|e| SwapError::InvalidResponse {
			reason: format!("Failed to parse LiFi quote: {}", e),
		})?;
		into_swap_quote(request, quote).map(Some)
	}
}

fn into_swap_quote(request: &SwapQuoteRequest, quote: LifiQuote) -> SwapResult<SwapQuote> {
	let estimate = quote.estimate;
	let gas_costs = estimate
		.gas_costs
		.iter()
		.map(|gas| {
			Ok(GasCost {
				amount_usd: parse_usd(gas.amount_usd.as_deref(), "gasCosts.amountUSD")?,
				token_symbol: gas.token.as_ref().map(|t| t.symbol.clone()),
			})
		})
		.collect::<SwapResult<Vec<_>>>()?;
	let action = quote.action;

	Ok(SwapQuote {
		id: quote.id,
		tool: quote.tool,
		from_token: request.from_token.clone(),
		to_token: request.to_token.clone(),
		from_amount_usd: parse_usd(estimate.from_amount_usd.as_deref(), "fromAmountUSD")?,
		to_amount_usd: parse_usd(estimate.to_amount_usd.as_deref(), "toAmountUSD")?,
		from_amount: estimate.from_amount,
		to_amount: estimate.to_amount,
		to_amount_min: estimate.to_amount_min,
		gas_costs,
		from_address: action
			.as_ref()
			.and_then(|a| a.from_address.clone())
			.or_else(|| Some(request.from_address.clone())),
		to_address: action
			.and_then(|a| a.to_address)
			.or_else(|| Some(request.to_address.clone())),
		transaction_request: quote.transaction_request,
	})
}

/// Price-based estimate with no gas, used in development
fn fixed_quote(request: &SwapQuoteRequest) -> SwapResult<SwapQuote> {
	let invalid = |e: onramp_types::AmountError| SwapError::InvalidResponse {
		reason: format!("Cannot price fixed quote: {}", e),
	};
	let from_amount_usd = request
		.from_token
		.fiat_for_units(&request.from_amount)
		.map_err(invalid)?;
	let to_amount = request
		.to_token
		.units_for_fiat(from_amount_usd)
		.map_err(invalid)?;

	Ok(SwapQuote {
		id: format!("fixed-{}-{}", request.from_token.symbol, request.to_token.symbol),
		tool: "fixed".to_string(),
		from_token: request.from_token.clone(),
		to_token: request.to_token.clone(),
		from_amount: request.from_amount.clone(),
		to_amount_min: to_amount.clone(),
		to_amount,
		from_amount_usd,
		to_amount_usd: from_amount_usd,
		gas_costs: Vec::new(),
		from_address: Some(request.from_address.clone()),
		to_address: Some(request.to_address.clone()),
		transaction_request: None,
	})
}

#[async_trait]
impl SwapRouteResolver for LifiSwapResolver {
	async fn get_swap_quote(&self, request: &SwapQuoteRequest) -> SwapResult<Option<SwapQuote>> {
		if !is_chain_supported(request.chain_id) {
			return Ok(None);
		}
		self.quotes
			.get_or_try_insert_with(QuoteKey::from(request), || self.fetch_quote(request))
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use onramp_types::{Token, ZKSYNC_ERA_CHAIN_ID};

	fn request() -> SwapQuoteRequest {
		SwapQuoteRequest {
			chain_id: ZKSYNC_ERA_CHAIN_ID,
			from_token: Token::new(ZKSYNC_ERA_CHAIN_ID, "0xUSDC", "USDC", 6, 1.0),
			to_token: Token::new(ZKSYNC_ERA_CHAIN_ID, "0xZK", "ZK", 18, 0.5),
			from_amount: TokenAmount::from(50_000_000u64),
			from_address: "0xme".to_string(),
			to_address: "0xme".to_string(),
		}
	}

	#[test]
	fn test_into_swap_quote_parses_usd_strings() {
		let quote: LifiQuote = serde_json::from_value(serde_json::json!({
			"id": "q-1",
			"tool": "syncswap",
			"estimate": {
				"fromAmount": "50000000",
				"toAmount": "98000000000000000000",
				"toAmountMin": "97000000000000000000",
				"fromAmountUSD": "50.00",
				"toAmountUSD": "49.00",
				"gasCosts": [{ "amountUSD": "1.00", "token": { "symbol": "ETH" } }]
			},
			"transactionRequest": { "to": "0xrouter", "data": "0x" }
		}))
		.unwrap();

		let swap = into_swap_quote(&request(), quote).unwrap();
		assert_eq!(swap.tool, "syncswap");
		assert_eq!(swap.to_amount.as_str(), "98000000000000000000");
		assert_eq!(swap.gas_costs[0].token_symbol.as_deref(), Some("ETH"));
		assert!((swap.net_output_ratio() - 0.96).abs() < 1e-9);
		assert_eq!(swap.from_address.as_deref(), Some("0xme"));
		assert!(swap.transaction_request.is_some());
	}

	#[test]
	fn test_into_swap_quote_rejects_bad_usd() {
		let quote: LifiQuote = serde_json::from_value(serde_json::json!({
			"id": "q-1",
			"tool": "syncswap",
			"estimate": {
				"fromAmount": "1",
				"toAmount": "1",
				"toAmountMin": "1",
				"fromAmountUSD": "lots"
			}
		}))
		.unwrap();
		assert!(matches!(
			into_swap_quote(&request(), quote),
			Err(SwapError::InvalidResponse { .. })
		));
	}

	#[tokio::test]
	async fn test_fixed_quote_converts_at_catalog_prices() {
		let resolver = LifiSwapResolver::new(LifiConfig {
			dev_fixed_quote: true,
			..Default::default()
		});
		let quote = resolver.get_swap_quote(&request()).await.unwrap().unwrap();

		// $50 of USDC into ZK at $0.5
		assert_eq!(quote.to_amount.as_str(), "100000000000000000000");
		assert_eq!(quote.net_output_ratio(), 1.0);
	}

	#[tokio::test]
	async fn test_unsupported_chain_has_no_route() {
		let resolver = LifiSwapResolver::new(LifiConfig {
			dev_fixed_quote: true,
			..Default::default()
		});
		let req = SwapQuoteRequest {
			chain_id: 10,
			..request()
		};
		assert!(resolver.get_swap_quote(&req).await.unwrap().is_none());
	}
}

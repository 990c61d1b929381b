//! Kado on-ramp adapter

use async_trait::async_trait;
use onramp_types::{
	find_supported_chain, is_chain_supported, CatalogStorage, KycRequirement, OrderStatus,
	OrderStatusRecord, PayDetails, PaymentMethod, PaymentMethodQuote, ProviderAdapter,
	ProviderError, ProviderMeta, ProviderResult, ProviderType, QuoteOptions, QuoteStep,
	ReceiveDetails, RouteType, SecretString, SyncReport, TokenAmount, TokenKey,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::client_cache::{ClientCache, ClientConfig};
use crate::http::{build_url, read_json, read_order_json};
use crate::timed_cache::TimedCache;
use crate::{canonical_token_address, REFERENCE_DATA_TTL};

pub const KADO_KEY: &str = "kado";

const PRODUCTION_API: &str = "https://api.kado.money";
const SANDBOX_API: &str = "https://test-api.kado.money";
const PRODUCTION_WIDGET: &str = "https://app.kado.money";
const SANDBOX_WIDGET: &str = "https://sandbox--kado.netlify.app/";

/// Kado prices its default method in `quote` and the rest in `quotes`
const DEFAULT_FIAT_METHOD: &str = "credit_card";

#[derive(Debug, Clone)]
pub struct KadoConfig {
	pub api_key: Option<SecretString>,
	/// Replaces both API environments, e.g. with a local server
	pub api_base_url: Option<String>,
	pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct KadoEnvelope<T> {
	data: Option<T>,
	success: bool,
	#[serde(default)]
	message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct KadoCountry {
	code: String,
	#[serde(default)]
	disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct KadoConfigData {
	countries: Vec<KadoCountry>,
}

#[derive(Debug, Clone, Deserialize)]
struct KadoBlockchains {
	blockchains: Vec<KadoBlockchain>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KadoBlockchain {
	official_id: String,
	#[serde(default)]
	associated_assets: Vec<KadoAsset>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KadoAsset {
	symbol: String,
	#[serde(default)]
	address: Option<String>,
	#[serde(default)]
	ramp_products: Vec<String>,
	#[serde(default)]
	kyc_levels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct KadoAmount {
	amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KadoReceive {
	unit_count: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KadoQuote {
	total_fee: KadoAmount,
	min_value: Option<KadoAmount>,
	max_value: Option<KadoAmount>,
	receive: KadoReceive,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KadoQuoteRequest {
	fiat_method: String,
	amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct KadoQuoteData {
	quote: Option<KadoQuote>,
	#[serde(default)]
	quotes: HashMap<String, KadoQuote>,
	request: KadoQuoteRequest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KadoOrder {
	payment_status: String,
	#[serde(default)]
	transfer_status: String,
	#[serde(default)]
	human_status_field: String,
}

fn network_key(chain_id: u64) -> Option<&'static str> {
	match chain_id {
		onramp_types::ZKSYNC_ERA_CHAIN_ID => Some("zksync"),
		onramp_types::ETHEREUM_CHAIN_ID => Some("ethereum"),
		_ => None,
	}
}

fn kyc_requirement(level: &str) -> Option<KycRequirement> {
	match level {
		"L0" => Some(KycRequirement::NoKyc),
		"L1" => Some(KycRequirement::Basic),
		"L1.5" | "L2" => Some(KycRequirement::DocumentBased),
		_ => None,
	}
}

/// Kado's method keys are our snake_case names
fn payment_method(key: &str) -> Option<PaymentMethod> {
	serde_json::from_value(serde_json::Value::String(key.to_string())).ok()
}

/// Translate Kado's payment/transfer pair into the provider-neutral status
fn order_record(order_id: &str, order: KadoOrder) -> ProviderResult<OrderStatusRecord> {
	let human = &order.human_status_field;
	let record = match (order.payment_status.as_str(), order.transfer_status.as_str()) {
		("pending", _) => OrderStatusRecord::new(OrderStatus::AwaitingPaymentFromUser),
		("success", "uninitiated") | ("success", "pending") => {
			OrderStatusRecord::new(OrderStatus::Processing)
		},
		("success", "settled") => OrderStatusRecord::new(OrderStatus::Completed)
			.with_message("Payment successful. Kado transfer settled successfully."),
		("success", "failed") => OrderStatusRecord::new(OrderStatus::Completed).with_message(
			format!("Payment successful, however the transfer failed: {}", human),
		),
		("success", _) => OrderStatusRecord::new(OrderStatus::Completed).with_message(format!(
			"Transfer status unknown, contact Kado support for more information. Order ID: {} :: Message: {}",
			order_id, human
		)),
		("failed", _) => OrderStatusRecord::new(OrderStatus::Failed).with_message(human.clone()),
		(other, _) => {
			return Err(ProviderError::invalid_response(
				KADO_KEY,
				format!("Unknown payment status '{}'", other),
			))
		},
	};
	Ok(record)
}

/// Kado on-ramp adapter
pub struct KadoAdapter {
	meta: ProviderMeta,
	config: KadoConfig,
	catalog: Arc<dyn CatalogStorage>,
	client_cache: ClientCache,
	config_data: TimedCache<(), KadoConfigData>,
	blockchains: TimedCache<(), Vec<KadoBlockchain>>,
}

impl KadoAdapter {
	pub fn new(config: KadoConfig, catalog: Arc<dyn CatalogStorage>) -> Self {
		Self::with_cache(config, catalog, ClientCache::for_adapter())
	}

	pub fn with_cache(
		config: KadoConfig,
		catalog: Arc<dyn CatalogStorage>,
		client_cache: ClientCache,
	) -> Self {
		Self {
			meta: ProviderMeta::new(
				KADO_KEY,
				ProviderType::Onramp,
				"Kado.money",
				"https://kado.money/favicon.ico",
			),
			config,
			catalog,
			client_cache,
			config_data: TimedCache::new(REFERENCE_DATA_TTL),
			blockchains: TimedCache::new(REFERENCE_DATA_TTL),
		}
	}

	fn api_base(&self, dev: bool) -> &str {
		match (&self.config.api_base_url, dev) {
			(Some(base), _) => base,
			(None, true) => SANDBOX_API,
			(None, false) => PRODUCTION_API,
		}
	}

	fn client(&self, dev: bool) -> ProviderResult<Arc<Client>> {
		let config = ClientConfig::new(KADO_KEY, self.api_base(dev), self.config.request_timeout_ms);
		Ok(self.client_cache.get_client(&config)?)
	}

	/// GET a Kado endpoint and unwrap its `{data, success, message}` envelope
	async fn get_data<T: DeserializeOwned>(
		&self,
		dev: bool,
		path: &str,
		query: &[(&str, String)],
	) -> ProviderResult<T> {
		let url = build_url(KADO_KEY, self.api_base(dev), path)?;
		let response = self.client(dev)?.get(url).query(query).send().await?;
		let envelope: KadoEnvelope<T> = read_json(KADO_KEY, response).await?;
		Self::unwrap_envelope(envelope)
	}

	fn unwrap_envelope<T>(envelope: KadoEnvelope<T>) -> ProviderResult<T> {
		match envelope {
			KadoEnvelope {
				success: true,
				data: Some(data),
				..
			} => Ok(data),
			KadoEnvelope { message, .. } => Err(ProviderError::Rejected {
				provider: KADO_KEY.to_string(),
				message,
			}),
		}
	}

	async fn fetch_config(&self) -> ProviderResult<KadoConfigData> {
		self.config_data
			.get_or_try_insert_with((), || self.get_data(false, "v2/public/config", &[]))
			.await
	}

	async fn fetch_blockchains(&self) -> ProviderResult<Vec<KadoBlockchain>> {
		self.blockchains
			.get_or_try_insert_with((), || async {
				let data: KadoBlockchains = self.get_data(false, "v1/ramp/blockchains", &[]).await?;
				Ok::<_, ProviderError>(data.blockchains)
			})
			.await
	}

	fn payment_link(&self, options: &QuoteOptions, network: &str) -> ProviderResult<String> {
		let widget = if options.dev {
			SANDBOX_WIDGET
		} else {
			PRODUCTION_WIDGET
		};
		let mut link = Url::parse(widget).map_err(|e| ProviderError::Config {
			reason: e.to_string(),
		})?;
		let route_type = options.route_type.to_string();
		{
			let mut params = link.query_pairs_mut();
			if let Some(api_key) = &self.config.api_key {
				params.append_pair("apiKey", api_key.expose_secret());
			}
			params
				.append_pair("onPayAmount", &options.fiat_amount.to_string())
				.append_pair("onPayCurrency", options.fiat_currency.code())
				.append_pair("onRevCurrency", &options.token.symbol)
				.append_pair("cryptoList", &options.token.symbol)
				.append_pair("onToAddress", &options.to)
				.append_pair("network", network)
				.append_pair("networkList", network)
				.append_pair("product", &route_type)
				.append_pair("productList", &route_type)
				.append_pair("mode", "minimal");
		}
		Ok(link.to_string())
	}
}

/// Merge quotes that share a payment link, keeping the best receive side
fn combine_by_link(quotes: Vec<PaymentMethodQuote>) -> Vec<PaymentMethodQuote> {
	let mut combined: Vec<PaymentMethodQuote> = Vec::new();
	for quote in quotes {
		let existing = combined
			.iter_mut()
			.find(|existing| existing.payment_link() == quote.payment_link());
		let Some(existing) = existing else {
			combined.push(quote);
			continue;
		};

		for method in &quote.payment_methods {
			if !existing.payment_methods.contains(method) {
				existing.payment_methods.push(*method);
			}
		}
		for level in &quote.kyc {
			if !existing.kyc.contains(level) {
				existing.kyc.push(*level);
			}
		}
		if quote.receive.amount_fiat > existing.receive.amount_fiat {
			existing.receive = quote.receive;
			existing.pay = quote.pay;
			existing.steps = quote.steps;
		}
	}
	combined
}

#[async_trait]
impl ProviderAdapter for KadoAdapter {
	fn meta(&self) -> &ProviderMeta {
		&self.meta
	}

	async fn sync_routes(&self) -> ProviderResult<SyncReport> {
		let (config, blockchains) = futures::try_join!(self.fetch_config(), self.fetch_blockchains())?;

		let desired_countries: BTreeSet<String> = config
			.countries
			.iter()
			.filter(|c| !c.disabled)
			.map(|c| c.code.to_ascii_uppercase())
			.collect();

		let mut desired_tokens = BTreeSet::new();
		let mut desired_kyc = BTreeSet::new();
		for blockchain in &blockchains {
			let Ok(chain_id) = blockchain.official_id.parse::<u64>() else {
				continue;
			};
			if !is_chain_supported(chain_id) {
				continue;
			}

			for asset in &blockchain.associated_assets {
				let Some(address) = asset.address.as_deref().filter(|a| !a.is_empty()) else {
					continue;
				};
				if !asset.ramp_products.iter().any(|p| p == "buy") {
					continue;
				}

				let key = TokenKey::new(chain_id, canonical_token_address(chain_id, Some(address)));
				if self.catalog.get_token(&key).await?.is_none() {
					warn!(
						provider = KADO_KEY,
						"Token \"{}\" {} at chainId {} not found in catalog", asset.symbol, key.address, chain_id
					);
					continue;
				}
				desired_tokens.insert(key);

				for level in &asset.kyc_levels {
					match kyc_requirement(level) {
						Some(requirement) => {
							desired_kyc.insert(requirement);
						},
						None => warn!(
							provider = KADO_KEY,
							"Unknown kyc level {} for token {}", level, asset.symbol
						),
					}
				}
			}
		}

		let report = SyncReport {
			tokens: self
				.catalog
				.reconcile_supported_tokens(KADO_KEY, RouteType::Buy, desired_tokens)
				.await?,
			countries: self
				.catalog
				.reconcile_supported_countries(KADO_KEY, desired_countries)
				.await?,
			kyc: self
				.catalog
				.reconcile_supported_kyc(KADO_KEY, desired_kyc)
				.await?,
		};

		info!(
			provider = KADO_KEY,
			"Synced routes: tokens +{}/-{}, countries +{}/-{}, kyc +{}/-{}",
			report.tokens.added,
			report.tokens.removed,
			report.countries.added,
			report.countries.removed,
			report.kyc.added,
			report.kyc.removed
		);
		Ok(report)
	}

	async fn get_quote(&self, options: &QuoteOptions) -> ProviderResult<Vec<PaymentMethodQuote>> {
		let chain_not_supported = || ProviderError::ChainNotSupported {
			provider: KADO_KEY.to_string(),
			chain_id: options.chain_id,
		};
		let network = network_key(options.chain_id).ok_or_else(chain_not_supported)?;
		let chain = find_supported_chain(options.chain_id).ok_or_else(chain_not_supported)?;

		let mut query = vec![
			("transactionType", options.route_type.to_string()),
			("amount", options.fiat_amount.to_string()),
			("asset", options.token.symbol.clone()),
			("blockchain", network.to_string()),
			("fiatMethod", DEFAULT_FIAT_METHOD.to_string()),
			("currency", options.fiat_currency.code().to_string()),
		];
		if let Some(country) = &options.country {
			query.push(("country", country.clone()));
		}

		let data: KadoQuoteData = self.get_data(options.dev, "v2/ramp/quote", &query).await?;
		let kyc: Vec<KycRequirement> = self.catalog.supported_kyc(KADO_KEY).await?.into_iter().collect();
		let link = self.payment_link(options, network)?;

		let mut priced = data.quotes;
		if let Some(default_quote) = data.quote {
			priced.insert(data.request.fiat_method.clone(), default_quote);
		}
		// HashMap order is arbitrary; sort so merging is deterministic
		let mut priced: Vec<(String, KadoQuote)> = priced.into_iter().collect();
		priced.sort_by(|a, b| a.0.cmp(&b.0));

		let mut quotes = Vec::new();
		for (method_key, quote) in priced {
			let Some(method) = payment_method(&method_key) else {
				continue;
			};
			if !options.allows_payment_method(&method) {
				continue;
			}

			let amount_units =
				TokenAmount::from_token_units(quote.receive.unit_count, options.token.decimals)
					.map_err(|e| ProviderError::invalid_response(KADO_KEY, e.to_string()))?;
			quotes.push(PaymentMethodQuote {
				route_type: options.route_type,
				pay: PayDetails {
					currency: options.fiat_currency,
					fiat_amount: data.request.amount,
					total_fee_fiat: quote.total_fee.amount,
					min_amount_fiat: quote.min_value.map(|v| v.amount),
					max_amount_fiat: quote.max_value.map(|v| v.amount),
				},
				receive: ReceiveDetails {
					to: options.to.clone(),
					token: options.token.clone(),
					chain: chain.clone(),
					amount_units,
					amount_fiat: quote.receive.unit_count * options.token.usd_price,
				},
				steps: vec![QuoteStep::PayViaExternalLink { link: link.clone() }],
				payment_methods: vec![method],
				kyc: kyc.clone(),
				country: options.country.clone(),
			});
		}

		Ok(combine_by_link(quotes))
	}

	async fn get_order_status(&self, order_id: &str, dev: bool) -> ProviderResult<OrderStatusRecord> {
		let url = build_url(
			KADO_KEY,
			self.api_base(dev),
			&format!("v2/public/orders/{}", order_id),
		)?;
		let response = self.client(dev)?.get(url).send().await?;
		let envelope: KadoEnvelope<KadoOrder> = read_order_json(KADO_KEY, order_id, response).await?;
		order_record(order_id, Self::unwrap_envelope(envelope)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use onramp_types::{Chain, Token, ZKSYNC_ERA_CHAIN_ID};

	fn order(payment: &str, transfer: &str) -> KadoOrder {
		KadoOrder {
			payment_status: payment.to_string(),
			transfer_status: transfer.to_string(),
			human_status_field: "bank rejected".to_string(),
		}
	}

	#[test]
	fn test_kyc_levels() {
		assert_eq!(kyc_requirement("L0"), Some(KycRequirement::NoKyc));
		assert_eq!(kyc_requirement("L1"), Some(KycRequirement::Basic));
		assert_eq!(kyc_requirement("L1.5"), Some(KycRequirement::DocumentBased));
		assert_eq!(kyc_requirement("L2"), Some(KycRequirement::DocumentBased));
		assert_eq!(kyc_requirement("L3"), None);
	}

	#[test]
	fn test_payment_method_keys() {
		assert_eq!(payment_method("apple_pay_debit"), Some(PaymentMethod::ApplePayDebit));
		assert_eq!(payment_method("koywe"), Some(PaymentMethod::Koywe));
		assert_eq!(payment_method("crypto_card"), None);
	}

	#[test]
	fn test_order_status_mapping() {
		let status = |p, t| order_record("ord-1", order(p, t)).unwrap();

		assert_eq!(status("pending", "uninitiated").status, OrderStatus::AwaitingPaymentFromUser);
		assert_eq!(status("success", "pending").status, OrderStatus::Processing);

		let settled = status("success", "settled");
		assert_eq!(settled.status, OrderStatus::Completed);
		assert_eq!(
			settled.status_message.as_deref(),
			Some("Payment successful. Kado transfer settled successfully.")
		);

		let transfer_failed = status("success", "failed");
		assert_eq!(transfer_failed.status, OrderStatus::Completed);
		assert!(transfer_failed
			.status_message
			.unwrap()
			.ends_with("transfer failed: bank rejected"));

		let unknown = status("success", "unknown");
		assert!(unknown.status_message.unwrap().contains("Order ID: ord-1"));

		let failed = status("failed", "");
		assert_eq!(failed.status, OrderStatus::Failed);
		assert_eq!(failed.status_message.as_deref(), Some("bank rejected"));

		assert!(order_record("ord-1", order("weird", "")).is_err());
	}

	fn quote(method: PaymentMethod, link: &str, amount_fiat: f64) -> PaymentMethodQuote {
		let token = Token::new(ZKSYNC_ERA_CHAIN_ID, "0xusdc", "USDC", 6, 1.0);
		PaymentMethodQuote {
			route_type: RouteType::Buy,
			pay: PayDetails {
				currency: onramp_types::FiatCurrency::Usd,
				fiat_amount: 100.0,
				total_fee_fiat: 100.0 - amount_fiat,
				min_amount_fiat: None,
				max_amount_fiat: None,
			},
			receive: ReceiveDetails {
				to: "0xrecipient".to_string(),
				token,
				chain: Chain::new(ZKSYNC_ERA_CHAIN_ID, "ZKsync Era"),
				amount_units: TokenAmount::zero(),
				amount_fiat,
			},
			steps: vec![QuoteStep::PayViaExternalLink {
				link: link.to_string(),
			}],
			payment_methods: vec![method],
			kyc: vec![KycRequirement::Basic],
			country: None,
		}
	}

	#[test]
	fn test_combine_by_link_merges_methods_and_keeps_best() {
		let combined = combine_by_link(vec![
			quote(PaymentMethod::CreditCard, "https://app.kado.money/?a", 95.0),
			quote(PaymentMethod::Ach, "https://app.kado.money/?a", 97.0),
			quote(PaymentMethod::Wire, "https://app.kado.money/?b", 90.0),
		]);

		assert_eq!(combined.len(), 2);
		assert_eq!(
			combined[0].payment_methods,
			vec![PaymentMethod::CreditCard, PaymentMethod::Ach]
		);
		assert_eq!(combined[0].receive.amount_fiat, 97.0);
		assert_eq!(combined[1].payment_methods, vec![PaymentMethod::Wire]);
	}
}

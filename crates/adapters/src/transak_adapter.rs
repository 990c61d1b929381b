//! Transak on-ramp adapter
//!
//! Quotes come from the public pricing API, one call per Transak payment method. Order lookups
//! go through the partner API with an access token minted from the partner secret.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use onramp_types::{
	find_supported_chain, is_chain_supported, CatalogStorage, KycRequirement, OrderStatus,
	OrderStatusRecord, PayDetails, PaymentMethod, PaymentMethodQuote, ProviderAdapter,
	ProviderError, ProviderMeta, ProviderResult, ProviderType, QuoteOptions, QuoteStep,
	ReceiveDetails, RouteType, SecretString, SyncReport, TokenAmount, TokenKey,
};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::client_cache::{ClientCache, ClientConfig};
use crate::http::{build_url, read_json, read_order_json};
use crate::timed_cache::TimedCache;
use crate::{canonical_token_address, REFERENCE_DATA_TTL};

pub const TRANSAK_KEY: &str = "transak";

const PRODUCTION_API: &str = "https://api.transak.com/api";
const STAGING_API: &str = "https://api-stg.transak.com/api";
const PRODUCTION_WIDGET: &str = "https://global.transak.com";
const STAGING_WIDGET: &str = "https://staging-global.transak.com";

const KYC_LEVELS_TTL: Duration = Duration::from_secs(5 * 60);
/// Access tokens are dropped this long before the server-side expiry
const ACCESS_TOKEN_EARLY_EXPIRY_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Environment {
	Production,
	Staging,
}

impl Environment {
	fn from_dev(dev: bool) -> Self {
		if dev {
			Environment::Staging
		} else {
			Environment::Production
		}
	}
}

#[derive(Debug, Clone)]
pub struct TransakCredentials {
	pub api_key: SecretString,
	/// Needed only for order lookups
	pub secret_key: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct TransakConfig {
	pub production: TransakCredentials,
	pub staging: Option<TransakCredentials>,
	/// Replaces both API environments, e.g. with a local server
	pub api_base_url: Option<String>,
	pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct TransakEnvelope<T> {
	response: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransakCountry {
	alpha2: String,
	is_allowed: bool,
	#[serde(default)]
	is_light_kyc_allowed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransakNetwork {
	#[serde(default)]
	chain_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransakCrypto {
	coin_id: String,
	symbol: String,
	#[serde(default)]
	address: Option<String>,
	is_allowed: bool,
	network: TransakNetwork,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransakQuote {
	crypto_amount: f64,
	total_fee: f64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenEnvelope {
	data: AccessTokenData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenData {
	access_token: String,
	/// Unix seconds
	expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
	data: TransakOrder,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransakOrder {
	status: String,
	#[serde(default)]
	is_buy_or_sell: Option<String>,
	#[serde(default)]
	fiat_currency: String,
	fiat_amount: Option<f64>,
	amount_paid: Option<f64>,
	#[serde(default)]
	crypto_currency: String,
	crypto_amount: Option<f64>,
	conversion_price: Option<f64>,
	total_fee_in_fiat: Option<f64>,
	network: Option<String>,
	auto_expires_at: Option<DateTime<Utc>>,
	completed_at: Option<DateTime<Utc>>,
	#[serde(default)]
	status_histories: Vec<StatusHistory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusHistory {
	message: Option<String>,
	created_at: Option<DateTime<Utc>>,
}

fn network_key(chain_id: u64) -> Option<&'static str> {
	match chain_id {
		onramp_types::ZKSYNC_ERA_CHAIN_ID => Some("zksync"),
		onramp_types::ETHEREUM_CHAIN_ID => Some("ethereum"),
		_ => None,
	}
}

/// Transak groups card and wallet methods; rails it doesn't price map to `None`
fn payment_method_code(method: &PaymentMethod) -> Option<&'static str> {
	match method {
		PaymentMethod::CreditCard | PaymentMethod::DebitCard => Some("credit_debit_card"),
		PaymentMethod::ApplePayCredit | PaymentMethod::ApplePayDebit => Some("apple_pay"),
		PaymentMethod::GooglePayCredit | PaymentMethod::GooglePayDebit => Some("google_pay"),
		PaymentMethod::Wire
		| PaymentMethod::Pix
		| PaymentMethod::Sepa
		| PaymentMethod::Ach
		| PaymentMethod::Koywe => None,
	}
}

fn kyc_for_country(country: &TransakCountry) -> KycRequirement {
	if country.is_light_kyc_allowed {
		KycRequirement::Basic
	} else {
		KycRequirement::DocumentBased
	}
}

fn order_status(code: &str) -> Option<OrderStatus> {
	let status = match code {
		"AWAITING_PAYMENT_FROM_USER" => OrderStatus::AwaitingPaymentFromUser,
		"PAYMENT_DONE_MARKED_BY_USER" => OrderStatus::PaymentDoneMarkedByUser,
		"PROCESSING" => OrderStatus::Processing,
		"PENDING_DELIVERY_FROM_TRANSAK" => OrderStatus::PendingDelivery,
		"ON_HOLD_PENDING_DELIVERY_FROM_TRANSAK" => OrderStatus::OnHoldPendingDelivery,
		"COMPLETED" => OrderStatus::Completed,
		"CANCELLED" => OrderStatus::Cancelled,
		"FAILED" => OrderStatus::Failed,
		"REFUNDED" => OrderStatus::Refunded,
		"EXPIRED" => OrderStatus::Expired,
		_ => return None,
	};
	Some(status)
}

fn access_token_ttl(expires_at_secs: i64, now: DateTime<Utc>) -> Duration {
	let remaining_ms =
		expires_at_secs.saturating_mul(1000) - now.timestamp_millis() - ACCESS_TOKEN_EARLY_EXPIRY_MS;
	Duration::from_millis(remaining_ms.max(0) as u64)
}

/// Transak on-ramp adapter
pub struct TransakAdapter {
	meta: ProviderMeta,
	config: TransakConfig,
	catalog: Arc<dyn CatalogStorage>,
	client_cache: ClientCache,
	countries: TimedCache<(), Vec<TransakCountry>>,
	cryptos: TimedCache<(), Vec<TransakCrypto>>,
	kyc_levels: TimedCache<(), Vec<KycRequirement>>,
	access_tokens: TimedCache<Environment, SecretString>,
}

impl TransakAdapter {
	pub fn new(config: TransakConfig, catalog: Arc<dyn CatalogStorage>) -> Self {
		Self::with_cache(config, catalog, ClientCache::for_adapter())
	}

	pub fn with_cache(
		config: TransakConfig,
		catalog: Arc<dyn CatalogStorage>,
		client_cache: ClientCache,
	) -> Self {
		Self {
			meta: ProviderMeta::new(
				TRANSAK_KEY,
				ProviderType::Onramp,
				"Transak",
				"https://assets.transak.com/images/ui/favicon.png",
			),
			config,
			catalog,
			client_cache,
			countries: TimedCache::new(REFERENCE_DATA_TTL),
			cryptos: TimedCache::new(REFERENCE_DATA_TTL),
			kyc_levels: TimedCache::new(KYC_LEVELS_TTL),
			access_tokens: TimedCache::new(Duration::ZERO),
		}
	}

	fn api_base(&self, env: Environment) -> &str {
		if let Some(base) = &self.config.api_base_url {
			return base;
		}
		match env {
			Environment::Production => PRODUCTION_API,
			Environment::Staging => STAGING_API,
		}
	}

	fn widget_base(env: Environment) -> &'static str {
		match env {
			Environment::Production => PRODUCTION_WIDGET,
			Environment::Staging => STAGING_WIDGET,
		}
	}

	fn credentials(&self, env: Environment) -> ProviderResult<&TransakCredentials> {
		match env {
			Environment::Production => Ok(&self.config.production),
			Environment::Staging => self.config.staging.as_ref().ok_or_else(|| ProviderError::Config {
				reason: "Transak staging credentials are not configured".to_string(),
			}),
		}
	}

	fn client(&self, env: Environment) -> ProviderResult<Arc<Client>> {
		let config = ClientConfig::new(TRANSAK_KEY, self.api_base(env), self.config.request_timeout_ms);
		Ok(self.client_cache.get_client(&config)?)
	}

	async fn fetch_countries(&self) -> ProviderResult<Vec<TransakCountry>> {
		self.countries
			.get_or_try_insert_with((), || async {
				let env = Environment::Production;
				let url = build_url(TRANSAK_KEY, self.api_base(env), "v2/countries")?;
				let response = self.client(env)?.get(url).send().await?;
				let envelope: TransakEnvelope<Vec<TransakCountry>> =
					read_json(TRANSAK_KEY, response).await?;
				Ok::<_, ProviderError>(envelope.response)
			})
			.await
	}

	async fn fetch_cryptos(&self) -> ProviderResult<Vec<TransakCrypto>> {
		self.cryptos
			.get_or_try_insert_with((), || async {
				let env = Environment::Production;
				let url = build_url(
					TRANSAK_KEY,
					self.api_base(env),
					"v2/currencies/crypto-currencies",
				)?;
				let response = self.client(env)?.get(url).send().await?;
				let envelope: TransakEnvelope<Vec<TransakCrypto>> =
					read_json(TRANSAK_KEY, response).await?;
				Ok::<_, ProviderError>(envelope.response)
			})
			.await
	}

	async fn supported_kyc_levels(&self) -> ProviderResult<Vec<KycRequirement>> {
		self.kyc_levels
			.get_or_try_insert_with((), || async {
				let levels = self.catalog.supported_kyc(TRANSAK_KEY).await?;
				Ok::<_, ProviderError>(levels.into_iter().collect())
			})
			.await
	}

	async fn fetch_quote(
		&self,
		env: Environment,
		options: &QuoteOptions,
		network: &str,
		method_code: &str,
	) -> ProviderResult<TransakQuote> {
		let credentials = self.credentials(env)?;
		let url = build_url(TRANSAK_KEY, self.api_base(env), "v1/pricing/public/quotes")?;
		let mut query: Vec<(&str, String)> = vec![
			("partnerApiKey", credentials.api_key.expose_secret().to_string()),
			("fiatCurrency", options.fiat_currency.code().to_string()),
			("fiatAmount", options.fiat_amount.to_string()),
			("cryptoCurrency", options.token.symbol.clone()),
			("isBuyOrSell", "BUY".to_string()),
			("network", network.to_string()),
			("paymentMethod", method_code.to_string()),
		];
		if let Some(country) = &options.country {
			query.push(("quoteCountryCode", country.clone()));
		}

		let response = self.client(env)?.get(url).query(&query).send().await?;
		let envelope: TransakEnvelope<TransakQuote> = read_json(TRANSAK_KEY, response).await?;
		Ok(envelope.response)
	}

	fn payment_link(
		&self,
		env: Environment,
		options: &QuoteOptions,
		network: &str,
		method_code: &str,
	) -> ProviderResult<String> {
		let credentials = self.credentials(env)?;
		let fiat_amount = options.fiat_amount.to_string();
		let link = Url::parse_with_params(
			Self::widget_base(env),
			&[
				("apiKey", credentials.api_key.expose_secret()),
				("productsAvailed", "BUY"),
				("defaultPaymentMethod", method_code),
				("walletAddress", options.to.as_str()),
				("defaultFiatCurrency", options.fiat_currency.code()),
				("defaultFiatAmount", fiat_amount.as_str()),
				("cryptoCurrencyCode", options.token.symbol.as_str()),
				("network", network),
			],
		)
		.map_err(|e| ProviderError::invalid_response(TRANSAK_KEY, e.to_string()))?;
		Ok(link.to_string())
	}

	async fn access_token(&self, env: Environment) -> ProviderResult<SecretString> {
		if let Some(token) = self.access_tokens.get(&env) {
			return Ok(token);
		}

		let credentials = self.credentials(env)?;
		let secret = credentials
			.secret_key
			.as_ref()
			.ok_or_else(|| ProviderError::Config {
				reason: "Transak secret key is required for order lookups".to_string(),
			})?;
		let url = build_url(TRANSAK_KEY, self.api_base(env), "partners/api/v2/refresh-token")?;

		debug!("Refreshing Transak access token ({:?})", env);
		let response = self
			.client(env)?
			.post(url)
			.header("api-secret", secret.expose_secret())
			.json(&serde_json::json!({ "apiKey": credentials.api_key.expose_secret() }))
			.send()
			.await?;
		let envelope: AccessTokenEnvelope = read_json(TRANSAK_KEY, response).await?;

		let ttl = access_token_ttl(envelope.data.expires_at, Utc::now());
		let token = SecretString::new(envelope.data.access_token);
		self.access_tokens.insert_with_ttl(env, token.clone(), ttl);
		Ok(token)
	}

	fn order_record(order: TransakOrder) -> ProviderResult<OrderStatusRecord> {
		let status = order_status(&order.status).ok_or_else(|| {
			ProviderError::invalid_response(
				TRANSAK_KEY,
				format!("Unknown order status '{}'", order.status),
			)
		})?;

		let mut record = OrderStatusRecord::new(status);
		if status == OrderStatus::Failed {
			record.status_message = order
				.status_histories
				.last()
				.and_then(|history| history.message.clone());
		}
		record.is_buy_or_sell = match order.is_buy_or_sell.as_deref() {
			Some("SELL") => RouteType::Sell,
			_ => RouteType::Buy,
		};
		record.fiat_currency = order.fiat_currency;
		record.fiat_amount = order.fiat_amount;
		record.amount_paid = order.amount_paid;
		record.crypto_currency = order.crypto_currency;
		record.crypto_amount = order.crypto_amount;
		record.conversion_price = order.conversion_price;
		record.total_fee_in_fiat = order.total_fee_in_fiat;
		record.network = order.network;
		record.auto_expires_at = order.auto_expires_at;
		record.created_at = order
			.status_histories
			.first()
			.and_then(|history| history.created_at);
		record.completed_at = order.completed_at;
		Ok(record)
	}
}

#[async_trait]
impl ProviderAdapter for TransakAdapter {
	fn meta(&self) -> &ProviderMeta {
		&self.meta
	}

	async fn sync_routes(&self) -> ProviderResult<SyncReport> {
		let (countries, cryptos) = futures::try_join!(self.fetch_countries(), self.fetch_cryptos())?;

		let allowed_countries: Vec<&TransakCountry> =
			countries.iter().filter(|c| c.is_allowed).collect();
		let desired_countries: BTreeSet<String> = allowed_countries
			.iter()
			.map(|c| c.alpha2.to_ascii_uppercase())
			.collect();
		let desired_kyc: BTreeSet<KycRequirement> =
			allowed_countries.iter().map(|c| kyc_for_country(c)).collect();

		let mut desired_tokens = BTreeSet::new();
		for crypto in cryptos.iter().filter(|c| c.is_allowed) {
			let Some(chain_id) = crypto
				.network
				.chain_id
				.as_deref()
				.and_then(|id| id.parse::<u64>().ok())
			else {
				continue;
			};
			if !is_chain_supported(chain_id) {
				continue;
			}

			// The native coin comes without an address
			let raw_address = if crypto.coin_id == "ethereum" {
				None
			} else {
				crypto.address.as_deref()
			};
			let key = TokenKey::new(chain_id, canonical_token_address(chain_id, raw_address));
			if self.catalog.get_token(&key).await?.is_some() {
				desired_tokens.insert(key);
			} else {
				warn!(
					provider = TRANSAK_KEY,
					"Token {} at chainId {} not found in catalog. Skipping.", crypto.symbol, chain_id
				);
			}
		}

		let report = SyncReport {
			tokens: self
				.catalog
				.reconcile_supported_tokens(TRANSAK_KEY, RouteType::Buy, desired_tokens)
				.await?,
			countries: self
				.catalog
				.reconcile_supported_countries(TRANSAK_KEY, desired_countries)
				.await?,
			kyc: self
				.catalog
				.reconcile_supported_kyc(TRANSAK_KEY, desired_kyc)
				.await?,
		};
		if report.kyc.added > 0 || report.kyc.removed > 0 {
			self.kyc_levels.clear();
		}

		info!(
			provider = TRANSAK_KEY,
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
		let env = Environment::from_dev(options.dev);
		let chain_not_supported = || ProviderError::ChainNotSupported {
			provider: TRANSAK_KEY.to_string(),
			chain_id: options.chain_id,
		};
		let network = network_key(options.chain_id).ok_or_else(chain_not_supported)?;
		let chain = find_supported_chain(options.chain_id).ok_or_else(chain_not_supported)?;
		let kyc = self.supported_kyc_levels().await?;

		// Several of our methods share one Transak method; price each Transak method once
		let mut codes: Vec<&'static str> = options
			.payment_methods
			.iter()
			.filter_map(payment_method_code)
			.collect();
		codes.sort_unstable();
		codes.dedup();

		let priced = join_all(codes.iter().map(|code| async move {
			(*code, self.fetch_quote(env, options, network, code).await)
		}))
		.await;

		let mut quotes_by_code: HashMap<&str, TransakQuote> = HashMap::new();
		for (code, result) in priced {
			match result {
				Ok(quote) => {
					quotes_by_code.insert(code, quote);
				},
				Err(e) => warn!(
					provider = TRANSAK_KEY,
					"Failed to price {} via {}: {}", options.token.symbol, code, e
				),
			}
		}

		let mut quotes = Vec::new();
		for method in &options.payment_methods {
			let Some(code) = payment_method_code(method) else {
				continue;
			};
			let Some(quote) = quotes_by_code.get(code) else {
				continue;
			};

			let amount_units = TokenAmount::from_token_units(quote.crypto_amount, options.token.decimals)
				.map_err(|e| ProviderError::invalid_response(TRANSAK_KEY, e.to_string()))?;
			quotes.push(PaymentMethodQuote {
				route_type: options.route_type,
				pay: PayDetails {
					currency: options.fiat_currency,
					fiat_amount: options.fiat_amount,
					total_fee_fiat: quote.total_fee,
					min_amount_fiat: None,
					max_amount_fiat: None,
				},
				receive: ReceiveDetails {
					to: options.to.clone(),
					token: options.token.clone(),
					chain: chain.clone(),
					amount_units,
					amount_fiat: quote.crypto_amount * options.token.usd_price,
				},
				steps: vec![QuoteStep::PayViaExternalLink {
					link: self.payment_link(env, options, network, code)?,
				}],
				payment_methods: vec![*method],
				kyc: kyc.clone(),
				country: options.country.clone(),
			});
		}

		Ok(quotes)
	}

	async fn get_order_status(&self, order_id: &str, dev: bool) -> ProviderResult<OrderStatusRecord> {
		let env = Environment::from_dev(dev);
		let token = self.access_token(env).await?;
		let url = build_url(
			TRANSAK_KEY,
			self.api_base(env),
			&format!("v2/order/{}", order_id),
		)?;

		let response = self
			.client(env)?
			.get(url)
			.header("access-token", token.expose_secret())
			.send()
			.await?;
		let envelope: OrderEnvelope = match read_order_json(TRANSAK_KEY, order_id, response).await {
			Ok(envelope) => envelope,
			Err(ProviderError::HttpStatus { status_code: 401, reason }) => {
				self.access_tokens.invalidate(&env);
				return Err(ProviderError::HttpStatus {
					status_code: 401,
					reason,
				});
			},
			Err(e) => return Err(e),
		};

		Self::order_record(envelope.data)
	}
}

//! Quote aggregation across on-ramp providers
//!
//! Every registered provider is asked for a quote on the requested token. Providers that cannot
//! deliver it directly are asked for a token they do deliver, and the quote is extended with a
//! swap leg into the requested token.

use futures::future::join_all;
use onramp_adapters::{canonical_token_address, ProviderRegistry};
use onramp_types::{
	AmountError, CatalogStorage, PaymentMethodQuote, ProviderAdapter, ProviderQuote, QuoteError,
	QuoteOptions, QuoteRequest, QuoteResponse, QuoteResult, QuoteStep, QuoteValidationError,
	SupportedToken, SwapQuote, SwapQuoteRequest, SwapRouteResolver, Token, TokenKey,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::sync::{ReadinessGate, SyncError};

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
	/// Budget for a single provider's `get_quote`, after which it is left out
	pub per_provider_timeout: Duration,
	/// Notional used to probe swap routes in dev mode
	pub dev_swap_notional_usd: f64,
	/// How long a request waits for the first sync cycle
	pub readiness_timeout: Duration,
}

impl Default for AggregatorConfig {
	fn default() -> Self {
		Self {
			per_provider_timeout: Duration::from_secs(10),
			dev_swap_notional_usd: 0.25,
			readiness_timeout: Duration::from_secs(120),
		}
	}
}

/// How one provider is going to be asked
struct ProviderPlan {
	adapter: Arc<dyn ProviderAdapter>,
	options: QuoteOptions,
	swap: Option<SwapQuote>,
}

/// Fold a swap leg into a quote for the swap's input token.
///
/// The receive side ends up in `requested`, valued at what survives the swap after gas.
pub fn apply_swap_leg(
	quote: &mut PaymentMethodQuote,
	swap: &SwapQuote,
	requested: &Token,
) -> Result<(), AmountError> {
	let gas_cost_usd = swap.gas_cost_usd();
	let diff_factor = swap.net_output_ratio();

	let amount_fiat = quote.receive.amount_fiat * diff_factor;
	quote.receive.amount_units = requested.units_for_fiat(amount_fiat)?;
	quote.receive.amount_fiat = amount_fiat;
	quote.receive.token = requested.clone();
	quote.pay.total_fee_fiat += gas_cost_usd;
	quote.steps.push(QuoteStep::TokenSwap {
		swap_quote: swap.clone(),
	});
	Ok(())
}

pub struct QuoteAggregator {
	catalog: Arc<dyn CatalogStorage>,
	providers: Arc<ProviderRegistry>,
	swap_resolver: Option<Arc<dyn SwapRouteResolver>>,
	readiness: ReadinessGate,
	config: AggregatorConfig,
}

impl QuoteAggregator {
	pub fn new(
		catalog: Arc<dyn CatalogStorage>,
		providers: Arc<ProviderRegistry>,
		readiness: ReadinessGate,
		config: AggregatorConfig,
	) -> Self {
		Self {
			catalog,
			providers,
			swap_resolver: None,
			readiness,
			config,
		}
	}

	/// Enable swap legs for providers that do not deliver the requested token
	pub fn with_swap_resolver(mut self, resolver: Arc<dyn SwapRouteResolver>) -> Self {
		self.swap_resolver = Some(resolver);
		self
	}

	/// Ranked quotes for `request`, best receive amount first.
	///
	/// Malformed requests fail before any provider is contacted. Provider failures only drop
	/// that provider from the result.
	pub async fn get_quotes(&self, request: QuoteRequest) -> QuoteResult<QuoteResponse> {
		request.validate()?;

		self.readiness
			.wait(self.config.readiness_timeout)
			.await
			.map_err(|e| match e {
				SyncError::NotReady { reason } => QuoteError::NotReady { reason },
				other => QuoteError::NotReady {
					reason: other.to_string(),
				},
			})?;

		let address = canonical_token_address(request.chain_id, Some(&request.token));
		let key = TokenKey::new(request.chain_id, &address);
		let token = self.catalog.get_token(&key).await?.ok_or_else(|| {
			QuoteValidationError::TokenNotFound {
				chain_id: request.chain_id,
				address: address.clone(),
			}
		})?;

		let options = request.normalize(token)?;
		self.aggregate(&options).await
	}

	/// Aggregate over already normalized options
	pub async fn aggregate(&self, options: &QuoteOptions) -> QuoteResult<QuoteResponse> {
		let supported: Vec<SupportedToken> = self
			.catalog
			.supported_tokens_for_chain(options.chain_id, options.route_type)
			.await?
			.into_iter()
			.filter(|s| {
				self.providers
					.get(&s.provider_key)
					.map_or(false, |adapter| options.allows_provider(adapter.meta()))
			})
			.collect();

		let swaps = self.resolve_swaps(options, &supported).await;
		let plans = self.plan(options, &supported, &swaps);
		info!(
			"Quoting {} on chain {} with {} providers, {} swap routes available",
			options.token.symbol,
			options.chain_id,
			plans.len(),
			swaps.len()
		);

		let per_provider_timeout = self.config.per_provider_timeout;
		let results = join_all(plans.into_iter().map(|plan| async move {
			let provider = plan.adapter.meta().key.clone();
			match timeout(per_provider_timeout, plan.adapter.get_quote(&plan.options)).await {
				Ok(Ok(quotes)) => Some((plan, quotes)),
				Ok(Err(e)) => {
					warn!(provider = %provider, "Provider returned error: {}", e);
					None
				},
				Err(_) => {
					warn!(
						provider = %provider,
						"Provider timed out after {}ms",
						per_provider_timeout.as_millis()
					);
					None
				},
			}
		}))
		.await;

		let mut quotes: Vec<ProviderQuote> = results
			.into_iter()
			.flatten()
			.filter_map(|(plan, quotes)| self.finish(options, plan, quotes))
			.collect();

		// Stable, ties keep registration order
		quotes.sort_by(|a, b| {
			b.best_receive_fiat()
				.partial_cmp(&a.best_receive_fiat())
				.unwrap_or(Ordering::Equal)
		});

		info!(
			"Quote aggregation completed: {} providers returned quotes",
			quotes.len()
		);
		Ok(QuoteResponse { quotes })
	}

	/// Swap estimates from every other supported token into the requested one
	async fn resolve_swaps(
		&self,
		options: &QuoteOptions,
		supported: &[SupportedToken],
	) -> HashMap<TokenKey, SwapQuote> {
		let Some(resolver) = &self.swap_resolver else {
			return HashMap::new();
		};

		let requested = options.token.key();
		let candidates: BTreeMap<TokenKey, &Token> = supported
			.iter()
			.filter(|s| s.token.key() != requested)
			.map(|s| (s.token.key(), &s.token))
			.collect();

		let notional_usd = if options.dev {
			self.config.dev_swap_notional_usd
		} else {
			options.fiat_amount
		};

		let lookups = candidates.into_iter().map(|(key, candidate)| {
			let resolver = resolver.clone();
			async move {
				let from_amount = match candidate.units_for_fiat(notional_usd) {
					Ok(amount) => amount,
					Err(e) => {
						debug!("Skipping swap from {}: {}", candidate.symbol, e);
						return None;
					},
				};
				let request = SwapQuoteRequest {
					chain_id: options.chain_id,
					from_token: candidate.clone(),
					to_token: options.token.clone(),
					from_amount,
					from_address: options.to.clone(),
					to_address: options.to.clone(),
				};
				match resolver.get_swap_quote(&request).await {
					Ok(Some(quote)) => Some((key, quote)),
					Ok(None) => {
						debug!(
							"No swap route from {} to {}",
							candidate.symbol, options.token.symbol
						);
						None
					},
					Err(e) => {
						warn!(
							"Swap resolver failed for {} to {}: {}",
							candidate.symbol, options.token.symbol, e
						);
						None
					},
				}
			}
		});

		join_all(lookups).await.into_iter().flatten().collect()
	}

	/// Decide per provider, in registration order, whether to quote directly, through a swap, or
	/// not at all
	fn plan(
		&self,
		options: &QuoteOptions,
		supported: &[SupportedToken],
		swaps: &HashMap<TokenKey, SwapQuote>,
	) -> Vec<ProviderPlan> {
		let requested = options.token.key();
		let mut plans = Vec::new();

		for adapter in self.providers.iter() {
			let meta = adapter.meta();
			if !options.allows_provider(meta) {
				continue;
			}
			let tokens: Vec<&SupportedToken> = supported
				.iter()
				.filter(|s| s.provider_key == meta.key)
				.collect();

			if tokens.iter().any(|s| s.token.key() == requested) {
				plans.push(ProviderPlan {
					adapter: adapter.clone(),
					options: options.clone(),
					swap: None,
				});
				continue;
			}

			let best_swap = tokens
				.iter()
				.filter_map(|s| swaps.get(&s.token.key()).map(|swap| (*s, swap)))
				.max_by(|(_, a), (_, b)| {
					a.net_output_ratio()
						.partial_cmp(&b.net_output_ratio())
						.unwrap_or(Ordering::Equal)
				});

			let Some((via, swap)) = best_swap else {
				debug!(provider = %meta.key, "No direct or swap route, skipping");
				continue;
			};
			match options.for_token(via.token.clone()) {
				Ok(via_options) => {
					debug!(
						provider = %meta.key,
						"Quoting {} and swapping into {}",
						via.token.symbol,
						options.token.symbol
					);
					plans.push(ProviderPlan {
						adapter: adapter.clone(),
						options: via_options,
						swap: Some(swap.clone()),
					});
				},
				Err(e) => warn!(provider = %meta.key, "Cannot quote via {}: {}", via.token.symbol, e),
			}
		}
		plans
	}

	/// Apply the swap leg and payment-method filter to one provider's answer
	fn finish(
		&self,
		options: &QuoteOptions,
		plan: ProviderPlan,
		quotes: Vec<PaymentMethodQuote>,
	) -> Option<ProviderQuote> {
		let provider = plan.adapter.meta().clone();
		let payment_methods: Vec<PaymentMethodQuote> = quotes
			.into_iter()
			.filter_map(|mut quote| {
				if let Some(swap) = &plan.swap {
					if let Err(e) = apply_swap_leg(&mut quote, swap, &options.token) {
						warn!(provider = %provider.key, "Dropping quote, swap leg failed: {}", e);
						return None;
					}
				}
				quote
					.payment_methods
					.retain(|method| options.allows_payment_method(method));
				(!quote.payment_methods.is_empty()).then_some(quote)
			})
			.collect();

		if payment_methods.is_empty() {
			debug!(provider = %provider.key, "No matching payment methods");
			return None;
		}
		Some(ProviderQuote {
			provider,
			payment_methods,
		})
	}
}

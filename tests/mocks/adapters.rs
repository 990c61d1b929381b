//! Scripted provider adapter
//!
//! Quotes, order statuses and sync results are fixed up front; every call is counted so tests
//! can assert which provider was contacted and how often.

#![allow(dead_code)]

use async_trait::async_trait;
use onramp_aggregator::models::{
	find_supported_chain, CatalogStorage, OrderStatus, OrderStatusRecord, PayDetails,
	PaymentMethod, PaymentMethodQuote, ProviderAdapter, ProviderError, ProviderMeta,
	ProviderResult, ProviderType, QuoteOptions, QuoteStep, ReceiveDetails, RouteType,
	SyncReport, Token, TokenKey,
};
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum QuoteBehavior {
	/// Deliver `fiat_amount - fee` worth of the asked token
	Price {
		fee: f64,
		methods: Vec<PaymentMethod>,
	},
	Fail,
	/// Answer only after an hour
	Hang,
}

pub struct ScriptedAdapter {
	meta: ProviderMeta,
	catalog: Arc<dyn CatalogStorage>,
	tokens: Vec<TokenKey>,
	behavior: QuoteBehavior,
	fail_sync: bool,
	statuses: Mutex<VecDeque<OrderStatus>>,
	sync_calls: AtomicUsize,
	quote_calls: AtomicUsize,
	status_calls: AtomicUsize,
	quoted_symbols: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
	pub fn new(key: &str, catalog: Arc<dyn CatalogStorage>) -> Self {
		Self {
			meta: ProviderMeta::new(key, ProviderType::Onramp, format!("{} Pay", key), ""),
			catalog,
			tokens: Vec::new(),
			behavior: QuoteBehavior::Price {
				fee: 1.0,
				methods: vec![PaymentMethod::CreditCard],
			},
			fail_sync: false,
			statuses: Mutex::new(VecDeque::new()),
			sync_calls: AtomicUsize::new(0),
			quote_calls: AtomicUsize::new(0),
			status_calls: AtomicUsize::new(0),
			quoted_symbols: Mutex::new(Vec::new()),
		}
	}

	/// Tokens reported as directly deliverable on sync
	pub fn delivering(mut self, tokens: &[&Token]) -> Self {
		self.tokens = tokens.iter().map(|t| t.key()).collect();
		self
	}

	pub fn pricing(mut self, fee: f64, methods: Vec<PaymentMethod>) -> Self {
		self.behavior = QuoteBehavior::Price { fee, methods };
		self
	}

	pub fn failing(mut self) -> Self {
		self.behavior = QuoteBehavior::Fail;
		self
	}

	pub fn hanging(mut self) -> Self {
		self.behavior = QuoteBehavior::Hang;
		self
	}

	pub fn failing_sync(mut self) -> Self {
		self.fail_sync = true;
		self
	}

	/// Order statuses returned in sequence; the last one repeats
	pub fn with_statuses(self, statuses: Vec<OrderStatus>) -> Self {
		*self.statuses.lock().unwrap() = statuses.into();
		self
	}

	pub fn key(&self) -> &str {
		&self.meta.key
	}

	pub fn sync_calls(&self) -> usize {
		self.sync_calls.load(Ordering::SeqCst)
	}

	pub fn quote_calls(&self) -> usize {
		self.quote_calls.load(Ordering::SeqCst)
	}

	pub fn status_calls(&self) -> usize {
		self.status_calls.load(Ordering::SeqCst)
	}

	pub fn quoted_symbols(&self) -> Vec<String> {
		self.quoted_symbols.lock().unwrap().clone()
	}
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
	fn meta(&self) -> &ProviderMeta {
		&self.meta
	}

	async fn sync_routes(&self) -> ProviderResult<SyncReport> {
		self.sync_calls.fetch_add(1, Ordering::SeqCst);
		if self.fail_sync {
			return Err(ProviderError::HttpStatus {
				status_code: 503,
				reason: "maintenance".to_string(),
			});
		}

		let desired: BTreeSet<TokenKey> = self.tokens.iter().cloned().collect();
		Ok(SyncReport {
			tokens: self
				.catalog
				.reconcile_supported_tokens(&self.meta.key, RouteType::Buy, desired)
				.await?,
			..Default::default()
		})
	}

	async fn get_quote(&self, options: &QuoteOptions) -> ProviderResult<Vec<PaymentMethodQuote>> {
		self.quote_calls.fetch_add(1, Ordering::SeqCst);
		self.quoted_symbols
			.lock()
			.unwrap()
			.push(options.token.symbol.clone());

		let (fee, methods) = match &self.behavior {
			QuoteBehavior::Price { fee, methods } => (*fee, methods.clone()),
			QuoteBehavior::Fail => {
				return Err(ProviderError::Rejected {
					provider: self.meta.key.clone(),
					message: "scripted failure".to_string(),
				})
			},
			QuoteBehavior::Hang => {
				tokio::time::sleep(Duration::from_secs(3600)).await;
				return Ok(Vec::new());
			},
		};

		let chain = find_supported_chain(options.chain_id).ok_or_else(|| {
			ProviderError::ChainNotSupported {
				provider: self.meta.key.clone(),
				chain_id: options.chain_id,
			}
		})?;
		let receive_fiat = options.fiat_amount - fee;
		let amount_units = options
			.token
			.units_for_fiat(receive_fiat)
			.map_err(|e| ProviderError::invalid_response(&self.meta.key, e.to_string()))?;

		Ok(vec![PaymentMethodQuote {
			route_type: options.route_type,
			pay: PayDetails {
				currency: options.fiat_currency,
				fiat_amount: options.fiat_amount,
				total_fee_fiat: fee,
				min_amount_fiat: None,
				max_amount_fiat: None,
			},
			receive: ReceiveDetails {
				to: options.to.clone(),
				token: options.token.clone(),
				chain,
				amount_units,
				amount_fiat: receive_fiat,
			},
			steps: vec![QuoteStep::PayViaExternalLink {
				link: format!("https://pay.example/{}", self.meta.key),
			}],
			payment_methods: methods,
			kyc: Vec::new(),
			country: options.country.clone(),
		}])
	}

	async fn get_order_status(&self, order_id: &str, _dev: bool) -> ProviderResult<OrderStatusRecord> {
		self.status_calls.fetch_add(1, Ordering::SeqCst);
		let status = {
			let mut statuses = self.statuses.lock().unwrap();
			if statuses.len() > 1 {
				statuses.pop_front()
			} else {
				statuses.front().copied()
			}
		};

		let status = status.ok_or_else(|| ProviderError::OrderNotFound {
			provider: self.meta.key.clone(),
			order_id: order_id.to_string(),
		})?;
		let mut record = OrderStatusRecord::new(status);
		if status == OrderStatus::Completed {
			record.crypto_amount = Some(49.0);
			record.crypto_currency = "USDC".to_string();
		}
		Ok(record)
	}
}

//! On-ramp Aggregator Library
//!
//! Quote routing and execution engine for fiat-to-token on-ramp providers: fee-normalized quotes
//! across providers, swap legs for tokens a provider cannot deliver, and resumable execution of
//! the chosen quote.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

// Core domain types
pub use onramp_types::{
	chrono, serde_json, Executable, ExecutionError, ExecutionSettings, ExecutionStatus,
	OrderStatus, OrderStatusError, OrderStatusRecord, PaymentMethod, PaymentMethodQuote,
	ProviderAdapter, ProviderError, ProviderMeta, ProviderQuote, QuoteError, QuoteRequest,
	QuoteResponse, QuoteStep, Route, RouteStatus, SwapExecutionService, SwapRouteResolver, Token,
	TokenAmount, UnexecutedRoute,
};

// Service layer
pub use onramp_service::{
	AggregatorConfig, CatalogService, ChannelPaymentFlow, ConfigResponse, ExecutionCoordinator,
	ExecutionHandle, ExecutionOverrides, ExecutionStateStore, ExecutorRegistry, OrderStatusService,
	PaymentFlow, PaymentFlowOutcome, PaymentFlowRequest, PendingPayment, PollConfig,
	QuoteAggregator, ReadinessGate, SyncManager,
};

// Storage layer
pub use onramp_storage::{MemoryStore, Storage};

// Adapters
pub use onramp_adapters::{
	KadoAdapter, KadoConfig, LifiConfig, LifiSwapResolver, ProviderRegistry, TransakAdapter,
	TransakConfig, TransakCredentials,
};

// Config
pub use onramp_config::{load_config, log_service_info, log_startup_complete, Settings};

pub mod models {
	pub use onramp_types::*;
}

pub mod service {
	pub use onramp_service::*;
}

pub mod adapters {
	pub use onramp_adapters::*;
}

pub mod config {
	pub use onramp_config::*;
}

use onramp_config::{ConfigValidationError, ConfigurableValueError, LogFormat};
use onramp_service::{ProviderSyncTask, SyncWorkerConfig, TokenCatalogSyncTask};
use onramp_types::{CatalogStorage, StorageError};

/// Pending payment requests buffered for the host before `open` blocks
const PAYMENT_REQUEST_BUFFER: usize = 16;

#[derive(Debug, Error)]
pub enum BuildError {
	#[error("Invalid configuration: {0}")]
	Config(#[from] ConfigValidationError),
	#[error("Failed to resolve credential: {0}")]
	Credential(#[from] ConfigurableValueError),
	#[error("Failed to seed catalog: {0}")]
	Catalog(#[from] StorageError),
	#[error("Provider {provider} is enabled without credentials")]
	MissingCredential { provider: &'static str },
}

/// Builder wiring the catalog, provider adapters, swap services and execution engine together
pub struct OnrampBuilder {
	settings: Settings,
	catalog: Option<Arc<dyn CatalogStorage>>,
	adapters: Vec<Arc<dyn ProviderAdapter>>,
	swap_resolver: Option<Arc<dyn SwapRouteResolver>>,
	swap_service: Option<Arc<dyn SwapExecutionService>>,
	payment_flow: Option<Arc<dyn PaymentFlow>>,
}

impl Default for OnrampBuilder {
	fn default() -> Self {
		Self::new(Settings::default())
	}
}

impl OnrampBuilder {
	pub fn new(settings: Settings) -> Self {
		Self {
			settings,
			catalog: None,
			adapters: Vec::new(),
			swap_resolver: None,
			swap_service: None,
			payment_flow: None,
		}
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Use `catalog` instead of a fresh [`MemoryStore`]
	pub fn with_catalog(mut self, catalog: Arc<dyn CatalogStorage>) -> Self {
		self.catalog = Some(catalog);
		self
	}

	/// Register a provider adapter on top of the ones enabled in settings.
	///
	/// An adapter with the key of a configured provider replaces it.
	pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
		self.adapters.push(adapter);
		self
	}

	/// Replace the configured swap route resolver
	pub fn with_swap_resolver(mut self, resolver: Arc<dyn SwapRouteResolver>) -> Self {
		self.swap_resolver = Some(resolver);
		self
	}

	/// Service that executes swap legs. Without one, routes with a swap step cannot run.
	pub fn with_swap_service(mut self, service: Arc<dyn SwapExecutionService>) -> Self {
		self.swap_service = Some(service);
		self
	}

	/// Host-side payment flow. Without one, requests are delivered through
	/// [`OnrampApp::take_payment_requests`].
	pub fn with_payment_flow(mut self, flow: Arc<dyn PaymentFlow>) -> Self {
		self.payment_flow = Some(flow);
		self
	}

	/// Validate settings, seed the catalog and assemble every service
	pub async fn build(self) -> Result<OnrampApp, BuildError> {
		let settings = self.settings;
		settings.validate()?;

		let catalog: Arc<dyn CatalogStorage> = self
			.catalog
			.unwrap_or_else(|| Arc::new(MemoryStore::new()));

		// Provider syncs only keep tokens the catalog knows, so seed it before they first run
		let tokens = settings.catalog_tokens();
		for token in &tokens {
			catalog.upsert_token(token.clone()).await?;
		}
		info!("Seeded catalog with {} tokens", tokens.len());

		let mut registry = ProviderRegistry::new();
		for adapter in configured_adapters(&settings, &catalog)? {
			registry.register(adapter);
		}
		for adapter in self.adapters {
			registry.register(adapter);
		}
		let providers = Arc::new(registry);
		info!("Registered providers: {}", providers.keys().join(", "));

		let swap_resolver = match self.swap_resolver {
			Some(resolver) => Some(resolver),
			None if settings.swap.enabled => {
				Some(Arc::new(LifiSwapResolver::new(lifi_config(&settings)?))
					as Arc<dyn SwapRouteResolver>)
			},
			None => None,
		};

		let gate = ReadinessGate::new();
		let mut sync = SyncManager::new(gate.clone());
		let worker_config = SyncWorkerConfig {
			resync_delay: Duration::from_secs(settings.sync.resync_delay_secs),
			on_fail_retry: Duration::from_secs(settings.sync.on_fail_retry_secs),
		};
		sync.add_task(
			Arc::new(TokenCatalogSyncTask::new(catalog.clone(), tokens)),
			catalog.clone(),
			worker_config,
		);
		for adapter in providers.iter() {
			sync.add_task(
				Arc::new(ProviderSyncTask::new(adapter.clone())),
				catalog.clone(),
				worker_config,
			);
		}

		let mut aggregator = QuoteAggregator::new(
			catalog.clone(),
			providers.clone(),
			gate.clone(),
			AggregatorConfig {
				per_provider_timeout: settings.per_provider_timeout(),
				dev_swap_notional_usd: settings.aggregation.dev_swap_notional_usd,
				readiness_timeout: settings.readiness_timeout(),
			},
		);
		if let Some(resolver) = swap_resolver {
			aggregator = aggregator.with_swap_resolver(resolver);
		}

		let (payment_flow, payment_requests) = match self.payment_flow {
			Some(flow) => (flow, None),
			None => {
				let (flow, requests) = ChannelPaymentFlow::new(PAYMENT_REQUEST_BUFFER);
				(Arc::new(flow) as Arc<dyn PaymentFlow>, Some(requests))
			},
		};

		let poll = PollConfig {
			interval: Duration::from_millis(settings.execution.status_poll_interval_ms),
			timeout: settings
				.execution
				.status_poll_timeout_ms
				.map(Duration::from_millis),
		};
		let executors = ExecutorRegistry::for_providers(
			&providers,
			payment_flow,
			self.swap_service.clone(),
			poll,
		);
		let mut coordinator =
			ExecutionCoordinator::new(ExecutionStateStore::new(), Arc::new(executors))
				.with_dev(settings.execution.dev);
		match self.swap_service {
			Some(service) => coordinator = coordinator.with_swap_service(service),
			None => warn!("No swap execution service configured, swap legs cannot be executed"),
		}

		Ok(OnrampApp {
			catalog_service: CatalogService::new(catalog.clone(), providers.clone()),
			order_status: OrderStatusService::new(providers.clone()),
			aggregator: Arc::new(aggregator),
			coordinator,
			providers,
			catalog,
			sync,
			payment_requests,
			settings,
		})
	}
}

fn configured_adapters(
	settings: &Settings,
	catalog: &Arc<dyn CatalogStorage>,
) -> Result<Vec<Arc<dyn ProviderAdapter>>, BuildError> {
	let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

	let transak = &settings.providers.transak;
	if transak.enabled {
		let api_key = Settings::resolve_secret(transak.api_key.as_ref())?
			.ok_or(BuildError::MissingCredential { provider: "transak" })?;
		let staging = match Settings::resolve_secret(transak.staging_api_key.as_ref())? {
			Some(api_key) => Some(TransakCredentials {
				api_key,
				secret_key: Settings::resolve_secret(transak.staging_secret_key.as_ref())?,
			}),
			None => None,
		};
		let config = TransakConfig {
			production: TransakCredentials {
				api_key,
				secret_key: Settings::resolve_secret(transak.secret_key.as_ref())?,
			},
			staging,
			api_base_url: transak.base_url.clone(),
			request_timeout_ms: settings.timeouts.request_ms,
		};
		adapters.push(Arc::new(TransakAdapter::new(config, catalog.clone())));
	}

	let kado = &settings.providers.kado;
	if kado.enabled {
		let config = KadoConfig {
			api_key: Settings::resolve_secret(kado.api_key.as_ref())?,
			api_base_url: kado.base_url.clone(),
			request_timeout_ms: settings.timeouts.request_ms,
		};
		adapters.push(Arc::new(KadoAdapter::new(config, catalog.clone())));
	}

	Ok(adapters)
}

fn lifi_config(settings: &Settings) -> Result<LifiConfig, BuildError> {
	Ok(LifiConfig {
		base_url: settings.swap.base_url.clone(),
		integrator: settings.swap.integrator.clone(),
		api_key: Settings::resolve_secret(settings.swap.api_key.as_ref())?,
		dev_fixed_quote: settings.swap.dev_fixed_quote,
		quote_ttl: Duration::from_secs(settings.aggregation.swap_quote_ttl_secs),
		request_timeout_ms: settings.timeouts.request_ms,
	})
}

/// Assembled engine. Quotes are served once [`OnrampApp::start_sync`] completed its first cycle.
pub struct OnrampApp {
	pub settings: Settings,
	pub catalog: Arc<dyn CatalogStorage>,
	pub providers: Arc<ProviderRegistry>,
	pub aggregator: Arc<QuoteAggregator>,
	pub coordinator: ExecutionCoordinator,
	pub order_status: OrderStatusService,
	pub catalog_service: CatalogService,
	sync: SyncManager,
	payment_requests: Option<mpsc::Receiver<PendingPayment>>,
}

impl OnrampApp {
	/// Spawn the provider and catalog sync workers
	pub fn start_sync(&mut self) {
		self.sync.start();
	}

	pub fn readiness(&self) -> ReadinessGate {
		self.sync.gate().clone()
	}

	/// Wait for the first sync cycle of every worker
	pub async fn wait_until_ready(&self) -> Result<(), QuoteError> {
		self.sync
			.gate()
			.wait(self.settings.readiness_timeout())
			.await
			.map_err(|e| QuoteError::NotReady {
				reason: e.to_string(),
			})
	}

	/// Payment requests for the host to present, when no payment flow was injected.
	///
	/// Returns `None` on every call after the first.
	pub fn take_payment_requests(&mut self) -> Option<mpsc::Receiver<PendingPayment>> {
		self.payment_requests.take()
	}

	/// Stop the sync workers
	pub async fn shutdown(self) {
		let active = self.coordinator.active_route_ids();
		if !active.is_empty() {
			warn!("Shutting down with {} routes still executing", active.len());
		}
		self.sync.shutdown().await;
	}
}

/// Initialize tracing from logging settings, with `RUST_LOG` taking precedence
pub fn init_tracing_from_settings(settings: &Settings) {
	let log_level = &settings.logging.level;
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	match settings.logging.format {
		LogFormat::Json => {
			let subscriber = tracing_subscriber::fmt().json().with_env_filter(env_filter);
			if settings.logging.structured {
				subscriber.with_target(true).with_thread_ids(true).init();
			} else {
				subscriber.init();
			}
		},
		LogFormat::Pretty => {
			let subscriber = tracing_subscriber::fmt()
				.pretty()
				.with_env_filter(env_filter);
			if settings.logging.structured {
				subscriber.with_target(true).with_thread_ids(true).init();
			} else {
				subscriber.init();
			}
		},
		LogFormat::Compact => {
			let subscriber = tracing_subscriber::fmt()
				.compact()
				.with_env_filter(env_filter);
			if settings.logging.structured {
				subscriber.with_target(true).with_thread_ids(true).init();
			} else {
				subscriber.init();
			}
		},
	}

	info!(
		"Logging configuration applied: level={}, format={:?}, structured={}",
		settings.logging.level, settings.logging.format, settings.logging.structured
	);
}

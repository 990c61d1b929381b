//! Step executors and the dispatch table that picks them

pub mod external_link;
pub mod token_swap;

pub use external_link::{ExternalLinkExecutor, PollConfig};
pub use token_swap::{swap_error_message, TokenSwapExecutor};

use async_trait::async_trait;
use onramp_adapters::ProviderRegistry;
use onramp_types::{ExecutionError, ExecutionResult, StepKind, SwapExecutionService};
use std::collections::HashMap;
use std::sync::Arc;

use super::context::{StepContext, StepOutcome};
use super::payment_flow::PaymentFlow;

/// Drives one kind of step to DONE, or to a point where it can be resumed later.
///
/// Errors are never swallowed: a returned error aborts the route.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait StepExecutor: Send + Sync {
	async fn execute(&self, ctx: &StepContext) -> ExecutionResult<StepOutcome>;
}

/// Executors keyed by (provider key, step kind)
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
	executors: HashMap<(String, StepKind), Arc<dyn StepExecutor>>,
}

impl ExecutorRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// One external-link executor per provider, plus the swap executor for every provider
	/// when a swap service is available
	pub fn for_providers(
		providers: &ProviderRegistry,
		payment_flow: Arc<dyn PaymentFlow>,
		swap_service: Option<Arc<dyn SwapExecutionService>>,
		poll: PollConfig,
	) -> Self {
		let mut registry = Self::new();
		let swap_executor: Option<Arc<dyn StepExecutor>> = swap_service
			.map(|service| Arc::new(TokenSwapExecutor::new(service)) as Arc<dyn StepExecutor>);

		for adapter in providers.iter() {
			let key = adapter.meta().key.clone();
			registry.register(
				&key,
				StepKind::PayViaExternalLink,
				Arc::new(ExternalLinkExecutor::new(
					adapter.clone(),
					payment_flow.clone(),
					poll,
				)),
			);
			if let Some(executor) = &swap_executor {
				registry.register(&key, StepKind::TokenSwap, executor.clone());
			}
		}
		registry
	}

	pub fn register(&mut self, provider_key: &str, kind: StepKind, executor: Arc<dyn StepExecutor>) {
		self.executors
			.insert((provider_key.to_string(), kind), executor);
	}

	pub fn resolve(&self, provider_key: &str, kind: StepKind) -> ExecutionResult<Arc<dyn StepExecutor>> {
		self.executors
			.get(&(provider_key.to_string(), kind))
			.cloned()
			.ok_or_else(|| ExecutionError::ExecutorNotFound {
				provider: provider_key.to_string(),
				step_kind: kind.to_string(),
			})
	}

	pub fn len(&self) -> usize {
		self.executors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.executors.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::execution::payment_flow::MockPaymentFlow;
	use onramp_types::{MockProviderAdapter, MockSwapExecutionService, ProviderMeta, ProviderType};

	fn adapter(key: &str) -> Arc<MockProviderAdapter> {
		let mut mock = MockProviderAdapter::new();
		mock.expect_meta()
			.return_const(ProviderMeta::new(key, ProviderType::Onramp, key, ""));
		Arc::new(mock)
	}

	#[test]
	fn test_for_providers_registers_both_kinds() {
		let providers = ProviderRegistry::new()
			.with(adapter("transak"))
			.with(adapter("kado"));
		let registry = ExecutorRegistry::for_providers(
			&providers,
			Arc::new(MockPaymentFlow::new()),
			Some(Arc::new(MockSwapExecutionService::new())),
			PollConfig::default(),
		);

		assert_eq!(registry.len(), 4);
		assert!(registry.resolve("kado", StepKind::TokenSwap).is_ok());
		assert!(matches!(
			registry.resolve("moonpay", StepKind::PayViaExternalLink),
			Err(ExecutionError::ExecutorNotFound { .. })
		));
	}

	#[test]
	fn test_no_swap_executor_without_service() {
		let providers = ProviderRegistry::new().with(adapter("kado"));
		let registry = ExecutorRegistry::for_providers(
			&providers,
			Arc::new(MockPaymentFlow::new()),
			None,
			PollConfig::default(),
		);
		assert!(registry.resolve("kado", StepKind::PayViaExternalLink).is_ok());
		assert!(registry.resolve("kado", StepKind::TokenSwap).is_err());
	}
}

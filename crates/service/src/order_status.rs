//! Order status service
//!
//! Passes order lookups through to the provider that created the order.

use onramp_adapters::ProviderRegistry;
use onramp_types::{OrderStatusError, OrderStatusRecord, ProviderError};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct OrderStatusService {
	providers: Arc<ProviderRegistry>,
}

impl OrderStatusService {
	pub fn new(providers: Arc<ProviderRegistry>) -> Self {
		Self { providers }
	}

	pub async fn get_order_status(
		&self,
		provider_key: &str,
		order_id: &str,
		dev: bool,
	) -> Result<OrderStatusRecord, OrderStatusError> {
		let adapter =
			self.providers
				.get(provider_key)
				.ok_or_else(|| OrderStatusError::ProviderNotFound {
					provider: provider_key.to_string(),
				})?;

		debug!(provider = %provider_key, order_id = %order_id, "Looking up order status");
		adapter
			.get_order_status(order_id, dev)
			.await
			.map_err(|e| match e {
				ProviderError::OrderNotFound { provider, order_id } => {
					OrderStatusError::NotFound { provider, order_id }
				},
				ProviderError::UnsupportedOperation { provider, .. } => {
					OrderStatusError::Unsupported { provider }
				},
				other => OrderStatusError::Provider(other),
			})
	}
}

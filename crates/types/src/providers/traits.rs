//! Provider adapter contract

use async_trait::async_trait;

use super::{ProviderError, ProviderMeta, ProviderResult, SyncReport};
use crate::orders::OrderStatusRecord;
use crate::quotes::{PaymentMethodQuote, QuoteOptions};

/// One implementation per on-ramp provider.
///
/// Adapters own a handle to the catalog so that `sync_routes` can reconcile the provider's
/// supported tokens, countries and KYC levels in place.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
	fn meta(&self) -> &ProviderMeta;

	/// Reconcile the catalog with the provider: add missing entries, drop stale ones
	async fn sync_routes(&self) -> ProviderResult<SyncReport>;

	/// Price `options` with every payment method the provider offers.
	///
	/// `options.token` is always a token this provider delivers directly. An empty result means
	/// the provider has nothing to offer for this request.
	async fn get_quote(&self, options: &QuoteOptions) -> ProviderResult<Vec<PaymentMethodQuote>>;

	/// Look up an order created through this provider's payment flow
	async fn get_order_status(&self, order_id: &str, dev: bool) -> ProviderResult<OrderStatusRecord> {
		let _ = (order_id, dev);
		Err(ProviderError::UnsupportedOperation {
			operation: "get_order_status".to_string(),
			provider: self.meta().key.clone(),
		})
	}
}

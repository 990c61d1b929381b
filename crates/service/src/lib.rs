//! On-ramp Service
//!
//! Quote aggregation, route execution and the background sync that keeps the catalog fresh.

pub mod aggregator;
pub mod catalog;
pub mod execution;
pub mod order_status;
pub mod sync;

pub use aggregator::{apply_swap_leg, AggregatorConfig, QuoteAggregator};
pub use catalog::{CatalogService, ConfigResponse, ProviderConfig};
pub use execution::{
	ChannelPaymentFlow, ExecutionCoordinator, ExecutionHandle, ExecutionOverrides,
	ExecutionStateStore, ExecutorRegistry, PaymentFlow, PaymentFlowOutcome, PaymentFlowRequest,
	PendingPayment, PollConfig, StepContext, StepExecutor, StepOutcome,
};
pub use order_status::OrderStatusService;
pub use sync::{
	ProviderSyncTask, ReadinessGate, SyncError, SyncManager, SyncResult, SyncTask,
	SyncWorkerConfig, TokenCatalogSyncTask,
};

#[cfg(any(test, feature = "mocks"))]
pub use execution::{MockPaymentFlow, MockStepExecutor};
#[cfg(any(test, feature = "mocks"))]
pub use sync::MockSyncTask;

//! Route execution: state store, coordinator and step executors

pub mod context;
pub mod coordinator;
pub mod executors;
pub mod payment_flow;
pub mod store;

pub use context::{StepContext, StepOutcome};
pub use coordinator::{ExecutionCoordinator, ExecutionOverrides};
pub use executors::{
	swap_error_message, ExecutorRegistry, ExternalLinkExecutor, PollConfig, StepExecutor,
	TokenSwapExecutor,
};
pub use payment_flow::{
	ChannelPaymentFlow, PaymentFlow, PaymentFlowOutcome, PaymentFlowRequest, PendingPayment,
};
pub use store::{ExecutionHandle, ExecutionStateStore, Registration, UpdateHook};

#[cfg(any(test, feature = "mocks"))]
pub use executors::MockStepExecutor;
#[cfg(any(test, feature = "mocks"))]
pub use payment_flow::MockPaymentFlow;

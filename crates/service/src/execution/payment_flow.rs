//! User-facing payment flows
//!
//! Opening a provider's payment page is up to the host application. The engine only hands over
//! the link and waits for the outcome.

use async_trait::async_trait;
use onramp_types::ProviderMeta;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentFlowRequest {
	pub route_id: String,
	pub step_id: String,
	pub provider: ProviderMeta,
	pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentFlowOutcome {
	/// The user paid and the provider assigned an order
	Completed { order_id: String },
	/// The user closed the payment window
	Closed,
	FailedToOpen { reason: String },
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait PaymentFlow: Send + Sync {
	/// Show the payment page and resolve once the user is done with it
	async fn open(&self, request: PaymentFlowRequest) -> PaymentFlowOutcome;
}

/// A payment request waiting for the host to answer it
#[derive(Debug)]
pub struct PendingPayment {
	pub request: PaymentFlowRequest,
	reply: oneshot::Sender<PaymentFlowOutcome>,
}

impl PendingPayment {
	pub fn respond(self, outcome: PaymentFlowOutcome) {
		if self.reply.send(outcome).is_err() {
			warn!(
				route_id = %self.request.route_id,
				"Payment outcome arrived after the step stopped waiting"
			);
		}
	}
}

/// Forwards payment requests to the host over a channel
#[derive(Debug, Clone)]
pub struct ChannelPaymentFlow {
	sender: mpsc::Sender<PendingPayment>,
}

impl ChannelPaymentFlow {
	pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PendingPayment>) {
		let (sender, receiver) = mpsc::channel(buffer);
		(Self { sender }, receiver)
	}
}

#[async_trait]
impl PaymentFlow for ChannelPaymentFlow {
	async fn open(&self, request: PaymentFlowRequest) -> PaymentFlowOutcome {
		let (reply, outcome) = oneshot::channel();
		if self
			.sender
			.send(PendingPayment { request, reply })
			.await
			.is_err()
		{
			return PaymentFlowOutcome::FailedToOpen {
				reason: "no payment flow host is listening".to_string(),
			};
		}

		outcome
			.await
			.unwrap_or_else(|_| PaymentFlowOutcome::FailedToOpen {
				reason: "payment flow host dropped the request".to_string(),
			})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use onramp_types::ProviderType;

	fn request() -> PaymentFlowRequest {
		PaymentFlowRequest {
			route_id: "r1".to_string(),
			step_id: "r1:0".to_string(),
			provider: ProviderMeta::new("kado", ProviderType::Onramp, "Kado", ""),
			link: "https://app.kado.money/?onPayAmount=100".to_string(),
		}
	}

	#[tokio::test]
	async fn test_channel_flow_round_trip() {
		let (flow, mut host) = ChannelPaymentFlow::new(1);
		tokio::spawn(async move {
			let pending = host.recv().await.unwrap();
			assert_eq!(pending.request.step_id, "r1:0");
			pending.respond(PaymentFlowOutcome::Completed {
				order_id: "ord-1".to_string(),
			});
		});

		assert_eq!(
			flow.open(request()).await,
			PaymentFlowOutcome::Completed {
				order_id: "ord-1".to_string()
			}
		);
	}

	#[tokio::test]
	async fn test_channel_flow_without_host_fails_to_open() {
		let (flow, host) = ChannelPaymentFlow::new(1);
		drop(host);
		assert!(matches!(
			flow.open(request()).await,
			PaymentFlowOutcome::FailedToOpen { .. }
		));
	}
}

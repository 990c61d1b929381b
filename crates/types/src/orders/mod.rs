//! Provider-neutral order status records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::{ProviderError, RouteType};

/// Canonical order lifecycle that provider-specific codes are translated into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Order created, payment not received yet
	AwaitingPaymentFromUser,
	/// User says they paid, provider has not confirmed
	PaymentDoneMarkedByUser,
	/// Payment validated
	Processing,
	/// Payment received, crypto being delivered
	PendingDelivery,
	OnHoldPendingDelivery,
	Completed,
	Cancelled,
	/// e.g. card declined
	Failed,
	Refunded,
	/// User did not pay in time
	Expired,
}

impl OrderStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderStatus::Completed
				| OrderStatus::Cancelled
				| OrderStatus::Failed
				| OrderStatus::Refunded
				| OrderStatus::Expired
		)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusRecord {
	pub status: OrderStatus,
	/// Only set when the order failed
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status_message: Option<String>,
	pub is_buy_or_sell: RouteType,
	pub fiat_currency: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fiat_amount: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount_paid: Option<f64>,
	pub crypto_currency: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub crypto_amount: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub conversion_price: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub total_fee_in_fiat: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub network: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub auto_expires_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub completed_at: Option<DateTime<Utc>>,
}

impl OrderStatusRecord {
	/// Record with only the status filled in
	pub fn new(status: OrderStatus) -> Self {
		Self {
			status,
			status_message: None,
			is_buy_or_sell: RouteType::Buy,
			fiat_currency: String::new(),
			fiat_amount: None,
			amount_paid: None,
			crypto_currency: String::new(),
			crypto_amount: None,
			conversion_price: None,
			total_fee_in_fiat: None,
			network: None,
			auto_expires_at: None,
			created_at: None,
			completed_at: None,
		}
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.status_message = Some(message.into());
		self
	}
}

#[derive(Error, Debug)]
pub enum OrderStatusError {
	#[error("Provider not found: {provider}")]
	ProviderNotFound { provider: String },

	#[error("Order {order_id} not found on {provider}")]
	NotFound { provider: String, order_id: String },

	#[error("Provider {provider} does not expose order status")]
	Unsupported { provider: String },

	#[error("Provider error: {0}")]
	Provider(#[from] ProviderError),
}

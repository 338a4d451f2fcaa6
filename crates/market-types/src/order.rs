//! Order types for the marketplace system.
//!
//! This module defines the order entity and its status machine. Orders are
//! only ever mutated through the lifecycle engine; the status values here
//! match the wire values used by the storefront and admin console.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TransactionVerification;

/// Unique order identifier.
pub type OrderId = u64;

/// Unique user identifier, pre-resolved by upstream authentication.
pub type UserId = u64;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Order has been placed, no payment reported yet.
	Created,
	/// Buyer reported an off-chain or not-yet-verified payment.
	PaidReported,
	/// A reported transaction was verified on chain.
	PaymentVerified,
	/// Seller acknowledged the payment.
	Confirmed,
	/// Delivery content is released to the buyer.
	Completed,
	/// Order was cancelled by buyer or seller.
	Cancelled,
	/// A refund request is pending; normal completion is on hold.
	RefundRequested,
	/// Order has been refunded.
	Refunded,
}

impl OrderStatus {
	/// Terminal states permit no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Completed | Self::Cancelled | Self::Refunded)
	}

	/// States from which either party may still cancel.
	///
	/// `RefundRequested` is deliberately excluded: it is a hold state owned
	/// by the refund workflow.
	pub fn is_cancellable(&self) -> bool {
		matches!(
			self,
			Self::Created | Self::PaidReported | Self::PaymentVerified | Self::Confirmed
		)
	}

	/// States in which the buyer may open a refund request.
	pub fn is_refundable(&self) -> bool {
		matches!(
			self,
			Self::Confirmed | Self::Completed | Self::PaymentVerified
		)
	}

	/// States in which a reported payment may be (re-)verified or confirmed.
	pub fn is_payment_reported(&self) -> bool {
		matches!(self, Self::PaidReported | Self::PaymentVerified)
	}
}

impl std::fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Created => "created",
			Self::PaidReported => "paid_reported",
			Self::PaymentVerified => "payment_verified",
			Self::Confirmed => "confirmed",
			Self::Completed => "completed",
			Self::Cancelled => "cancelled",
			Self::RefundRequested => "refund_requested",
			Self::Refunded => "refunded",
		};
		write!(f, "{}", s)
	}
}

/// One buyer/seller/product transaction.
///
/// `amount_usd` is snapshotted from the product at creation and never updated
/// afterwards, so later price edits do not affect open orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	pub id: OrderId,
	pub buyer_id: UserId,
	pub seller_id: UserId,
	pub product_id: u64,
	pub amount_usd: Decimal,
	pub status: OrderStatus,
	/// Transaction hash reported by the buyer, if any.
	pub transaction_hash: Option<String>,
	/// Network the reported transaction was sent on, if any.
	pub payment_network: Option<String>,
	/// Whether the reported transaction passed chain verification.
	pub payment_verified: bool,
	/// Last verification outcome, successful or not.
	pub verification_details: Option<TransactionVerification>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Delivery payload returned to the buyer of a completed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryContent {
	pub delivery_type: crate::DeliveryType,
	pub delivery_content: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn terminal_states() {
		assert!(OrderStatus::Completed.is_terminal());
		assert!(OrderStatus::Cancelled.is_terminal());
		assert!(OrderStatus::Refunded.is_terminal());
		assert!(!OrderStatus::RefundRequested.is_terminal());
		assert!(!OrderStatus::Created.is_terminal());
	}

	#[test]
	fn refund_hold_is_not_cancellable() {
		assert!(!OrderStatus::RefundRequested.is_cancellable());
		assert!(OrderStatus::Confirmed.is_cancellable());
	}

	#[test]
	fn status_serializes_to_wire_values() {
		let json = serde_json::to_string(&OrderStatus::PaidReported).unwrap();
		assert_eq!(json, "\"paid_reported\"");
		let back: OrderStatus = serde_json::from_str("\"refund_requested\"").unwrap();
		assert_eq!(back, OrderStatus::RefundRequested);
	}
}

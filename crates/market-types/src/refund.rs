//! Refund request types.
//!
//! A refund is an audit record tied to an order. At most one pending refund
//! may exist per order at any time; completed refunds are terminal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, UserId};

/// Unique refund identifier.
pub type RefundId = u64;

/// Processing status of a refund request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
	/// Awaiting a decision by an admin or the seller.
	Pending,
	/// Approved, settlement payment not yet recorded.
	Approved,
	Rejected,
	/// Approved and settled; terminal.
	Completed,
}

/// A buyer-initiated reversal request for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
	pub id: RefundId,
	pub order_id: OrderId,
	/// Always the order's buyer.
	pub requester_id: UserId,
	/// Copied from the order at request time.
	pub amount_usd: Decimal,
	pub reason: String,
	pub status: RefundStatus,
	pub admin_note: Option<String>,
	pub processed_by: Option<UserId>,
	/// Hash of the settlement transaction that paid the buyer back.
	pub refund_transaction_hash: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

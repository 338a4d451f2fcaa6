//! Refund workflow module for the marketplace system.
//!
//! A secondary state machine keyed off refundable orders. The refund entity
//! is the audit trail of the decision; order status changes always go
//! through the order engine's hold/release/mark-refunded hooks so the status
//! column keeps a single owner.

pub mod store;

pub use store::RefundStore;

use chrono::Utc;
use market_notification::NotificationSink;
use market_order::OrderService;
use market_types::{
	MarketError, OrderId, Refund, RefundId, RefundStatus, Result, UserId,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Coordinates refund requests and decisions.
pub struct RefundService {
	store: RefundStore,
	orders: Arc<OrderService>,
	notifier: Arc<dyn NotificationSink>,
}

impl RefundService {
	pub fn new(
		store: RefundStore,
		orders: Arc<OrderService>,
		notifier: Arc<dyn NotificationSink>,
	) -> Self {
		Self {
			store,
			orders,
			notifier,
		}
	}

	/// Buyer requests a refund for a confirmed, verified or completed order.
	///
	/// Creates the pending refund record and puts the order on hold. At most
	/// one pending refund can exist per order; the hold transition enforces
	/// this even under concurrent requests, since a held order is no longer
	/// refundable.
	pub async fn request_refund(
		&self,
		requester_id: UserId,
		order_id: OrderId,
		reason: String,
	) -> Result<Refund> {
		if reason.trim().is_empty() {
			return Err(MarketError::Validation("Refund reason is required".into()));
		}

		let order = self.orders.find_one(order_id).await?;
		if order.buyer_id != requester_id {
			return Err(MarketError::forbidden(
				"Only the buyer can request a refund",
			));
		}
		if !order.status.is_refundable() {
			return Err(MarketError::invalid_state(format!(
				"Cannot request refund for order in \"{}\" status",
				order.status
			)));
		}

		if self.store.find_pending_for_order(order_id).await?.is_some() {
			return Err(MarketError::invalid_state(
				"A refund request is already pending for this order",
			));
		}

		// Re-checks refundability under the order lock
		self.orders.hold_for_refund(order_id).await?;

		let refund = self
			.store
			.insert(|id| Refund {
				id,
				order_id,
				requester_id,
				amount_usd: order.amount_usd,
				reason,
				status: RefundStatus::Pending,
				admin_note: None,
				processed_by: None,
				refund_transaction_hash: None,
				created_at: Utc::now(),
				updated_at: Utc::now(),
			})
			.await?;

		info!("Refund {} requested for order {}", refund.id, order_id);
		if let Err(e) = self
			.notifier
			.notify_refund_requested(order.seller_id, order_id)
			.await
		{
			warn!(
				"Failed to notify seller of refund request on order {}: {}",
				order_id, e
			);
		}
		Ok(refund)
	}

	/// Admin or seller decides a pending refund.
	///
	/// Approval moves the order to Refunded; supplying a settlement hash
	/// closes the refund in the same operation, otherwise it parks in
	/// Approved until [`RefundService::complete_refund`]. Rejection restores
	/// the order to Completed only if it is still on hold.
	pub async fn process_refund(
		&self,
		refund_id: RefundId,
		processed_by: UserId,
		approved: bool,
		admin_note: Option<String>,
		refund_tx_hash: Option<String>,
	) -> Result<Refund> {
		let refund = self
			.store
			.update_guarded(refund_id, |refund| {
				if refund.status != RefundStatus::Pending {
					return Err(MarketError::invalid_state(
						"Refund has already been processed",
					));
				}

				refund.processed_by = Some(processed_by);
				if admin_note.is_some() {
					refund.admin_note = admin_note.clone();
				}

				if approved {
					refund.status = RefundStatus::Approved;
					if let Some(hash) = &refund_tx_hash {
						refund.refund_transaction_hash = Some(hash.clone());
						refund.status = RefundStatus::Completed;
					}
				} else {
					refund.status = RefundStatus::Rejected;
				}
				Ok(())
			})
			.await?;

		if approved {
			self.orders.mark_refunded(refund.order_id).await?;
		} else {
			self.orders.release_refund_hold(refund.order_id).await?;
		}

		info!(
			"Refund {} {} by user {}",
			refund_id,
			if approved { "approved" } else { "rejected" },
			processed_by
		);
		if let Err(e) = self
			.notifier
			.notify_refund_decision(
				refund.requester_id,
				refund.order_id,
				approved,
				refund.admin_note.as_deref(),
			)
			.await
		{
			warn!(
				"Failed to notify buyer of refund decision on order {}: {}",
				refund.order_id, e
			);
		}
		Ok(refund)
	}

	/// Records the settlement transaction for an approved refund.
	pub async fn complete_refund(
		&self,
		refund_id: RefundId,
		admin_id: UserId,
		tx_hash: String,
	) -> Result<Refund> {
		if tx_hash.trim().is_empty() {
			return Err(MarketError::Validation(
				"Settlement transaction hash is required".into(),
			));
		}

		let refund = self
			.store
			.update_guarded(refund_id, |refund| {
				if refund.status != RefundStatus::Approved {
					return Err(MarketError::invalid_state(
						"Refund must be in APPROVED status",
					));
				}
				refund.status = RefundStatus::Completed;
				refund.refund_transaction_hash = Some(tx_hash.clone());
				refund.processed_by = Some(admin_id);
				Ok(())
			})
			.await?;

		info!("Refund {} settled", refund_id);
		Ok(refund)
	}

	pub async fn find_one(&self, refund_id: RefundId) -> Result<Refund> {
		self.store.get(refund_id).await
	}

	/// All refunds, newest first, optionally filtered by status.
	pub async fn find_all(&self, status: Option<RefundStatus>) -> Result<Vec<Refund>> {
		let mut refunds = self.store.list().await?;
		if let Some(status) = status {
			refunds.retain(|r| r.status == status);
		}
		refunds.sort_by(|a, b| b.id.cmp(&a.id));
		Ok(refunds)
	}

	/// A buyer's refund requests, newest first.
	pub async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Refund>> {
		let mut refunds = self.store.list().await?;
		refunds.retain(|r| r.requester_id == user_id);
		refunds.sort_by(|a, b| b.id.cmp(&a.id));
		Ok(refunds)
	}
}

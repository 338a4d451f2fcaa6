//! The order lifecycle engine.
//!
//! Owns every legal transition of an order's status. Collaborators (catalog
//! lookup, chain verification, notification sink) are injected so the engine
//! can be exercised against fakes. Guard violations surface as typed errors;
//! verification failures do not — an unverifiable payment is a normal
//! outcome that leaves the order in a reported-but-unverified state.

use crate::store::OrderStore;
use async_trait::async_trait;
use chrono::Utc;
use market_catalog::{OrderDirectory, ProductCatalog};
use market_notification::NotificationSink;
use market_types::{
	DeliveryContent, DeliveryType, MarketError, Order, OrderId, OrderStatus, ProductId,
	ProductStatus, Result, UserId,
};
use market_verification::PaymentVerifier;
use std::sync::Arc;
use tracing::{info, warn};

/// Coordinates order transitions against storage, catalog, verification and
/// notifications.
pub struct OrderService {
	store: OrderStore,
	catalog: Arc<dyn ProductCatalog>,
	verifier: Arc<dyn PaymentVerifier>,
	notifier: Arc<dyn NotificationSink>,
}

impl OrderService {
	pub fn new(
		store: OrderStore,
		catalog: Arc<dyn ProductCatalog>,
		verifier: Arc<dyn PaymentVerifier>,
		notifier: Arc<dyn NotificationSink>,
	) -> Self {
		Self {
			store,
			catalog,
			verifier,
			notifier,
		}
	}

	/// Creates an order for an approved product, snapshotting its price.
	pub async fn create(&self, buyer_id: UserId, product_id: ProductId) -> Result<Order> {
		let product = self.catalog.get_product(product_id).await?;
		if product.status != ProductStatus::Approved {
			return Err(MarketError::invalid_state(
				"Product is not available for purchase",
			));
		}
		if product.seller_id == buyer_id {
			return Err(MarketError::forbidden("Cannot buy your own product"));
		}

		let order = self
			.store
			.insert(|id| Order {
				id,
				buyer_id,
				seller_id: product.seller_id,
				product_id,
				amount_usd: product.price_usd,
				status: OrderStatus::Created,
				transaction_hash: None,
				payment_network: None,
				payment_verified: false,
				verification_details: None,
				created_at: Utc::now(),
				updated_at: Utc::now(),
			})
			.await?;

		info!("Order {} created for product {}", order.id, product_id);
		if let Err(e) = self
			.notifier
			.notify_order_created(order.seller_id, order.id, &product.title)
			.await
		{
			warn!("Failed to notify seller of order {}: {}", order.id, e);
		}
		Ok(order)
	}

	pub async fn find_one(&self, order_id: OrderId) -> Result<Order> {
		self.store.get(order_id).await
	}

	/// All orders, newest first.
	pub async fn find_all(&self) -> Result<Vec<Order>> {
		let mut orders = self.store.list().await?;
		orders.sort_by(|a, b| b.id.cmp(&a.id));
		Ok(orders)
	}

	pub async fn find_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>> {
		let mut orders = self.store.list().await?;
		orders.retain(|o| o.buyer_id == buyer_id);
		orders.sort_by(|a, b| b.id.cmp(&a.id));
		Ok(orders)
	}

	pub async fn find_by_seller(&self, seller_id: UserId) -> Result<Vec<Order>> {
		let mut orders = self.store.list().await?;
		orders.retain(|o| o.seller_id == seller_id);
		orders.sort_by(|a, b| b.id.cmp(&a.id));
		Ok(orders)
	}

	/// Buyer reports a payment, optionally with on-chain evidence.
	///
	/// With both a transaction hash and a network present the payment is
	/// verified synchronously; a successful outcome lands the order directly
	/// in PaymentVerified. The verification round-trip happens before the
	/// order lock is taken.
	pub async fn report_payment(
		&self,
		order_id: OrderId,
		buyer_id: UserId,
		transaction_hash: Option<String>,
		payment_network: Option<String>,
	) -> Result<Order> {
		let order = self.store.get(order_id).await?;
		if order.buyer_id != buyer_id {
			return Err(MarketError::forbidden("Not authorized"));
		}
		if order.status != OrderStatus::Created {
			return Err(MarketError::invalid_state("Order is not in CREATED status"));
		}

		let verification = match (&transaction_hash, &payment_network) {
			(Some(hash), Some(network)) => Some(self.verifier.verify(hash, network).await),
			_ => None,
		};
		let verified = verification.as_ref().is_some_and(|v| v.verified);

		let order = self
			.store
			.update_guarded(order_id, |order| {
				if order.buyer_id != buyer_id {
					return Err(MarketError::forbidden("Not authorized"));
				}
				if order.status != OrderStatus::Created {
					return Err(MarketError::invalid_state("Order is not in CREATED status"));
				}

				order.transaction_hash = transaction_hash.clone();
				order.payment_network = payment_network.clone();
				order.verification_details = verification.clone();
				if verified {
					order.payment_verified = true;
					order.status = OrderStatus::PaymentVerified;
				} else {
					order.status = OrderStatus::PaidReported;
				}
				Ok(())
			})
			.await?;

		info!(
			"Payment reported for order {} (verified: {})",
			order_id, verified
		);
		if let Err(e) = self
			.notifier
			.notify_payment_reported(order.seller_id, order_id, verified)
			.await
		{
			warn!("Failed to notify seller of payment on order {}: {}", order_id, e);
		}
		Ok(order)
	}

	/// Buyer re-runs chain verification on an already reported payment.
	///
	/// A failed outcome is recorded on the order but leaves its status
	/// untouched.
	pub async fn verify_payment(&self, order_id: OrderId, buyer_id: UserId) -> Result<Order> {
		let order = self.store.get(order_id).await?;
		if order.buyer_id != buyer_id {
			return Err(MarketError::forbidden("Not authorized"));
		}
		if !order.status.is_payment_reported() {
			return Err(MarketError::invalid_state(
				"Order has no reported payment to verify",
			));
		}
		let (Some(hash), Some(network)) = (
			order.transaction_hash.clone(),
			order.payment_network.clone(),
		) else {
			return Err(MarketError::invalid_state(
				"Order has no transaction details to verify",
			));
		};

		let verification = self.verifier.verify(&hash, &network).await;
		let verified = verification.verified;

		let order = self
			.store
			.update_guarded(order_id, |order| {
				if order.buyer_id != buyer_id {
					return Err(MarketError::forbidden("Not authorized"));
				}
				if !order.status.is_payment_reported() {
					return Err(MarketError::invalid_state(
						"Order has no reported payment to verify",
					));
				}

				order.verification_details = Some(verification.clone());
				if verified {
					order.payment_verified = true;
					order.status = OrderStatus::PaymentVerified;
				}
				Ok(())
			})
			.await?;

		if verified {
			info!("Payment verified on chain for order {}", order_id);
			if let Err(e) = self
				.notifier
				.notify_payment_reported(order.seller_id, order_id, true)
				.await
			{
				warn!(
					"Failed to notify seller of verified payment on order {}: {}",
					order_id, e
				);
			}
		}
		Ok(order)
	}

	/// Seller confirms a reported or verified payment.
	///
	/// Auto-hosted products short-circuit straight to Completed: once the
	/// seller vouches for the payment there is nothing left for them to do.
	pub async fn confirm_payment(&self, order_id: OrderId, seller_id: UserId) -> Result<Order> {
		let order = self.store.get(order_id).await?;
		if order.seller_id != seller_id {
			return Err(MarketError::forbidden("Not authorized"));
		}
		if !order.status.is_payment_reported() {
			return Err(MarketError::invalid_state(
				"Order payment has not been reported",
			));
		}

		let product = self.catalog.get_product(order.product_id).await?;
		let auto_complete = product.delivery_type == DeliveryType::AutoHosted;

		let order = self
			.store
			.update_guarded(order_id, |order| {
				if order.seller_id != seller_id {
					return Err(MarketError::forbidden("Not authorized"));
				}
				if !order.status.is_payment_reported() {
					return Err(MarketError::invalid_state(
						"Order payment has not been reported",
					));
				}

				order.status = if auto_complete {
					OrderStatus::Completed
				} else {
					OrderStatus::Confirmed
				};
				Ok(())
			})
			.await?;

		info!(
			"Payment confirmed for order {} (auto-completed: {})",
			order_id, auto_complete
		);
		let notified = if auto_complete {
			self.notifier
				.notify_order_completed(order.buyer_id, order_id)
				.await
		} else {
			self.notifier
				.notify_payment_confirmed(order.buyer_id, order_id)
				.await
		};
		if let Err(e) = notified {
			warn!(
				"Failed to notify buyer of confirmation on order {}: {}",
				order_id, e
			);
		}
		Ok(order)
	}

	/// Seller hands over delivery on a confirmed manual order.
	pub async fn complete_order(&self, order_id: OrderId, seller_id: UserId) -> Result<Order> {
		let order = self
			.store
			.update_guarded(order_id, |order| {
				if order.seller_id != seller_id {
					return Err(MarketError::forbidden("Not authorized"));
				}
				if order.status != OrderStatus::Confirmed {
					return Err(MarketError::invalid_state(
						"Order is not in CONFIRMED status",
					));
				}
				order.status = OrderStatus::Completed;
				Ok(())
			})
			.await?;

		info!("Order {} completed", order_id);
		if let Err(e) = self
			.notifier
			.notify_order_completed(order.buyer_id, order_id)
			.await
		{
			warn!("Failed to notify buyer of completed order {}: {}", order_id, e);
		}
		Ok(order)
	}

	/// Either party cancels an order that has not yet completed.
	pub async fn cancel_order(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
		let order = self
			.store
			.update_guarded(order_id, |order| {
				if order.buyer_id != user_id && order.seller_id != user_id {
					return Err(MarketError::forbidden("Not authorized"));
				}
				if !order.status.is_cancellable() {
					return Err(MarketError::invalid_state(format!(
						"Cannot cancel an order in {} status",
						order.status
					)));
				}
				order.status = OrderStatus::Cancelled;
				Ok(())
			})
			.await?;

		info!("Order {} cancelled by user {}", order_id, user_id);
		let counterparty = if order.buyer_id == user_id {
			order.seller_id
		} else {
			order.buyer_id
		};
		if let Err(e) = self
			.notifier
			.notify_order_cancelled(counterparty, order_id)
			.await
		{
			warn!(
				"Failed to notify counterparty of cancelled order {}: {}",
				order_id, e
			);
		}
		Ok(order)
	}

	/// Buyer retrieves the delivery payload of a completed order.
	pub async fn get_delivery_content(
		&self,
		order_id: OrderId,
		buyer_id: UserId,
	) -> Result<DeliveryContent> {
		let order = self.store.get(order_id).await?;
		if order.buyer_id != buyer_id {
			return Err(MarketError::forbidden("Not authorized"));
		}
		if order.status != OrderStatus::Completed {
			return Err(MarketError::invalid_state("Order is not completed"));
		}

		let product = self.catalog.get_product(order.product_id).await?;
		Ok(DeliveryContent {
			delivery_type: product.delivery_type,
			delivery_content: product.delivery_content,
		})
	}

	// Refund workflow hooks. The refund service never writes order status
	// itself; it goes through these so the status column has a single owner.

	/// Puts a refundable order on hold while a refund request is pending.
	pub async fn hold_for_refund(&self, order_id: OrderId) -> Result<Order> {
		self.store
			.update_guarded(order_id, |order| {
				if !order.status.is_refundable() {
					return Err(MarketError::invalid_state(format!(
						"Cannot request refund for order in \"{}\" status",
						order.status
					)));
				}
				order.status = OrderStatus::RefundRequested;
				Ok(())
			})
			.await
	}

	/// Marks a held order refunded after an approved refund.
	///
	/// If the order somehow left the hold state, the divergence is logged
	/// and the order is left untouched; the refund record remains the source
	/// of truth for the decision.
	pub async fn mark_refunded(&self, order_id: OrderId) -> Result<Order> {
		self.store
			.update_guarded(order_id, |order| {
				if order.status == OrderStatus::RefundRequested {
					order.status = OrderStatus::Refunded;
				} else {
					warn!(
						"Order {} not in refund hold (status {}); leaving status unchanged",
						order_id, order.status
					);
				}
				Ok(())
			})
			.await
	}

	/// Releases the refund hold after a rejected refund, restoring Completed.
	///
	/// Only an order still in the hold state is restored; a status produced
	/// by another legal path is never clobbered.
	pub async fn release_refund_hold(&self, order_id: OrderId) -> Result<Order> {
		self.store
			.update_guarded(order_id, |order| {
				if order.status == OrderStatus::RefundRequested {
					order.status = OrderStatus::Completed;
				} else {
					warn!(
						"Order {} not in refund hold (status {}); leaving status unchanged",
						order_id, order.status
					);
				}
				Ok(())
			})
			.await
	}
}

#[async_trait]
impl OrderDirectory for OrderService {
	async fn get_order(&self, id: OrderId) -> Result<Order> {
		self.find_one(id).await
	}
}

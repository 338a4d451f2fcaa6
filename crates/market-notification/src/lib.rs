//! Notification module for the marketplace system.
//!
//! Lifecycle transitions emit best-effort notifications through the
//! [`NotificationSink`] trait. Sink failures are reported to the caller but
//! must never roll back the transition that triggered them; the engines log
//! them and move on.

use async_trait::async_trait;
use chrono::Utc;
use market_types::{
	MarketError, Notification, NotificationId, NotificationPage, NotificationType, OrderId,
	ProductId, Result, UserId,
};
use market_storage::{StorageError, StorageService};
use serde_json::json;
use std::sync::Arc;

const NAMESPACE: &str = "notifications";

/// Options for listing a user's notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
	pub unread_only: bool,
	/// 1-based page number; defaults to the first page.
	pub page: Option<u64>,
	/// Page size, capped at 100; defaults to 20.
	pub limit: Option<u64>,
}

/// Fire-and-forget notification hooks invoked by lifecycle transitions.
#[async_trait]
pub trait NotificationSink: Send + Sync {
	async fn notify_order_created(
		&self,
		seller_id: UserId,
		order_id: OrderId,
		product_title: &str,
	) -> Result<()>;

	async fn notify_payment_reported(
		&self,
		seller_id: UserId,
		order_id: OrderId,
		verified: bool,
	) -> Result<()>;

	async fn notify_payment_confirmed(&self, buyer_id: UserId, order_id: OrderId) -> Result<()>;

	async fn notify_order_completed(&self, buyer_id: UserId, order_id: OrderId) -> Result<()>;

	async fn notify_order_cancelled(&self, user_id: UserId, order_id: OrderId) -> Result<()>;

	async fn notify_product_approved(
		&self,
		seller_id: UserId,
		product_id: ProductId,
		product_title: &str,
	) -> Result<()>;

	async fn notify_product_rejected(
		&self,
		seller_id: UserId,
		product_id: ProductId,
		product_title: &str,
		reason: &str,
	) -> Result<()>;

	async fn notify_new_review(
		&self,
		seller_id: UserId,
		order_id: OrderId,
		rating: u8,
		product_title: &str,
	) -> Result<()>;

	async fn notify_refund_requested(&self, seller_id: UserId, order_id: OrderId) -> Result<()>;

	async fn notify_refund_decision(
		&self,
		buyer_id: UserId,
		order_id: OrderId,
		approved: bool,
		reason: Option<&str>,
	) -> Result<()>;
}

/// Sink that drops every notification. For tests and headless tools.
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
	async fn notify_order_created(&self, _: UserId, _: OrderId, _: &str) -> Result<()> {
		Ok(())
	}

	async fn notify_payment_reported(&self, _: UserId, _: OrderId, _: bool) -> Result<()> {
		Ok(())
	}

	async fn notify_payment_confirmed(&self, _: UserId, _: OrderId) -> Result<()> {
		Ok(())
	}

	async fn notify_order_completed(&self, _: UserId, _: OrderId) -> Result<()> {
		Ok(())
	}

	async fn notify_order_cancelled(&self, _: UserId, _: OrderId) -> Result<()> {
		Ok(())
	}

	async fn notify_product_approved(&self, _: UserId, _: ProductId, _: &str) -> Result<()> {
		Ok(())
	}

	async fn notify_product_rejected(
		&self,
		_: UserId,
		_: ProductId,
		_: &str,
		_: &str,
	) -> Result<()> {
		Ok(())
	}

	async fn notify_new_review(&self, _: UserId, _: OrderId, _: u8, _: &str) -> Result<()> {
		Ok(())
	}

	async fn notify_refund_requested(&self, _: UserId, _: OrderId) -> Result<()> {
		Ok(())
	}

	async fn notify_refund_decision(
		&self,
		_: UserId,
		_: OrderId,
		_: bool,
		_: Option<&str>,
	) -> Result<()> {
		Ok(())
	}
}

/// Storage-backed notification service.
///
/// Persists one row per notification and answers the storefront's unread
/// badge and notification list queries.
pub struct NotificationService {
	storage: Arc<StorageService>,
}

impl NotificationService {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	fn map_storage(e: StorageError) -> MarketError {
		MarketError::Storage(e.to_string())
	}

	/// Creates a notification for a user.
	pub async fn create(
		&self,
		user_id: UserId,
		kind: NotificationType,
		title: impl Into<String>,
		message: impl Into<String>,
		metadata: Option<serde_json::Value>,
	) -> Result<Notification> {
		let id = self
			.storage
			.next_id(NAMESPACE)
			.await
			.map_err(Self::map_storage)?;

		let notification = Notification {
			id,
			user_id,
			kind,
			title: title.into(),
			message: message.into(),
			metadata,
			is_read: false,
			created_at: Utc::now(),
		};

		self.storage
			.store(NAMESPACE, id, &notification)
			.await
			.map_err(Self::map_storage)?;
		Ok(notification)
	}

	/// Lists a user's notifications, newest first.
	pub async fn find_by_user(&self, user_id: UserId, options: ListOptions) -> Result<NotificationPage> {
		let page = options.page.unwrap_or(1).max(1);
		let limit = options.limit.unwrap_or(20).clamp(1, 100);

		let mut items: Vec<Notification> = self
			.storage
			.list_all(NAMESPACE)
			.await
			.map_err(Self::map_storage)?
			.into_iter()
			.filter(|n: &Notification| {
				n.user_id == user_id && (!options.unread_only || !n.is_read)
			})
			.collect();
		items.sort_by(|a, b| b.id.cmp(&a.id));

		let total = items.len() as u64;
		let start = ((page - 1) * limit) as usize;
		let items: Vec<Notification> = items
			.into_iter()
			.skip(start)
			.take(limit as usize)
			.collect();

		Ok(NotificationPage {
			items,
			total,
			page,
			limit,
			total_pages: total.div_ceil(limit),
		})
	}

	/// Number of unread notifications for a user.
	pub async fn unread_count(&self, user_id: UserId) -> Result<u64> {
		let items: Vec<Notification> = self
			.storage
			.list_all(NAMESPACE)
			.await
			.map_err(Self::map_storage)?;
		Ok(items
			.iter()
			.filter(|n| n.user_id == user_id && !n.is_read)
			.count() as u64)
	}

	/// Marks one of the user's notifications as read.
	pub async fn mark_as_read(&self, id: NotificationId, user_id: UserId) -> Result<Notification> {
		let mut notification: Notification = match self.storage.retrieve(NAMESPACE, id).await {
			Ok(n) => n,
			Err(StorageError::NotFound) => {
				return Err(MarketError::not_found("Notification not found"))
			}
			Err(e) => return Err(Self::map_storage(e)),
		};
		if notification.user_id != user_id {
			return Err(MarketError::not_found("Notification not found"));
		}

		notification.is_read = true;
		self.storage
			.store(NAMESPACE, id, &notification)
			.await
			.map_err(Self::map_storage)?;
		Ok(notification)
	}

	/// Marks all of a user's notifications as read.
	pub async fn mark_all_as_read(&self, user_id: UserId) -> Result<()> {
		let items: Vec<Notification> = self
			.storage
			.list_all(NAMESPACE)
			.await
			.map_err(Self::map_storage)?;
		for mut notification in items {
			if notification.user_id == user_id && !notification.is_read {
				notification.is_read = true;
				self.storage
					.store(NAMESPACE, notification.id, &notification)
					.await
					.map_err(Self::map_storage)?;
			}
		}
		Ok(())
	}
}

#[async_trait]
impl NotificationSink for NotificationService {
	async fn notify_order_created(
		&self,
		seller_id: UserId,
		order_id: OrderId,
		product_title: &str,
	) -> Result<()> {
		self.create(
			seller_id,
			NotificationType::OrderCreated,
			"New Order Received",
			format!(
				"You have a new order (#{}) for \"{}\".",
				order_id, product_title
			),
			Some(json!({ "order_id": order_id })),
		)
		.await?;
		Ok(())
	}

	async fn notify_payment_reported(
		&self,
		seller_id: UserId,
		order_id: OrderId,
		verified: bool,
	) -> Result<()> {
		let (kind, title, message) = if verified {
			(
				NotificationType::PaymentVerified,
				"Payment Verified",
				format!(
					"Payment for order #{} has been verified on blockchain.",
					order_id
				),
			)
		} else {
			(
				NotificationType::PaymentReported,
				"Payment Reported",
				format!(
					"Buyer has reported payment for order #{}. Please verify and confirm.",
					order_id
				),
			)
		};
		self.create(
			seller_id,
			kind,
			title,
			message,
			Some(json!({ "order_id": order_id, "verified": verified })),
		)
		.await?;
		Ok(())
	}

	async fn notify_payment_confirmed(&self, buyer_id: UserId, order_id: OrderId) -> Result<()> {
		self.create(
			buyer_id,
			NotificationType::PaymentConfirmed,
			"Payment Confirmed",
			format!(
				"Your payment for order #{} has been confirmed by the seller.",
				order_id
			),
			Some(json!({ "order_id": order_id })),
		)
		.await?;
		Ok(())
	}

	async fn notify_order_completed(&self, buyer_id: UserId, order_id: OrderId) -> Result<()> {
		self.create(
			buyer_id,
			NotificationType::OrderCompleted,
			"Order Completed",
			format!(
				"Order #{} is complete. You can now access your delivery content.",
				order_id
			),
			Some(json!({ "order_id": order_id })),
		)
		.await?;
		Ok(())
	}

	async fn notify_order_cancelled(&self, user_id: UserId, order_id: OrderId) -> Result<()> {
		self.create(
			user_id,
			NotificationType::OrderCancelled,
			"Order Cancelled",
			format!("Order #{} has been cancelled.", order_id),
			Some(json!({ "order_id": order_id })),
		)
		.await?;
		Ok(())
	}

	async fn notify_product_approved(
		&self,
		seller_id: UserId,
		product_id: ProductId,
		product_title: &str,
	) -> Result<()> {
		self.create(
			seller_id,
			NotificationType::ProductApproved,
			"Product Approved",
			format!(
				"Your product \"{}\" has been approved and is now live.",
				product_title
			),
			Some(json!({ "product_id": product_id })),
		)
		.await?;
		Ok(())
	}

	async fn notify_product_rejected(
		&self,
		seller_id: UserId,
		product_id: ProductId,
		product_title: &str,
		reason: &str,
	) -> Result<()> {
		self.create(
			seller_id,
			NotificationType::ProductRejected,
			"Product Rejected",
			format!(
				"Your product \"{}\" was rejected. Reason: {}",
				product_title, reason
			),
			Some(json!({ "product_id": product_id, "reason": reason })),
		)
		.await?;
		Ok(())
	}

	async fn notify_new_review(
		&self,
		seller_id: UserId,
		order_id: OrderId,
		rating: u8,
		product_title: &str,
	) -> Result<()> {
		self.create(
			seller_id,
			NotificationType::NewReview,
			"New Review",
			format!(
				"Your product \"{}\" received a {}-star review.",
				product_title, rating
			),
			Some(json!({ "order_id": order_id, "rating": rating })),
		)
		.await?;
		Ok(())
	}

	async fn notify_refund_requested(&self, seller_id: UserId, order_id: OrderId) -> Result<()> {
		self.create(
			seller_id,
			NotificationType::RefundRequested,
			"Refund Requested",
			format!("A refund has been requested for order #{}.", order_id),
			Some(json!({ "order_id": order_id })),
		)
		.await?;
		Ok(())
	}

	async fn notify_refund_decision(
		&self,
		buyer_id: UserId,
		order_id: OrderId,
		approved: bool,
		reason: Option<&str>,
	) -> Result<()> {
		let (kind, title, message) = if approved {
			(
				NotificationType::RefundApproved,
				"Refund Approved",
				format!(
					"Your refund request for order #{} has been approved.",
					order_id
				),
			)
		} else {
			(
				NotificationType::RefundRejected,
				"Refund Rejected",
				format!(
					"Your refund request for order #{} was rejected.{}",
					order_id,
					reason
						.map(|r| format!(" Reason: {}", r))
						.unwrap_or_default()
				),
			)
		};
		self.create(
			buyer_id,
			kind,
			title,
			message,
			Some(json!({ "order_id": order_id, "approved": approved, "reason": reason })),
		)
		.await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_storage::MemoryStorage;

	fn service() -> NotificationService {
		NotificationService::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	#[tokio::test]
	async fn listing_is_newest_first_and_paged() {
		let service = service();
		for order_id in 1..=5u64 {
			service
				.notify_order_created(10, order_id, "Prompt Pack")
				.await
				.unwrap();
		}

		let page = service
			.find_by_user(
				10,
				ListOptions {
					limit: Some(2),
					..Default::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(page.total, 5);
		assert_eq!(page.total_pages, 3);
		assert_eq!(page.items.len(), 2);
		assert!(page.items[0].id > page.items[1].id);

		// Another user sees nothing
		let other = service.find_by_user(11, ListOptions::default()).await.unwrap();
		assert_eq!(other.total, 0);
	}

	#[tokio::test]
	async fn unread_tracking() {
		let service = service();
		service.notify_order_completed(7, 1).await.unwrap();
		service.notify_order_cancelled(7, 2).await.unwrap();
		assert_eq!(service.unread_count(7).await.unwrap(), 2);

		let page = service.find_by_user(7, ListOptions::default()).await.unwrap();
		service.mark_as_read(page.items[0].id, 7).await.unwrap();
		assert_eq!(service.unread_count(7).await.unwrap(), 1);

		service.mark_all_as_read(7).await.unwrap();
		assert_eq!(service.unread_count(7).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn mark_as_read_checks_ownership() {
		let service = service();
		service.notify_order_completed(7, 1).await.unwrap();
		let page = service.find_by_user(7, ListOptions::default()).await.unwrap();

		let err = service.mark_as_read(page.items[0].id, 8).await.unwrap_err();
		assert!(matches!(err, MarketError::NotFound(_)));
	}

	#[tokio::test]
	async fn refund_decision_includes_reason_when_rejected() {
		let service = service();
		service
			.notify_refund_decision(3, 9, false, Some("out of policy"))
			.await
			.unwrap();

		let page = service.find_by_user(3, ListOptions::default()).await.unwrap();
		assert_eq!(page.items[0].kind, NotificationType::RefundRejected);
		assert!(page.items[0].message.contains("Reason: out of policy"));
	}
}

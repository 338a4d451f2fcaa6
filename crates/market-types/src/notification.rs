//! User notification types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

pub type NotificationId = u64;

/// What a notification is about; drives storefront rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
	OrderCreated,
	PaymentReported,
	PaymentVerified,
	PaymentConfirmed,
	OrderCompleted,
	OrderCancelled,
	ProductApproved,
	ProductRejected,
	NewReview,
	RefundRequested,
	RefundApproved,
	RefundRejected,
}

/// A persisted notification row for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
	pub id: NotificationId,
	pub user_id: UserId,
	#[serde(rename = "type")]
	pub kind: NotificationType,
	pub title: String,
	pub message: String,
	/// Free-form context (order id, product id, ...) for deep links.
	pub metadata: Option<serde_json::Value>,
	pub is_read: bool,
	pub created_at: DateTime<Utc>,
}

/// One page of notifications, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
	pub items: Vec<Notification>,
	pub total: u64,
	pub page: u64,
	pub limit: u64,
	pub total_pages: u64,
}

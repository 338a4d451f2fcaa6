//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Unique product identifier.
pub type ProductId = u64;

/// Moderation status of a catalog entry. Only approved products are
/// purchasable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
	Draft,
	PendingReview,
	Approved,
	Rejected,
	OffShelf,
}

/// How delivery content is released once payment is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryType {
	/// Hosted goods (keys, links): released automatically on confirmation.
	#[serde(rename = "auto_hosted")]
	AutoHosted,
	/// Seller provides content/instructions after confirmation.
	#[serde(rename = "manual")]
	Manual,
}

/// A digital good listed for sale: a skill, prompt pack or agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
	pub id: ProductId,
	pub seller_id: UserId,
	pub title: String,
	pub description: Option<String>,
	pub category: Option<String>,
	pub tags: Option<String>,
	pub preview_image_url: Option<String>,
	pub price_usd: Decimal,
	pub delivery_type: DeliveryType,
	/// Access key/link for auto-hosted goods, instructions for manual ones.
	pub delivery_content: Option<String>,
	pub status: ProductStatus,
	/// Moderator note attached on rejection.
	pub review_reason: Option<String>,
	pub created_at: DateTime<Utc>,
}

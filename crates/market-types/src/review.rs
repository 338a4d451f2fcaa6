//! Review and rating types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, ProductId, UserId};

pub type ReviewId = u64;

/// A buyer's review of a completed order. One per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
	pub id: ReviewId,
	pub order_id: OrderId,
	pub product_id: ProductId,
	pub reviewer_id: UserId,
	pub seller_id: UserId,
	/// 1 to 5 stars.
	pub rating: u8,
	pub comment: Option<String>,
	pub created_at: DateTime<Utc>,
}

/// Aggregated rating for a product or a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
	/// Average rating rounded to one decimal place, 0.0 when unreviewed.
	pub average_rating: f64,
	pub review_count: u64,
}

//! Review and rating aggregation.
//!
//! Reviews hang off completed orders: only the buyer may review, once per
//! order. Ratings feed the product and seller averages shown on listings.

use async_trait::async_trait;
use chrono::Utc;
use market_notification::NotificationSink;
use market_storage::{StorageError, StorageService};
use market_types::{
	MarketError, Order, OrderId, OrderStatus, Product, ProductId, RatingSummary, Result, Review,
	UserId,
};
use std::sync::Arc;
use tracing::warn;

const NAMESPACE: &str = "reviews";

/// Order lookup consumed by the review service; implemented by the order
/// lifecycle engine.
#[async_trait]
pub trait OrderDirectory: Send + Sync {
	async fn get_order(&self, id: OrderId) -> Result<Order>;
}

/// Storage-backed review service.
pub struct ReviewService {
	storage: Arc<StorageService>,
	orders: Arc<dyn OrderDirectory>,
	notifier: Arc<dyn NotificationSink>,
}

impl ReviewService {
	pub fn new(
		storage: Arc<StorageService>,
		orders: Arc<dyn OrderDirectory>,
		notifier: Arc<dyn NotificationSink>,
	) -> Self {
		Self {
			storage,
			orders,
			notifier,
		}
	}

	fn map_storage(e: StorageError) -> MarketError {
		MarketError::Storage(e.to_string())
	}

	async fn all_reviews(&self) -> Result<Vec<Review>> {
		self.storage
			.list_all(NAMESPACE)
			.await
			.map_err(Self::map_storage)
	}

	/// Creates a review for a completed order.
	pub async fn create(
		&self,
		reviewer_id: UserId,
		order_id: OrderId,
		rating: u8,
		comment: Option<String>,
	) -> Result<Review> {
		if !(1..=5).contains(&rating) {
			return Err(MarketError::Validation(
				"Rating must be between 1 and 5".into(),
			));
		}

		let order = self.orders.get_order(order_id).await?;
		if order.buyer_id != reviewer_id {
			return Err(MarketError::forbidden(
				"Only the buyer can review this order",
			));
		}
		if order.status != OrderStatus::Completed {
			return Err(MarketError::invalid_state(
				"Can only review completed orders",
			));
		}

		let existing = self.all_reviews().await?;
		if existing.iter().any(|r| r.order_id == order_id) {
			return Err(MarketError::invalid_state(
				"You have already reviewed this order",
			));
		}

		let id = self
			.storage
			.next_id(NAMESPACE)
			.await
			.map_err(Self::map_storage)?;
		let review = Review {
			id,
			order_id,
			product_id: order.product_id,
			reviewer_id,
			seller_id: order.seller_id,
			rating,
			comment,
			created_at: Utc::now(),
		};
		self.storage
			.store(NAMESPACE, id, &review)
			.await
			.map_err(Self::map_storage)?;

		let product_title = match self
			.storage
			.retrieve::<Product>("products", order.product_id)
			.await
		{
			Ok(product) => product.title,
			Err(_) => format!("Product #{}", order.product_id),
		};
		if let Err(e) = self
			.notifier
			.notify_new_review(order.seller_id, order_id, rating, &product_title)
			.await
		{
			warn!("Failed to notify seller of new review: {}", e);
		}

		Ok(review)
	}

	/// All reviews for a product, newest first.
	pub async fn find_by_product(&self, product_id: ProductId) -> Result<Vec<Review>> {
		let mut reviews = self.all_reviews().await?;
		reviews.retain(|r| r.product_id == product_id);
		reviews.sort_by(|a, b| b.id.cmp(&a.id));
		Ok(reviews)
	}

	/// Average rating and review count for a product.
	pub async fn product_rating(&self, product_id: ProductId) -> Result<RatingSummary> {
		let reviews = self.find_by_product(product_id).await?;
		Ok(summarize(&reviews))
	}

	/// Average rating and review count across a seller's products.
	pub async fn seller_rating(&self, seller_id: UserId) -> Result<RatingSummary> {
		let mut reviews = self.all_reviews().await?;
		reviews.retain(|r| r.seller_id == seller_id);
		Ok(summarize(&reviews))
	}
}

/// Average to one decimal place, 0.0 when there are no reviews.
fn summarize(reviews: &[Review]) -> RatingSummary {
	if reviews.is_empty() {
		return RatingSummary {
			average_rating: 0.0,
			review_count: 0,
		};
	}
	let sum: u64 = reviews.iter().map(|r| r.rating as u64).sum();
	let average = sum as f64 / reviews.len() as f64;
	RatingSummary {
		average_rating: (average * 10.0).round() / 10.0,
		review_count: reviews.len() as u64,
	}
}

//! Product catalog service: listing creation, moderation and lookup.

use crate::ProductCatalog;
use async_trait::async_trait;
use chrono::Utc;
use market_notification::NotificationSink;
use market_storage::{StorageError, StorageService};
use market_types::{
	DeliveryType, MarketError, Product, ProductId, ProductStatus, Result, UserId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

const NAMESPACE: &str = "products";

/// Payload for creating a listing. Listings start as drafts.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
	pub title: String,
	pub description: Option<String>,
	pub category: Option<String>,
	pub tags: Option<String>,
	pub preview_image_url: Option<String>,
	pub price_usd: Decimal,
	pub delivery_type: DeliveryType,
	pub delivery_content: Option<String>,
}

/// Storage-backed product catalog.
pub struct CatalogService {
	storage: Arc<StorageService>,
	notifier: Arc<dyn NotificationSink>,
}

impl CatalogService {
	pub fn new(storage: Arc<StorageService>, notifier: Arc<dyn NotificationSink>) -> Self {
		Self { storage, notifier }
	}

	fn map_storage(e: StorageError) -> MarketError {
		MarketError::Storage(e.to_string())
	}

	async fn load(&self, id: ProductId) -> Result<Product> {
		match self.storage.retrieve(NAMESPACE, id).await {
			Ok(product) => Ok(product),
			Err(StorageError::NotFound) => Err(MarketError::not_found("Product not found")),
			Err(e) => Err(Self::map_storage(e)),
		}
	}

	async fn save(&self, product: &Product) -> Result<()> {
		self.storage
			.store(NAMESPACE, product.id, product)
			.await
			.map_err(Self::map_storage)
	}

	/// Creates a draft listing for a seller.
	pub async fn create(&self, seller_id: UserId, new: NewProduct) -> Result<Product> {
		if new.title.trim().is_empty() {
			return Err(MarketError::Validation("Product title is required".into()));
		}
		if new.price_usd <= Decimal::ZERO {
			return Err(MarketError::Validation(
				"Product price must be positive".into(),
			));
		}

		let id = self
			.storage
			.next_id(NAMESPACE)
			.await
			.map_err(Self::map_storage)?;

		let product = Product {
			id,
			seller_id,
			title: new.title,
			description: new.description,
			category: new.category,
			tags: new.tags,
			preview_image_url: new.preview_image_url,
			price_usd: new.price_usd,
			delivery_type: new.delivery_type,
			delivery_content: new.delivery_content,
			status: ProductStatus::Draft,
			review_reason: None,
			created_at: Utc::now(),
		};
		self.save(&product).await?;
		Ok(product)
	}

	/// Submits a draft or previously rejected listing for moderation.
	pub async fn submit_for_review(
		&self,
		product_id: ProductId,
		seller_id: UserId,
	) -> Result<Product> {
		let mut product = self.load(product_id).await?;
		if product.seller_id != seller_id {
			return Err(MarketError::forbidden("Not authorized"));
		}
		if !matches!(
			product.status,
			ProductStatus::Draft | ProductStatus::Rejected | ProductStatus::OffShelf
		) {
			return Err(MarketError::invalid_state(format!(
				"Cannot submit a product in {:?} status for review",
				product.status
			)));
		}

		product.status = ProductStatus::PendingReview;
		self.save(&product).await?;
		Ok(product)
	}

	/// Approves a listing, making it purchasable. Admin operation; caller
	/// authorization happens upstream.
	pub async fn approve(&self, product_id: ProductId) -> Result<Product> {
		let mut product = self.load(product_id).await?;
		product.status = ProductStatus::Approved;
		product.review_reason = None;
		self.save(&product).await?;

		if let Err(e) = self
			.notifier
			.notify_product_approved(product.seller_id, product.id, &product.title)
			.await
		{
			warn!("Failed to notify seller of product approval: {}", e);
		}
		Ok(product)
	}

	/// Rejects a listing with a moderator note.
	pub async fn reject(&self, product_id: ProductId, reason: String) -> Result<Product> {
		let mut product = self.load(product_id).await?;
		product.status = ProductStatus::Rejected;
		product.review_reason = Some(reason.clone());
		self.save(&product).await?;

		if let Err(e) = self
			.notifier
			.notify_product_rejected(product.seller_id, product.id, &product.title, &reason)
			.await
		{
			warn!("Failed to notify seller of product rejection: {}", e);
		}
		Ok(product)
	}

	/// Withdraws an approved listing from the storefront.
	pub async fn take_off_shelf(&self, product_id: ProductId, seller_id: UserId) -> Result<Product> {
		let mut product = self.load(product_id).await?;
		if product.seller_id != seller_id {
			return Err(MarketError::forbidden("Not authorized"));
		}
		if product.status != ProductStatus::Approved {
			return Err(MarketError::invalid_state(
				"Only approved products can be taken off shelf",
			));
		}

		product.status = ProductStatus::OffShelf;
		self.save(&product).await?;
		Ok(product)
	}

	pub async fn find_one(&self, product_id: ProductId) -> Result<Product> {
		self.load(product_id).await
	}

	/// Approved listings, newest first. The storefront's browse view.
	pub async fn find_approved(&self) -> Result<Vec<Product>> {
		let mut products: Vec<Product> = self
			.storage
			.list_all(NAMESPACE)
			.await
			.map_err(Self::map_storage)?;
		products.retain(|p| p.status == ProductStatus::Approved);
		products.sort_by(|a, b| b.id.cmp(&a.id));
		Ok(products)
	}

	/// All of a seller's listings regardless of status, newest first.
	pub async fn find_by_seller(&self, seller_id: UserId) -> Result<Vec<Product>> {
		let mut products: Vec<Product> = self
			.storage
			.list_all(NAMESPACE)
			.await
			.map_err(Self::map_storage)?;
		products.retain(|p| p.seller_id == seller_id);
		products.sort_by(|a, b| b.id.cmp(&a.id));
		Ok(products)
	}
}

#[async_trait]
impl ProductCatalog for CatalogService {
	async fn get_product(&self, id: ProductId) -> Result<Product> {
		self.load(id).await
	}
}

//! Catalog module for the marketplace system.
//!
//! Owns the product listings that orders are placed against, their moderation
//! lifecycle, and the review/rating aggregation shown on the storefront. The
//! order engine consumes the catalog exclusively through the
//! [`ProductCatalog`] trait so it can be substituted with a fake in tests.

use async_trait::async_trait;
use market_types::{Product, ProductId, Result};

pub mod catalog;
pub mod reviews;

pub use catalog::{CatalogService, NewProduct};
pub use reviews::{OrderDirectory, ReviewService};

/// Read-side catalog lookup consumed by the order lifecycle engine.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
	/// Fetches a product by id, failing with NotFound if it does not exist.
	async fn get_product(&self, id: ProductId) -> Result<Product>;
}

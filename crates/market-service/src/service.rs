//! Component wiring for the marketplace service.

use anyhow::{Context, Result};
use market_catalog::{CatalogService, ReviewService};
use market_config::MarketConfig;
use market_notification::NotificationService;
use market_order::{OrderService, OrderStore};
use market_refund::{RefundService, RefundStore};
use market_storage::{FileStorage, MemoryStorage, StorageInterface, StorageService};
use market_verification::{
	BitcoinVerifier, ChainVerifier, EvmVerifier, SolanaVerifier, VerificationService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// All long-lived services behind the HTTP API.
#[derive(Clone)]
pub struct MarketState {
	pub orders: Arc<OrderService>,
	pub refunds: Arc<RefundService>,
	pub catalog: Arc<CatalogService>,
	pub reviews: Arc<ReviewService>,
	pub notifications: Arc<NotificationService>,
}

/// Builds the service graph from configuration.
///
/// Construction order follows the dependency chain: storage, notifications,
/// catalog, verification, orders, then reviews and refunds on top.
pub fn build_state(config: &MarketConfig) -> Result<MarketState> {
	let backend: Box<dyn StorageInterface> = match config.storage.backend.as_str() {
		"file" => {
			info!("Using file storage at {}", config.storage.path);
			Box::new(FileStorage::new(config.storage.path.clone().into()))
		}
		_ => {
			info!("Using in-memory storage");
			Box::new(MemoryStorage::new())
		}
	};
	let storage = Arc::new(StorageService::new(backend));

	let notifications = Arc::new(NotificationService::new(storage.clone()));
	let catalog = Arc::new(CatalogService::new(storage.clone(), notifications.clone()));

	let client = reqwest::Client::builder()
		.timeout(Duration::from_secs(config.verification.timeout_secs))
		.build()
		.context("Failed to build HTTP client for verification backends")?;

	let mut verifiers: Vec<Arc<dyn ChainVerifier>> = Vec::new();
	for (network, explorer) in &config.verification.evm {
		verifiers.push(Arc::new(EvmVerifier::new(
			network.clone(),
			explorer.api_url.clone(),
			explorer.api_key.clone(),
			client.clone(),
		)));
	}
	verifiers.push(Arc::new(SolanaVerifier::new(
		config.verification.solana_rpc_url.clone(),
		client.clone(),
	)));
	verifiers.push(Arc::new(BitcoinVerifier::new(
		config.verification.bitcoin_api_url.clone(),
		config.verification.blockcypher_token.clone(),
		client,
	)));
	let verification = Arc::new(VerificationService::new(verifiers));
	info!(
		"Chain verification enabled for: {:?}",
		verification.supported_networks()
	);

	let orders = Arc::new(OrderService::new(
		OrderStore::new(storage.clone()),
		catalog.clone(),
		verification,
		notifications.clone(),
	));
	let reviews = Arc::new(ReviewService::new(
		storage.clone(),
		orders.clone(),
		notifications.clone(),
	));
	let refunds = Arc::new(RefundService::new(
		RefundStore::new(storage),
		orders.clone(),
		notifications.clone(),
	));

	Ok(MarketState {
		orders,
		refunds,
		catalog,
		reviews,
		notifications,
	})
}

//! Refund repository with per-refund write locking.
//!
//! Same check-then-act discipline as the order store: a refund decision
//! reads the current status and writes a new one, so racing processors
//! serialize per refund id.

use chrono::Utc;
use dashmap::DashMap;
use market_storage::{StorageError, StorageService};
use market_types::{MarketError, OrderId, Refund, RefundId, RefundStatus, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

const NAMESPACE: &str = "refunds";

/// Persistent refund repository.
pub struct RefundStore {
	storage: Arc<StorageService>,
	locks: DashMap<RefundId, Arc<Mutex<()>>>,
}

impl RefundStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			locks: DashMap::new(),
		}
	}

	fn map_storage(e: StorageError) -> MarketError {
		MarketError::Storage(e.to_string())
	}

	fn lock_for(&self, id: RefundId) -> Arc<Mutex<()>> {
		self.locks
			.entry(id)
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	/// Allocates an id and persists a new refund built by `build`.
	pub async fn insert<F>(&self, build: F) -> Result<Refund>
	where
		F: FnOnce(RefundId) -> Refund,
	{
		let id = self
			.storage
			.next_id(NAMESPACE)
			.await
			.map_err(Self::map_storage)?;
		let refund = build(id);
		self.storage
			.store(NAMESPACE, id, &refund)
			.await
			.map_err(Self::map_storage)?;
		Ok(refund)
	}

	pub async fn get(&self, id: RefundId) -> Result<Refund> {
		match self.storage.retrieve(NAMESPACE, id).await {
			Ok(refund) => Ok(refund),
			Err(StorageError::NotFound) => Err(MarketError::not_found("Refund not found")),
			Err(e) => Err(Self::map_storage(e)),
		}
	}

	pub async fn list(&self) -> Result<Vec<Refund>> {
		self.storage
			.list_all(NAMESPACE)
			.await
			.map_err(Self::map_storage)
	}

	/// The pending refund for an order, if one exists.
	pub async fn find_pending_for_order(&self, order_id: OrderId) -> Result<Option<Refund>> {
		let refunds = self.list().await?;
		Ok(refunds
			.into_iter()
			.find(|r| r.order_id == order_id && r.status == RefundStatus::Pending))
	}

	/// Applies a guarded mutation to one refund under its write lock.
	pub async fn update_guarded<F>(&self, id: RefundId, apply: F) -> Result<Refund>
	where
		F: FnOnce(&mut Refund) -> Result<()>,
	{
		let lock = self.lock_for(id);
		let _guard = lock.lock().await;

		let mut refund = self.get(id).await?;
		apply(&mut refund)?;
		refund.updated_at = Utc::now();

		self.storage
			.store(NAMESPACE, id, &refund)
			.await
			.map_err(Self::map_storage)?;
		Ok(refund)
	}
}

//! Order repository with per-order write locking.
//!
//! Every transition is a check-then-act on the status column, so each
//! order's read-modify-write cycle runs under that order's lock and the
//! guard is re-evaluated after the read. Callers doing network I/O (chain
//! verification) must do it before entering [`OrderStore::update_guarded`];
//! no lock is ever held across an outbound call.

use chrono::Utc;
use dashmap::DashMap;
use market_storage::{StorageError, StorageService};
use market_types::{MarketError, Order, OrderId, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

const NAMESPACE: &str = "orders";

/// Persistent order repository.
pub struct OrderStore {
	storage: Arc<StorageService>,
	/// One mutex per order id, created on first use.
	locks: DashMap<OrderId, Arc<Mutex<()>>>,
}

impl OrderStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			locks: DashMap::new(),
		}
	}

	fn map_storage(e: StorageError) -> MarketError {
		MarketError::Storage(e.to_string())
	}

	fn lock_for(&self, id: OrderId) -> Arc<Mutex<()>> {
		self.locks
			.entry(id)
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	/// Allocates an id and persists a new order built by `build`.
	pub async fn insert<F>(&self, build: F) -> Result<Order>
	where
		F: FnOnce(OrderId) -> Order,
	{
		let id = self
			.storage
			.next_id(NAMESPACE)
			.await
			.map_err(Self::map_storage)?;
		let order = build(id);
		self.storage
			.store(NAMESPACE, id, &order)
			.await
			.map_err(Self::map_storage)?;
		Ok(order)
	}

	/// The single read path used by every transition.
	pub async fn get(&self, id: OrderId) -> Result<Order> {
		match self.storage.retrieve(NAMESPACE, id).await {
			Ok(order) => Ok(order),
			Err(StorageError::NotFound) => Err(MarketError::not_found("Order not found")),
			Err(e) => Err(Self::map_storage(e)),
		}
	}

	/// All orders, unsorted.
	pub async fn list(&self) -> Result<Vec<Order>> {
		self.storage
			.list_all(NAMESPACE)
			.await
			.map_err(Self::map_storage)
	}

	/// Applies a guarded mutation to one order under its write lock.
	///
	/// `apply` re-checks the transition guard against the freshly read row
	/// and either mutates it or fails; nothing is written on failure. Two
	/// racing transitions therefore serialize, and the loser sees the
	/// winner's status.
	pub async fn update_guarded<F>(&self, id: OrderId, apply: F) -> Result<Order>
	where
		F: FnOnce(&mut Order) -> Result<()>,
	{
		let lock = self.lock_for(id);
		let _guard = lock.lock().await;

		let mut order = self.get(id).await?;
		apply(&mut order)?;
		order.updated_at = Utc::now();

		self.storage
			.store(NAMESPACE, id, &order)
			.await
			.map_err(Self::map_storage)?;
		Ok(order)
	}
}

//! Storage module for the marketplace system.
//!
//! This module provides abstractions for persistent storage of marketplace
//! entities, supporting different backend implementations such as in-memory
//! or file-based storage. Entities are stored as JSON under `namespace:id`
//! keys; higher layers never touch raw bytes.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use implementations::file::FileStorage;
pub use implementations::memory::MemoryStorage;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Keys take the form `namespace:id`. `list_ids` enumerates the ids stored
/// under one namespace so repositories can implement filtered queries.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists all ids stored under the given namespace.
	async fn list_ids(&self, namespace: &str) -> Result<Vec<String>, StorageError>;
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed data with automatic
/// serialization/deserialization, plus monotonically increasing id sequences
/// per namespace.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
	/// Serializes read-increment-write cycles on the id sequences.
	sequence_lock: Mutex<()>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self {
			backend,
			sequence_lock: Mutex::new(()),
		}
	}

	fn key(namespace: &str, id: u64) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value under `namespace:id` as JSON.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: u64,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: u64,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: u64) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks whether `namespace:id` exists.
	pub async fn exists(&self, namespace: &str, id: u64) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Retrieves every value stored under a namespace.
	///
	/// An id that disappears between listing and retrieval is skipped rather
	/// than failing the whole scan.
	pub async fn list_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<T>, StorageError> {
		let ids = self.backend.list_ids(namespace).await?;
		let mut items = Vec::with_capacity(ids.len());
		for id in ids {
			match self.backend.get_bytes(&format!("{}:{}", namespace, id)).await {
				Ok(bytes) => {
					let item = serde_json::from_slice(&bytes)
						.map_err(|e| StorageError::Serialization(e.to_string()))?;
					items.push(item);
				}
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(items)
	}

	/// Returns the next id in the namespace's sequence, starting at 1.
	///
	/// The sequence itself is persisted, so restarts continue where the
	/// previous process stopped.
	pub async fn next_id(&self, namespace: &str) -> Result<u64, StorageError> {
		let _guard = self.sequence_lock.lock().await;
		let key = format!("sequences:{}", namespace);
		let current = match self.backend.get_bytes(&key).await {
			Ok(bytes) => serde_json::from_slice::<u64>(&bytes)
				.map_err(|e| StorageError::Serialization(e.to_string()))?,
			Err(StorageError::NotFound) => 0,
			Err(e) => return Err(e),
		};
		let next = current + 1;
		let bytes = serde_json::to_vec(&next)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await?;
		Ok(next)
	}
}

/// Factory function to create a storage backend from configuration.
///
/// Configuration parameters:
/// - `backend`: "memory" or "file" (default: "memory")
/// - `path`: Base directory for file storage (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Box<dyn StorageInterface> {
	let backend = config
		.get("backend")
		.and_then(|v| v.as_str())
		.unwrap_or("memory");

	match backend {
		"file" => {
			let path = config
				.get("path")
				.and_then(|v| v.as_str())
				.unwrap_or("./data/storage")
				.to_string();
			Box::new(FileStorage::new(path.into()))
		}
		_ => Box::new(MemoryStorage::new()),
	}
}

//! Error types for the marketplace system.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors surfaced by marketplace operations.
///
/// Every guard violation maps to a distinct variant so callers can tell a
/// missing entity from an authorization failure from an illegal transition.
#[derive(Error, Debug)]
pub enum MarketError {
	/// A referenced order, product, refund or notification does not exist.
	#[error("{0}")]
	NotFound(String),

	/// The caller is not a party authorized for this operation.
	#[error("{0}")]
	Forbidden(String),

	/// The entity is not in a status that permits the requested transition.
	#[error("{0}")]
	InvalidState(String),

	/// The request itself is malformed (bad rating, empty reason, ...).
	#[error("{0}")]
	Validation(String),

	#[error("Storage error: {0}")]
	Storage(String),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl MarketError {
	pub fn not_found(what: impl Into<String>) -> Self {
		Self::NotFound(what.into())
	}

	pub fn forbidden(msg: impl Into<String>) -> Self {
		Self::Forbidden(msg.into())
	}

	pub fn invalid_state(msg: impl Into<String>) -> Self {
		Self::InvalidState(msg.into())
	}
}

//! Chain verification outcome types.
//!
//! A verification outcome is a normal result value, never an error: an
//! unverifiable transaction is an expected business outcome. The adapter
//! converts every transport or parsing failure into `verified: false` with a
//! message instead of propagating it.

use serde::{Deserialize, Serialize};

/// Normalized outcome of checking a reported transaction against a chain
/// explorer or node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TransactionVerification {
	pub verified: bool,
	/// Transferred amount in display units ("4.00000000" ETH), when known.
	pub amount: Option<String>,
	pub from: Option<String>,
	pub to: Option<String>,
	pub confirmations: Option<u64>,
	pub block_number: Option<u64>,
	pub error: Option<String>,
}

impl TransactionVerification {
	/// An unverified outcome carrying only an explanation.
	pub fn failure(error: impl Into<String>) -> Self {
		Self {
			verified: false,
			error: Some(error.into()),
			..Default::default()
		}
	}
}

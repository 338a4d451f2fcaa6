//! Chain verification module for the marketplace system.
//!
//! This module bridges buyer-submitted proof-of-payment to a verification
//! outcome by querying the appropriate block explorer or node for the named
//! network. Verification failure is a normal result, not a fault: every
//! transport, parsing or lookup problem is downgraded to
//! `TransactionVerification { verified: false, error }` so an unverifiable
//! transaction can never abort the caller's order transition.

use async_trait::async_trait;
use market_types::TransactionVerification;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Re-export implementations
pub mod implementations {
	pub mod bitcoin;
	pub mod evm;
	pub mod solana;
}
pub mod units;

pub use implementations::bitcoin::BitcoinVerifier;
pub use implementations::evm::EvmVerifier;
pub use implementations::solana::SolanaVerifier;

/// Trait defining the interface for per-network verification backends.
///
/// Implementations query one chain's explorer or node and normalize the
/// response. They must swallow their own failures: `verify` has no error
/// channel by design.
#[async_trait]
pub trait ChainVerifier: Send + Sync {
	/// Canonical name of the network this verifier serves.
	fn network(&self) -> &str;

	/// Checks the given transaction reference on this network.
	async fn verify(&self, tx_hash: &str) -> TransactionVerification;
}

/// Resolves user-facing network names and aliases to canonical names.
///
/// Unknown names pass through lowercased so the dispatch failure message
/// can echo what the buyer actually submitted.
pub fn normalize_network(network: &str) -> String {
	let name = network.trim().to_lowercase();
	match name.as_str() {
		"eth" => "ethereum".to_string(),
		"binance" => "bsc".to_string(),
		"matic" => "polygon".to_string(),
		"sol" => "solana".to_string(),
		"btc" => "bitcoin".to_string(),
		_ => name,
	}
}

/// Boundary consumed by the order lifecycle engine.
///
/// Separated from [`VerificationService`] so the engine can be exercised
/// with scripted outcomes instead of live explorers.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
	async fn verify(&self, tx_hash: &str, network: &str) -> TransactionVerification;
}

/// Service that dispatches verification requests to registered backends.
pub struct VerificationService {
	/// Map of canonical network names to their verifiers.
	verifiers: HashMap<String, Arc<dyn ChainVerifier>>,
}

impl VerificationService {
	/// Creates a new VerificationService with the given backends.
	pub fn new(verifiers: Vec<Arc<dyn ChainVerifier>>) -> Self {
		let verifiers = verifiers
			.into_iter()
			.map(|v| (v.network().to_string(), v))
			.collect();
		Self { verifiers }
	}

	/// Verifies a transaction reference on the named network.
	///
	/// An unknown network resolves to an unverified outcome with a
	/// descriptive error rather than failing the caller.
	pub async fn verify(&self, tx_hash: &str, network: &str) -> TransactionVerification {
		let canonical = normalize_network(network);

		let Some(verifier) = self.verifiers.get(&canonical) else {
			return TransactionVerification::failure(format!(
				"Unsupported network: {}",
				network
			));
		};

		debug!("Verifying tx {} on {}", tx_hash, canonical);
		let outcome = verifier.verify(tx_hash).await;
		if !outcome.verified {
			warn!(
				"Verification of tx {} on {} failed: {}",
				tx_hash,
				canonical,
				outcome.error.as_deref().unwrap_or("unknown reason")
			);
		}
		outcome
	}

	/// Networks this service can verify, by canonical name.
	pub fn supported_networks(&self) -> Vec<String> {
		self.verifiers.keys().cloned().collect()
	}
}

#[async_trait]
impl PaymentVerifier for VerificationService {
	async fn verify(&self, tx_hash: &str, network: &str) -> TransactionVerification {
		VerificationService::verify(self, tx_hash, network).await
	}
}

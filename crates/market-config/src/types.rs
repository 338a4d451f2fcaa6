//! Configuration types for the marketplace service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete marketplace configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketConfig {
	/// Service identity and HTTP settings
	#[serde(default)]
	pub market: MarketSettings,
	/// Entity storage settings
	#[serde(default)]
	pub storage: StorageConfig,
	/// Chain verification settings
	#[serde(default)]
	pub verification: VerificationConfig,
}

impl Default for MarketConfig {
	fn default() -> Self {
		Self {
			market: MarketSettings::default(),
			storage: StorageConfig::default(),
			verification: VerificationConfig::default(),
		}
	}
}

/// Service identity and HTTP settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketSettings {
	/// Service name for logging
	#[serde(default = "default_name")]
	pub name: String,
	/// Port the HTTP API binds to
	#[serde(default = "default_http_port")]
	pub http_port: u16,
	/// Log level when RUST_LOG is unset
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

impl Default for MarketSettings {
	fn default() -> Self {
		Self {
			name: default_name(),
			http_port: default_http_port(),
			log_level: default_log_level(),
		}
	}
}

/// Entity storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Storage backend: "memory" or "file"
	#[serde(default = "default_backend")]
	pub backend: String,
	/// Base directory for the file backend
	#[serde(default = "default_storage_path")]
	pub path: String,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			backend: default_backend(),
			path: default_storage_path(),
		}
	}
}

/// Chain verification configuration.
///
/// EVM explorers share the Etherscan-compatible proxy API and are keyed by
/// canonical network name; aliases ("eth", "matic", ...) are resolved by the
/// verification service, not here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
	/// Timeout for outbound explorer/RPC calls in seconds
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
	/// Etherscan-compatible explorers by canonical network name
	#[serde(default = "default_evm_explorers")]
	pub evm: HashMap<String, EvmExplorerConfig>,
	/// Solana JSON-RPC endpoint
	#[serde(default = "default_solana_rpc_url")]
	pub solana_rpc_url: String,
	/// BlockCypher-compatible Bitcoin explorer base URL
	#[serde(default = "default_bitcoin_api_url")]
	pub bitcoin_api_url: String,
	/// BlockCypher API token (empty for anonymous access)
	#[serde(default)]
	pub blockcypher_token: String,
}

impl Default for VerificationConfig {
	fn default() -> Self {
		Self {
			timeout_secs: default_timeout_secs(),
			evm: default_evm_explorers(),
			solana_rpc_url: default_solana_rpc_url(),
			bitcoin_api_url: default_bitcoin_api_url(),
			blockcypher_token: String::new(),
		}
	}
}

/// One Etherscan-compatible explorer endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmExplorerConfig {
	/// Explorer API base URL
	pub api_url: String,
	/// Explorer API key; verification fails soft when empty
	#[serde(default)]
	pub api_key: String,
}

fn default_name() -> String {
	"skill-market".to_string()
}

fn default_http_port() -> u16 {
	3001
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_backend() -> String {
	"memory".to_string()
}

fn default_storage_path() -> String {
	"./data/storage".to_string()
}

fn default_timeout_secs() -> u64 {
	10
}

fn default_solana_rpc_url() -> String {
	"https://api.mainnet-beta.solana.com".to_string()
}

fn default_bitcoin_api_url() -> String {
	"https://api.blockcypher.com/v1/btc/main".to_string()
}

fn default_evm_explorers() -> HashMap<String, EvmExplorerConfig> {
	let mut evm = HashMap::new();
	evm.insert(
		"ethereum".to_string(),
		EvmExplorerConfig {
			api_url: "https://api.etherscan.io/api".to_string(),
			api_key: String::new(),
		},
	);
	evm.insert(
		"bsc".to_string(),
		EvmExplorerConfig {
			api_url: "https://api.bscscan.com/api".to_string(),
			api_key: String::new(),
		},
	);
	evm.insert(
		"polygon".to_string(),
		EvmExplorerConfig {
			api_url: "https://api.polygonscan.com/api".to_string(),
			api_key: String::new(),
		},
	);
	evm
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = MarketConfig::default();
		assert_eq!(config.market.name, "skill-market");
		assert_eq!(config.storage.backend, "memory");
		assert_eq!(config.verification.timeout_secs, 10);
		assert!(config.verification.evm.contains_key("ethereum"));
		assert!(config.verification.evm.contains_key("bsc"));
		assert!(config.verification.evm.contains_key("polygon"));
	}
}

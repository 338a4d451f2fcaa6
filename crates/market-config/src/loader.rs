//! Configuration loading from files and environment.

use crate::types::*;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
	/// Load configuration from file
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<MarketConfig> {
		let path = path.as_ref();

		let contents = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {:?}", path))?;

		let config = match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Self::from_toml(&contents)?,
			Some("json") => Self::from_json(&contents)?,
			Some("yaml") | Some("yml") => Self::from_yaml(&contents)?,
			_ => anyhow::bail!("Unsupported config format: {:?}", path),
		};

		Self::validate_config(&config)?;
		Ok(config)
	}

	/// Load from TOML string
	pub fn from_toml(contents: &str) -> Result<MarketConfig> {
		toml::from_str(contents).map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))
	}

	/// Load from JSON string
	pub fn from_json(contents: &str) -> Result<MarketConfig> {
		serde_json::from_str(contents).context("Failed to parse JSON")
	}

	/// Load from YAML string
	pub fn from_yaml(contents: &str) -> Result<MarketConfig> {
		serde_yaml::from_str(contents).context("Failed to parse YAML")
	}

	/// Load from environment variables with optional file override
	pub fn from_env_and_file(file_path: Option<&Path>) -> Result<MarketConfig> {
		let mut config = if let Some(path) = file_path {
			Self::from_file(path)?
		} else {
			MarketConfig::default()
		};

		Self::apply_env_overrides(&mut config);

		Self::validate_config(&config)?;
		Ok(config)
	}

	/// Apply environment variable overrides for secrets
	fn apply_env_overrides(config: &mut MarketConfig) {
		let explorer_keys = [
			("ethereum", "ETHERSCAN_API_KEY"),
			("bsc", "BSCSCAN_API_KEY"),
			("polygon", "POLYGONSCAN_API_KEY"),
		];
		for (network, var) in explorer_keys {
			if let Ok(key) = std::env::var(var) {
				debug!("Overriding {} explorer API key from environment", network);
				if let Some(explorer) = config.verification.evm.get_mut(network) {
					explorer.api_key = key;
				}
			}
		}

		if let Ok(url) = std::env::var("SOLANA_RPC_URL") {
			debug!("Overriding Solana RPC URL from environment");
			config.verification.solana_rpc_url = url;
		}

		if let Ok(token) = std::env::var("BLOCKCYPHER_TOKEN") {
			debug!("Overriding BlockCypher token from environment");
			config.verification.blockcypher_token = token;
		}
	}

	/// Validate configuration
	fn validate_config(config: &MarketConfig) -> Result<()> {
		match config.storage.backend.as_str() {
			"memory" | "file" => {}
			other => anyhow::bail!("Unknown storage backend '{}'", other),
		}

		if config.storage.backend == "file" && config.storage.path.is_empty() {
			anyhow::bail!("File storage backend requires a storage path");
		}

		if config.verification.timeout_secs == 0 {
			anyhow::bail!("Verification timeout must be at least 1 second");
		}

		for (network, explorer) in &config.verification.evm {
			if explorer.api_url.is_empty() {
				anyhow::bail!("Explorer API URL for '{}' is empty", network);
			}
		}

		Ok(())
	}
}

/// Load configuration from standard locations
pub fn load_config() -> Result<MarketConfig> {
	// Check for config file in order:
	// 1. Environment variable CONFIG_FILE
	// 2. ./config.toml
	// 3. ./config/market.toml
	// 4. Default config with env overrides

	if let Ok(path) = std::env::var("CONFIG_FILE") {
		return ConfigLoader::from_env_and_file(Some(Path::new(&path)));
	}

	let paths = ["./config.toml", "./config/market.toml"];

	for path in &paths {
		if Path::new(path).exists() {
			return ConfigLoader::from_env_and_file(Some(Path::new(path)));
		}
	}

	ConfigLoader::from_env_and_file(None)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_toml_parsing() {
		let toml = r#"
[market]
name = "test-market"
http_port = 4000
log_level = "debug"

[storage]
backend = "file"
path = "./data/test"

[verification]
timeout_secs = 5
solana_rpc_url = "https://rpc.test"
bitcoin_api_url = "https://btc.test/v1/btc/main"
blockcypher_token = "tok"

[verification.evm.ethereum]
api_url = "https://api.etherscan.io/api"
api_key = "abc"
"#;

		let config = ConfigLoader::from_toml(toml).unwrap();
		assert_eq!(config.market.name, "test-market");
		assert_eq!(config.market.http_port, 4000);
		assert_eq!(config.storage.backend, "file");
		assert_eq!(config.verification.timeout_secs, 5);
		assert_eq!(
			config.verification.evm.get("ethereum").unwrap().api_key,
			"abc"
		);
	}

	#[test]
	fn test_minimal_toml_uses_defaults() {
		let config = ConfigLoader::from_toml("[market]\nname = \"mini\"\n").unwrap();
		assert_eq!(config.market.name, "mini");
		assert_eq!(config.market.http_port, 3001);
		assert_eq!(config.storage.backend, "memory");
		assert_eq!(config.verification.evm.len(), 3);
	}

	#[test]
	fn test_json_parsing() {
		let json = r#"{
			"market": { "name": "json-market", "http_port": 8088, "log_level": "info" },
			"storage": { "backend": "memory", "path": "./data" },
			"verification": {}
		}"#;

		let config = ConfigLoader::from_json(json).unwrap();
		assert_eq!(config.market.name, "json-market");
		assert_eq!(config.market.http_port, 8088);
	}

	#[test]
	fn test_validation_rejects_unknown_backend() {
		let mut config = MarketConfig::default();
		config.storage.backend = "postgres".to_string();

		let result = ConfigLoader::validate_config(&config);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("Unknown storage backend"));
	}

	#[test]
	fn test_validation_rejects_zero_timeout() {
		let mut config = MarketConfig::default();
		config.verification.timeout_secs = 0;
		assert!(ConfigLoader::validate_config(&config).is_err());
	}
}

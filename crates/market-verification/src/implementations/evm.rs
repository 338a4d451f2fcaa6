//! EVM chain verification via Etherscan-compatible explorer APIs.
//!
//! One implementation serves every chain exposing the Etherscan proxy API
//! (Ethereum, BSC, Polygon): fetch the transaction, fetch its receipt, and
//! treat the payment as verified iff the receipt status is `0x1`.

use crate::units::{parse_hex_u256, parse_hex_u64, wei_to_display};
use crate::ChainVerifier;
use async_trait::async_trait;
use market_types::TransactionVerification;
use serde_json::Value;

/// Etherscan-compatible explorer verifier.
pub struct EvmVerifier {
	network: String,
	api_url: String,
	api_key: String,
	client: reqwest::Client,
}

impl EvmVerifier {
	pub fn new(
		network: impl Into<String>,
		api_url: impl Into<String>,
		api_key: impl Into<String>,
		client: reqwest::Client,
	) -> Self {
		Self {
			network: network.into(),
			api_url: api_url.into(),
			api_key: api_key.into(),
			client,
		}
	}

	async fn fetch_proxy(&self, action: &str, tx_hash: &str) -> Result<Value, String> {
		let url = format!(
			"{}?module=proxy&action={}&txhash={}&apikey={}",
			self.api_url, action, tx_hash, self.api_key
		);
		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| format!("Explorer request failed: {}", e))?;
		response
			.json::<Value>()
			.await
			.map_err(|e| format!("Explorer response was not valid JSON: {}", e))
	}
}

/// Interprets the transaction and receipt lookups into an outcome.
///
/// Split out from the HTTP path so explorer responses can be exercised from
/// fixtures.
pub fn interpret_evm_response(tx_data: &Value, receipt_data: &Value) -> TransactionVerification {
	let tx = match tx_data.get("result") {
		Some(tx) if !tx.is_null() => tx,
		_ => return TransactionVerification::failure("Transaction not found on blockchain"),
	};

	let from = tx.get("from").and_then(Value::as_str).map(str::to_string);
	let to = tx.get("to").and_then(Value::as_str).map(str::to_string);

	let receipt = receipt_data.get("result").filter(|r| !r.is_null());
	let succeeded = receipt
		.and_then(|r| r.get("status"))
		.and_then(Value::as_str)
		.map(|s| s == "0x1")
		.unwrap_or(false);

	if !succeeded {
		return TransactionVerification {
			verified: false,
			error: Some("Transaction failed or is still pending".to_string()),
			from,
			to,
			..Default::default()
		};
	}

	let amount = tx
		.get("value")
		.and_then(Value::as_str)
		.and_then(parse_hex_u256)
		.map(wei_to_display);

	let block_number = tx
		.get("blockNumber")
		.and_then(Value::as_str)
		.and_then(parse_hex_u64);

	TransactionVerification {
		verified: true,
		amount,
		from,
		to,
		block_number,
		// Confirmations are left for the caller to derive from the head block
		confirmations: None,
		error: None,
	}
}

#[async_trait]
impl ChainVerifier for EvmVerifier {
	fn network(&self) -> &str {
		&self.network
	}

	async fn verify(&self, tx_hash: &str) -> TransactionVerification {
		if self.api_key.is_empty() {
			return TransactionVerification::failure("Blockchain API key not configured");
		}

		let tx_data = match self.fetch_proxy("eth_getTransactionByHash", tx_hash).await {
			Ok(data) => data,
			Err(e) => return TransactionVerification::failure(e),
		};

		// Skip the receipt round-trip when the transaction does not exist
		if tx_data
			.get("result")
			.map(Value::is_null)
			.unwrap_or(true)
		{
			return TransactionVerification::failure("Transaction not found on blockchain");
		}

		let receipt_data = match self.fetch_proxy("eth_getTransactionReceipt", tx_hash).await {
			Ok(data) => data,
			Err(e) => return TransactionVerification::failure(e),
		};

		interpret_evm_response(&tx_data, &receipt_data)
	}
}

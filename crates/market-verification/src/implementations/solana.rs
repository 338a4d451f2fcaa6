//! Solana verification via the JSON-RPC `getTransaction` method.

use crate::units::lamports_to_sol;
use crate::ChainVerifier;
use async_trait::async_trait;
use market_types::TransactionVerification;
use serde_json::{json, Value};

/// Solana RPC verifier.
pub struct SolanaVerifier {
	rpc_url: String,
	client: reqwest::Client,
}

impl SolanaVerifier {
	pub fn new(rpc_url: impl Into<String>, client: reqwest::Client) -> Self {
		Self {
			rpc_url: rpc_url.into(),
			client,
		}
	}
}

/// Interprets a `getTransaction` RPC response into an outcome.
///
/// The transferred amount is reconstructed from the fee payer's balance
/// delta: what account 0 lost beyond the fee is what it sent.
pub fn interpret_solana_response(data: &Value) -> TransactionVerification {
	let result = match data.get("result") {
		Some(result) if !result.is_null() => result,
		_ => return TransactionVerification::failure("Transaction not found on Solana"),
	};

	let meta = result.get("meta").cloned().unwrap_or(Value::Null);
	if !meta
		.get("err")
		.map(Value::is_null)
		.unwrap_or(false)
	{
		return TransactionVerification::failure("Solana transaction failed");
	}

	let pre = meta
		.get("preBalances")
		.and_then(|b| b.get(0))
		.and_then(Value::as_u64)
		.unwrap_or(0);
	let post = meta
		.get("postBalances")
		.and_then(|b| b.get(0))
		.and_then(Value::as_u64)
		.unwrap_or(0);
	let fee = meta.get("fee").and_then(Value::as_u64).unwrap_or(0);

	let transfer_lamports = (pre as i128 - post as i128 - fee as i128).max(0) as u64;

	let confirmations = if result.get("slot").and_then(Value::as_u64).is_some() {
		1
	} else {
		0
	};

	TransactionVerification {
		verified: true,
		amount: Some(lamports_to_sol(transfer_lamports)),
		confirmations: Some(confirmations),
		..Default::default()
	}
}

#[async_trait]
impl ChainVerifier for SolanaVerifier {
	fn network(&self) -> &str {
		"solana"
	}

	async fn verify(&self, tx_hash: &str) -> TransactionVerification {
		let body = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": "getTransaction",
			"params": [tx_hash, { "encoding": "jsonParsed", "maxSupportedTransactionVersion": 0 }],
		});

		let response = match self.client.post(&self.rpc_url).json(&body).send().await {
			Ok(response) => response,
			Err(e) => {
				return TransactionVerification::failure(format!("Solana RPC request failed: {}", e))
			}
		};

		let data = match response.json::<Value>().await {
			Ok(data) => data,
			Err(e) => {
				return TransactionVerification::failure(format!(
					"Solana RPC response was not valid JSON: {}",
					e
				))
			}
		};

		interpret_solana_response(&data)
	}
}

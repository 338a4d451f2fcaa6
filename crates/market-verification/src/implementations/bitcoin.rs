//! Bitcoin verification via a BlockCypher-compatible explorer API.

use crate::units::satoshis_to_btc;
use crate::ChainVerifier;
use async_trait::async_trait;
use market_types::TransactionVerification;
use serde_json::Value;

/// BlockCypher explorer verifier.
pub struct BitcoinVerifier {
	api_url: String,
	token: String,
	client: reqwest::Client,
}

impl BitcoinVerifier {
	pub fn new(
		api_url: impl Into<String>,
		token: impl Into<String>,
		client: reqwest::Client,
	) -> Self {
		Self {
			api_url: api_url.into(),
			token: token.into(),
			client,
		}
	}
}

/// Interprets an explorer transaction document into an outcome.
///
/// A transaction counts as verified once the explorer marks it confirmed;
/// the amount is the total output value of the transaction.
pub fn interpret_bitcoin_response(data: &Value) -> TransactionVerification {
	let confirmations = data
		.get("confirmations")
		.and_then(Value::as_u64)
		.unwrap_or(0);

	if !data
		.get("confirmed")
		.and_then(Value::as_bool)
		.unwrap_or(false)
	{
		return TransactionVerification {
			verified: false,
			error: Some(format!(
				"Transaction unconfirmed ({} confirmations)",
				confirmations
			)),
			confirmations: Some(confirmations),
			..Default::default()
		};
	}

	let total = data.get("total").and_then(Value::as_u64).unwrap_or(0);

	TransactionVerification {
		verified: true,
		amount: Some(satoshis_to_btc(total)),
		confirmations: Some(confirmations),
		block_number: data.get("block_height").and_then(Value::as_u64),
		..Default::default()
	}
}

#[async_trait]
impl ChainVerifier for BitcoinVerifier {
	fn network(&self) -> &str {
		"bitcoin"
	}

	async fn verify(&self, tx_hash: &str) -> TransactionVerification {
		let mut url = format!("{}/txs/{}", self.api_url, tx_hash);
		if !self.token.is_empty() {
			url.push_str(&format!("?token={}", self.token));
		}

		let response = match self.client.get(&url).send().await {
			Ok(response) => response,
			Err(e) => {
				return TransactionVerification::failure(format!(
					"Explorer request failed: {}",
					e
				))
			}
		};

		if !response.status().is_success() {
			return TransactionVerification::failure("Transaction not found on Bitcoin network");
		}

		let data = match response.json::<Value>().await {
			Ok(data) => data,
			Err(e) => {
				return TransactionVerification::failure(format!(
					"Explorer response was not valid JSON: {}",
					e
				))
			}
		};

		interpret_bitcoin_response(&data)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn confirmed_transaction_reports_btc_total() {
		let data = json!({
			"confirmed": true,
			"confirmations": 6,
			"total": 123_456_789u64,
			"block_height": 850_123u64
		});

		let outcome = interpret_bitcoin_response(&data);
		assert!(outcome.verified);
		assert_eq!(outcome.amount.as_deref(), Some("1.23456789"));
		assert_eq!(outcome.confirmations, Some(6));
		assert_eq!(outcome.block_number, Some(850_123));
	}

	#[test]
	fn unconfirmed_transaction_reports_confirmation_count() {
		let data = json!({ "confirmed": false, "confirmations": 2, "total": 1000 });

		let outcome = interpret_bitcoin_response(&data);
		assert!(!outcome.verified);
		assert_eq!(
			outcome.error.as_deref(),
			Some("Transaction unconfirmed (2 confirmations)")
		);
		assert_eq!(outcome.confirmations, Some(2));
	}

	#[test]
	fn document_without_flags_is_treated_as_unconfirmed() {
		let outcome = interpret_bitcoin_response(&json!({}));
		assert!(!outcome.verified);
		assert_eq!(outcome.confirmations, Some(0));
	}
}

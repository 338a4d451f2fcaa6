//! Exact conversion from smallest-unit chain amounts to display units.
//!
//! Explorers report wei, lamports and satoshis; buyers and sellers read ETH,
//! SOL and BTC. The conversions here are pure integer arithmetic so a
//! transfer like 4 ETH formats as exactly "4.00000000", with the fixed
//! decimal precision conventional for each chain.

use alloy_primitives::U256;

/// Formats `value` in smallest units as a decimal string with `precision`
/// fractional digits, where one display unit equals `10^decimals` smallest
/// units. Digits beyond `precision` are truncated.
pub fn format_units(value: U256, decimals: u32, precision: usize) -> String {
	let divisor = U256::from(10u64).pow(U256::from(decimals));
	let whole = value / divisor;
	let frac = value % divisor;

	let frac_digits = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
	let mut frac_out: String = frac_digits.chars().take(precision).collect();
	while frac_out.len() < precision {
		frac_out.push('0');
	}

	format!("{}.{}", whole, frac_out)
}

/// Wei to ETH (or BNB/POL), 8 decimal places.
pub fn wei_to_display(value: U256) -> String {
	format_units(value, 18, 8)
}

/// Lamports to SOL, 9 decimal places.
pub fn lamports_to_sol(lamports: u64) -> String {
	format_units(U256::from(lamports), 9, 9)
}

/// Satoshis to BTC, 8 decimal places.
pub fn satoshis_to_btc(satoshis: u64) -> String {
	format_units(U256::from(satoshis), 8, 8)
}

/// Parses a 0x-prefixed hex quantity into a U256.
pub fn parse_hex_u256(value: &str) -> Option<U256> {
	let digits = value.strip_prefix("0x").unwrap_or(value);
	if digits.is_empty() {
		return None;
	}
	U256::from_str_radix(digits, 16).ok()
}

/// Parses a 0x-prefixed hex quantity into a u64 (block numbers etc).
pub fn parse_hex_u64(value: &str) -> Option<u64> {
	let digits = value.strip_prefix("0x").unwrap_or(value);
	if digits.is_empty() {
		return None;
	}
	u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn four_eth_in_wei_formats_exactly() {
		// 0x3782dace9d900000 wei == 4 ETH
		let value = parse_hex_u256("0x3782dace9d900000").unwrap();
		assert_eq!(wei_to_display(value), "4.00000000");
	}

	#[test]
	fn sub_unit_amounts_keep_leading_zeros() {
		// 1 gwei == 0.000000001 ETH, below the 8-decimal display precision
		assert_eq!(wei_to_display(U256::from(1_000_000_000u64)), "0.00000000");
		// 0.15 ETH
		assert_eq!(
			wei_to_display(U256::from(150_000_000_000_000_000u64)),
			"0.15000000"
		);
	}

	#[test]
	fn lamports_use_nine_decimals() {
		assert_eq!(lamports_to_sol(1_500_000_000), "1.500000000");
		assert_eq!(lamports_to_sol(1), "0.000000001");
	}

	#[test]
	fn satoshis_use_eight_decimals() {
		assert_eq!(satoshis_to_btc(123_456_789), "1.23456789");
		assert_eq!(satoshis_to_btc(0), "0.00000000");
	}

	#[test]
	fn hex_parsing_handles_malformed_input() {
		assert_eq!(parse_hex_u64("0x10"), Some(16));
		assert_eq!(parse_hex_u64("0x"), None);
		assert_eq!(parse_hex_u64("0xzz"), None);
		assert!(parse_hex_u256("0xde0b6b3a7640000").is_some());
	}
}

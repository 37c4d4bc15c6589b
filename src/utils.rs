//! Formatting and parsing helpers shared by the tool handlers.

use crate::errors::ServerError;
use ethers::types::{Address, H256, U256};
use ethers::utils::format_units;

/// Format a wei amount at the given number of decimals, trimming
/// trailing zeros ("22.500000000" -> "22.5", "21.000" -> "21").
pub fn format_amount(value: U256, decimals: u32) -> String {
    let s = format_units(value, decimals).unwrap_or_else(|_| value.to_string());
    trim_decimal(&s)
}

/// Wei to a human gwei string.
pub fn format_gwei(value: U256) -> String {
    format!("{} gwei", format_amount(value, 9))
}

/// Wei to a native amount at EVM precision (18 decimals).
pub fn format_ether(value: U256) -> String {
    format_amount(value, 18)
}

fn trim_decimal(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a 0x-prefixed EVM address. Non-EVM (e.g. bech32) addresses are
/// rejected here with a message naming the expected shape.
pub fn parse_address(input: &str) -> Result<Address, ServerError> {
    let s = input.trim();
    if !s.starts_with("0x") {
        return Err(ServerError::validation(format!(
            "'{}' is not an EVM address; expected 0x-prefixed 20-byte hex",
            input
        )));
    }
    s.parse::<Address>().map_err(|_| {
        ServerError::validation(format!(
            "'{}' is not a valid EVM address; expected 0x-prefixed 20-byte hex",
            input
        ))
    })
}

/// Parse a 0x-prefixed 32-byte transaction hash.
pub fn parse_tx_hash(input: &str) -> Result<H256, ServerError> {
    input.trim().parse::<H256>().map_err(|_| {
        ServerError::validation(format!(
            "'{}' is not a valid transaction hash; expected 0x-prefixed 32-byte hex",
            input
        ))
    })
}

/// Parse a decimal string into U256.
pub fn parse_decimal_u256(input: &str, field: &str) -> Result<U256, ServerError> {
    U256::from_dec_str(input.trim())
        .map_err(|_| ServerError::validation(format!("'{}' must be a decimal integer", field)))
}

/// Bucket an elapsed duration the way explorers do:
/// seconds, then minutes, then hours, then days.
pub fn humanize_age(seconds: u64) -> String {
    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else {
        format!("{} days ago", seconds / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_gwei_without_trailing_zeros() {
        assert_eq!(format_gwei(U256::from(22_500_000_000u64)), "22.5 gwei");
        assert_eq!(format_gwei(U256::from(18_000_000_000u64)), "18 gwei");
        assert_eq!(format_gwei(U256::from(33_750_000_000u64)), "33.75 gwei");
    }

    #[test]
    fn formats_ether_from_wei() {
        assert_eq!(format_ether(U256::from(567_000_000_000_000u64)), "0.000567");
        assert_eq!(format_ether(U256::exp10(18)), "1");
    }

    #[test]
    fn formats_six_decimal_native_amounts() {
        // Sibling-family balances are denominated at 6 decimals.
        assert_eq!(format_amount(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_amount(U256::from(42u64), 6), "0.000042");
    }

    #[test]
    fn rejects_bech32_addresses() {
        let err = parse_address("iota1qpg2xkj66wwgn8p2ggnp7p582gj8g6p79us5hve2tsudzpsr2ap4skprwjg");
        assert!(matches!(err, Err(ServerError::Validation(_))));
    }

    #[test]
    fn rejects_malformed_hex_addresses() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xZZ11570297eAca720f20f841e7a4161E0F8Bfa54").is_err());
    }

    #[test]
    fn accepts_checksummed_addresses() {
        assert!(parse_address("0x4e83362442B8d1beC281594CEA3050c8EB01311C").is_ok());
    }

    #[test]
    fn age_buckets() {
        assert_eq!(humanize_age(12), "12 seconds ago");
        assert_eq!(humanize_age(300), "5 minutes ago");
        assert_eq!(humanize_age(7200), "2 hours ago");
        assert_eq!(humanize_age(172800), "2 days ago");
    }
}

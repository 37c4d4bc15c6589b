// src/mcp/ops.rs
//
// Read operations shared by the tool surface and the resource surface.

use crate::blockchain::models::{BalanceInfo, NetworkStatus};
use crate::chains::NetworkDescriptor;
use crate::errors::ServerError;
use crate::utils::{format_amount, humanize_age, parse_address};
use crate::AppState;
use chrono::Utc;
use serde_json::{json, Value};

/// Registry entry plus a live chain-tip snapshot.
pub async fn network_info(
    state: &AppState,
    network: &NetworkDescriptor,
) -> Result<Value, ServerError> {
    let latest = state.client.block_number(network).await?;
    Ok(json!({
        "network": network,
        "latestBlock": latest.to_string(),
        "nativeToken": network.native_token,
        "isSiblingFamily": network.is_sibling_family,
    }))
}

/// Native balance, raw wei and formatted at the descriptor's decimals.
pub async fn balance_info(
    state: &AppState,
    network: &NetworkDescriptor,
    address: &str,
) -> Result<BalanceInfo, ServerError> {
    let address = parse_address(address)?;
    let raw = state.client.get_balance(network, address).await?;
    Ok(BalanceInfo {
        address: ethers::utils::to_checksum(&address, None),
        network: network.short_name.clone(),
        raw: raw.to_string(),
        formatted: format_amount(raw, network.native_token.decimals),
        symbol: network.native_token.symbol.clone(),
        decimals: network.native_token.decimals,
    })
}

/// Liveness verdict from the newest block's age; deterministic given
/// the same observation and clock.
pub fn status_from_tip(
    network: &NetworkDescriptor,
    number: u64,
    timestamp: u64,
    now_unix: u64,
) -> NetworkStatus {
    let delay = now_unix.saturating_sub(timestamp);
    let (status, finality) = if delay < 60 {
        ("healthy", "high")
    } else if delay < 300 {
        ("degraded", "moderate")
    } else {
        ("stalled", "low")
    };
    NetworkStatus {
        network: network.short_name.clone(),
        status: status.to_string(),
        latest_block: number.to_string(),
        block_timestamp: timestamp,
        block_delay: humanize_age(delay),
        finality: finality.to_string(),
    }
}

/// Liveness verdict from the age of the newest block.
pub async fn network_status(
    state: &AppState,
    network: &NetworkDescriptor,
) -> Result<NetworkStatus, ServerError> {
    let block = state.client.latest_block(network).await?;
    Ok(status_from_tip(
        network,
        block.number.map(|n| n.as_u64()).unwrap_or_default(),
        block.timestamp.as_u64(),
        Utc::now().timestamp() as u64,
    ))
}

/// Header-level view of the newest block.
pub async fn latest_block_summary(
    state: &AppState,
    network: &NetworkDescriptor,
) -> Result<Value, ServerError> {
    let block = state.client.latest_block(network).await?;
    let utilization_pct = if block.gas_limit.is_zero() {
        0.0
    } else {
        (block.gas_used.saturating_mul(ethers::types::U256::from(10_000u64)) / block.gas_limit)
            .as_u64() as f64
            / 100.0
    };
    Ok(json!({
        "network": network.short_name,
        "number": block.number.map(|n| n.as_u64()),
        "timestamp": block.timestamp.as_u64(),
        "txCount": block.transactions.len(),
        "gasUsed": block.gas_used.to_string(),
        "gasLimit": block.gas_limit.to_string(),
        "baseFeePerGas": block.base_fee_per_gas.map(|f| f.to_string()),
        "utilizationPct": utilization_pct,
    }))
}

/// Balance formatted from raw with the network's decimals; pure helper
/// kept separate so the invariant is directly testable.
pub fn format_native(raw: &str, decimals: u32) -> Option<String> {
    ethers::types::U256::from_dec_str(raw)
        .ok()
        .map(|v| format_amount(v, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainRegistry;

    #[test]
    fn fresh_tip_reads_healthy_with_high_finality() {
        let reg = ChainRegistry::new();
        let network = reg.resolve("iota").unwrap();
        let now = 1_754_000_000u64;
        let status = status_from_tip(network, 7_352_416, now - 12, now);
        assert_eq!(status.status, "healthy");
        assert_eq!(status.latest_block, "7352416");
        assert_eq!(status.block_delay, "12 seconds ago");
        assert_eq!(status.finality, "high");
    }

    #[test]
    fn stale_tip_degrades_then_stalls() {
        let reg = ChainRegistry::new();
        let network = reg.resolve("iota").unwrap();
        let now = 1_754_000_000u64;
        assert_eq!(status_from_tip(network, 1, now - 120, now).status, "degraded");
        let stalled = status_from_tip(network, 1, now - 7200, now);
        assert_eq!(stalled.status, "stalled");
        assert_eq!(stalled.finality, "low");
        assert_eq!(stalled.block_delay, "2 hours ago");
    }

    #[test]
    fn raw_over_ten_pow_decimals_equals_formatted() {
        // 1_234_567 raw at 6 decimals is 1.234567
        assert_eq!(format_native("1234567", 6).unwrap(), "1.234567");
        // 18-decimal chain
        assert_eq!(format_native("1000000000000000000", 18).unwrap(), "1");
        assert_eq!(format_native("0", 6).unwrap(), "0");
    }
}

// src/blockchain/services/gas.rs

use crate::blockchain::client::EvmClient;
use crate::blockchain::models::{BlockSample, Congestion, CostEstimate, GasQuote, GasSpeed};
use crate::chains::NetworkDescriptor;
use crate::errors::ServerError;
use crate::utils::{format_ether, format_gwei};
use chrono::Utc;
use ethers::types::U256;

/// Congestion tier from a single block's gas-used ratio.
pub fn congestion_tier(gas_used: U256, gas_limit: U256) -> Congestion {
    if gas_limit.is_zero() {
        return Congestion::Low;
    }
    // used/limit as parts per thousand keeps the comparison in integers.
    let permille = gas_used
        .saturating_mul(U256::from(1000u64))
        .checked_div(gas_limit)
        .unwrap_or_default();
    if permille <= U256::from(400u64) {
        Congestion::Low
    } else if permille <= U256::from(700u64) {
        Congestion::Medium
    } else {
        Congestion::High
    }
}

/// Fixed tier multipliers over the node's gas price:
/// slow 0.8x, standard 1x, fast 1.2x, instant 1.5x.
pub fn price_tiers(price: U256) -> (U256, U256, U256, U256) {
    let slow = price.saturating_mul(U256::from(4u64)) / U256::from(5u64);
    let fast = price.saturating_mul(U256::from(6u64)) / U256::from(5u64);
    let instant = price.saturating_mul(U256::from(3u64)) / U256::from(2u64);
    (slow, price, fast, instant)
}

pub fn tier_price(quote_price: U256, speed: GasSpeed) -> U256 {
    let (slow, standard, fast, instant) = price_tiers(quote_price);
    match speed {
        GasSpeed::Slow => slow,
        GasSpeed::Standard => standard,
        GasSpeed::Fast => fast,
        GasSpeed::Instant => instant,
    }
}

fn recommendation(congestion: Congestion) -> &'static str {
    match congestion {
        Congestion::Low => "Network is quiet; the slow tier should confirm promptly.",
        Congestion::Medium => "Moderate activity; use the standard tier for timely inclusion.",
        Congestion::High => "Network is congested; use fast or instant to avoid being outbid.",
    }
}

/// Assemble a quote from a gas price and the newest block sample.
/// Deterministic given the same observations.
pub fn build_quote(network: &str, price: U256, newest: &BlockSample) -> GasQuote {
    let congestion = congestion_tier(newest.gas_used, newest.gas_limit);
    let (slow, standard, fast, instant) = price_tiers(price);
    GasQuote {
        network: network.to_string(),
        base: newest
            .base_fee_per_gas
            .map(format_gwei)
            .unwrap_or_else(|| "0 gwei".to_string()),
        slow: format_gwei(slow),
        standard: format_gwei(standard),
        fast: format_gwei(fast),
        instant: format_gwei(instant),
        congestion,
        recommendation: recommendation(congestion).to_string(),
        taken_at: Utc::now(),
    }
}

/// Fetch the current gas price and newest block, then derive the tiers.
pub async fn gas_quote(
    client: &EvmClient,
    network: &NetworkDescriptor,
) -> Result<GasQuote, ServerError> {
    let (price, newest) = tokio::join!(client.gas_price(network), client.latest_block(network));
    let newest = BlockSample::from(&newest?);
    Ok(build_quote(&network.short_name, price?, &newest))
}

/// Cost of a transaction at a gas limit and price. The price is either
/// caller-supplied or one of the quote tiers; USD conversion is a stub
/// and stays null.
pub fn build_estimate(network: &str, gas_limit: U256, gas_price: U256) -> Result<CostEstimate, ServerError> {
    let total = gas_limit
        .checked_mul(gas_price)
        .ok_or_else(|| ServerError::logic("gas cost overflows U256"))?;
    Ok(CostEstimate {
        network: network.to_string(),
        gas_limit: gas_limit.to_string(),
        gas_price_wei: gas_price.to_string(),
        total_wei: total.to_string(),
        total_formatted: format_ether(total),
        usd_equivalent: None,
    })
}

pub async fn estimate_cost(
    client: &EvmClient,
    network: &NetworkDescriptor,
    gas_limit: U256,
    explicit_price: Option<U256>,
    speed: GasSpeed,
) -> Result<CostEstimate, ServerError> {
    let price = match explicit_price {
        Some(p) => p,
        None => tier_price(client.gas_price(network).await?, speed),
    };
    build_estimate(&network.short_name, gas_limit, price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(gas_used: u64, gas_limit: u64, base_fee: Option<u64>) -> BlockSample {
        BlockSample {
            number: 7_352_416,
            timestamp: 1_700_000_000,
            gas_used: U256::from(gas_used),
            gas_limit: U256::from(gas_limit),
            base_fee_per_gas: base_fee.map(U256::from),
            tx_count: 10,
        }
    }

    #[test]
    fn congestion_boundaries() {
        assert_eq!(
            congestion_tier(U256::from(40u64), U256::from(100u64)),
            Congestion::Low
        );
        assert_eq!(
            congestion_tier(U256::from(41u64), U256::from(100u64)),
            Congestion::Medium
        );
        assert_eq!(
            congestion_tier(U256::from(70u64), U256::from(100u64)),
            Congestion::Medium
        );
        assert_eq!(
            congestion_tier(U256::from(71u64), U256::from(100u64)),
            Congestion::High
        );
    }

    #[test]
    fn zero_gas_limit_is_not_a_division_error() {
        assert_eq!(congestion_tier(U256::from(5u64), U256::zero()), Congestion::Low);
    }

    #[test]
    fn quote_tiers_match_fixed_multipliers() {
        // 22.5 gwei node price, 30% full block, 22.1 gwei base fee
        let newest = sample(9_000_000, 30_000_000, Some(22_100_000_000));
        let quote = build_quote("iota", U256::from(22_500_000_000u64), &newest);
        assert_eq!(quote.slow, "18 gwei");
        assert_eq!(quote.standard, "22.5 gwei");
        assert_eq!(quote.fast, "27 gwei");
        assert_eq!(quote.instant, "33.75 gwei");
        assert_eq!(quote.congestion, Congestion::Low);
        assert_eq!(quote.base, "22.1 gwei");
    }

    #[test]
    fn missing_base_fee_reports_zero() {
        let newest = sample(1, 100, None);
        let quote = build_quote("iota", U256::from(1_000_000_000u64), &newest);
        assert_eq!(quote.base, "0 gwei");
    }

    #[test]
    fn fast_transfer_cost_at_six_decimal_display() {
        // 21000 gas at the fast tier of a 22.5 gwei quote = 27 gwei each
        let fast = tier_price(U256::from(22_500_000_000u64), GasSpeed::Fast);
        let estimate = build_estimate("iota", U256::from(21_000u64), fast).unwrap();
        assert_eq!(estimate.total_wei, "567000000000000");
        assert_eq!(estimate.total_formatted, "0.000567");
        assert_eq!(estimate.usd_equivalent, None);
    }
}

// src/blockchain/services/analytics.rs

use crate::blockchain::client::EvmClient;
use crate::blockchain::models::{
    BlockSample, NetworkComparison, NetworkGrowth, NetworkMetrics, RankedNetwork,
};
use crate::chains::NetworkDescriptor;
use crate::errors::ServerError;
use chrono::Utc;
use ethers::types::U256;
use futures::future::join_all;
use tracing::{debug, warn};

/// Default number of recent blocks sampled for metrics.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Reduced sample used for the secondary networks of a comparison.
pub const COMPARISON_SAMPLE_SIZE: usize = 10;

/// Concurrent block reads per batch.
const BATCH_SIZE: usize = 5;

/// Upper bound on intermediate blocks sampled by a growth estimate.
const GROWTH_SAMPLE_CAP: u64 = 50;

/// A node is healthy when its newest block is under a minute old.
const HEALTHY_BLOCK_AGE_S: u64 = 60;

/// Fetch the most recent `sample_size` block headers in batches of
/// [`BATCH_SIZE`]. Failed slots within a batch are dropped; the result
/// is whatever was obtained, ordered as fetched.
pub async fn gather_samples(
    client: &EvmClient,
    network: &NetworkDescriptor,
    sample_size: usize,
) -> Result<Vec<BlockSample>, ServerError> {
    let latest = client.block_number(network).await?;
    let first = latest.saturating_sub(sample_size.saturating_sub(1) as u64);
    let numbers: Vec<u64> = (first..=latest).collect();

    let mut samples = Vec::with_capacity(numbers.len());
    for batch in numbers.chunks(BATCH_SIZE) {
        let fetches = batch.iter().map(|n| client.block_by_number(network, *n));
        for (number, outcome) in batch.iter().zip(join_all(fetches).await) {
            match outcome {
                Ok(Some(block)) => samples.push(BlockSample::from(&block)),
                Ok(None) => debug!(network = %network.short_name, number, "block not yet available"),
                Err(e) => {
                    debug!(network = %network.short_name, number, error = %e, "dropping failed block fetch")
                }
            }
        }
    }
    Ok(samples)
}

/// Derive metrics from an observed sample. Deterministic: the same
/// samples, clock and gas price always produce the same record.
///
/// Fewer than two usable blocks degrades every rate to zero with
/// `healthy = false` rather than failing the request.
pub fn compute_metrics(
    network: &NetworkDescriptor,
    mut samples: Vec<BlockSample>,
    gas_price: U256,
    now_unix: u64,
) -> NetworkMetrics {
    samples.sort_by_key(|s| s.timestamp);
    let count = samples.len();

    let block_height = samples.iter().map(|s| s.number).max().unwrap_or(0);
    let token_info = network.native_token.clone();

    if count < 2 {
        return NetworkMetrics {
            network: network.short_name.clone(),
            block_height,
            sample_size: count,
            avg_block_time_s: 0.0,
            avg_tx_per_block: 0.0,
            recent_tps: 0.0,
            avg_gas_used: "0".to_string(),
            utilization_pct: 0.0,
            gas_price_wei: gas_price.to_string(),
            healthy: false,
            token_info,
        };
    }

    let newest = &samples[count - 1];
    let span: u64 = samples
        .windows(2)
        .map(|w| w[1].timestamp.saturating_sub(w[0].timestamp))
        .sum();
    let avg_block_time_s = span as f64 / (count - 1) as f64;

    let total_txs: usize = samples.iter().map(|s| s.tx_count).sum();
    let avg_tx_per_block = total_txs as f64 / count as f64;

    let recent_tps = if avg_block_time_s > 0.0 {
        avg_tx_per_block / avg_block_time_s
    } else {
        0.0
    };

    let total_gas: U256 = samples
        .iter()
        .fold(U256::zero(), |acc, s| acc.saturating_add(s.gas_used));
    let avg_gas_used = total_gas / U256::from(count as u64);

    // Reference capacity is the newest block's gas limit.
    let utilization_pct = if newest.gas_limit.is_zero() {
        0.0
    } else {
        let capacity = newest.gas_limit.saturating_mul(U256::from(count as u64));
        // Scale into per-myriad before the f64 conversion to keep precision.
        let scaled = total_gas.saturating_mul(U256::from(10_000u64)) / capacity;
        scaled.as_u64() as f64 / 100.0
    };

    let healthy = now_unix.saturating_sub(newest.timestamp) < HEALTHY_BLOCK_AGE_S;

    NetworkMetrics {
        network: network.short_name.clone(),
        block_height,
        sample_size: count,
        avg_block_time_s,
        avg_tx_per_block,
        recent_tps,
        avg_gas_used: avg_gas_used.to_string(),
        utilization_pct,
        gas_price_wei: gas_price.to_string(),
        healthy,
        token_info,
    }
}

/// Sample a network and derive its metrics.
pub async fn network_metrics(
    client: &EvmClient,
    network: &NetworkDescriptor,
    sample_size: usize,
) -> Result<NetworkMetrics, ServerError> {
    let (samples, gas_price) = tokio::join!(
        gather_samples(client, network, sample_size),
        client.gas_price(network)
    );
    let gas_price = gas_price.unwrap_or_default();
    Ok(compute_metrics(
        network,
        samples?,
        gas_price,
        Utc::now().timestamp() as u64,
    ))
}

fn zeroed_metrics(network: &NetworkDescriptor) -> NetworkMetrics {
    compute_metrics(network, Vec::new(), U256::zero(), 0)
}

fn ranking<F>(metrics: &[NetworkMetrics], value: F, descending: bool) -> Vec<RankedNetwork>
where
    F: Fn(&NetworkMetrics) -> f64,
{
    let mut ranked: Vec<RankedNetwork> = metrics
        .iter()
        .map(|m| RankedNetwork {
            network: m.network.clone(),
            value: value(m),
        })
        .collect();
    ranked.sort_by(|a, b| {
        let ord = a.value.partial_cmp(&b.value).unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    ranked
}

/// Rank the primary network against others. Each network is sampled in
/// its own task; a network that errors enters the rankings zeroed.
pub async fn compare_networks(
    client: &EvmClient,
    primary: &NetworkDescriptor,
    others: &[&NetworkDescriptor],
) -> NetworkComparison {
    let mut tasks = Vec::with_capacity(others.len() + 1);
    tasks.push(network_metrics(client, primary, DEFAULT_SAMPLE_SIZE));
    for network in others {
        tasks.push(network_metrics(client, network, COMPARISON_SAMPLE_SIZE));
    }

    let mut all: Vec<&NetworkDescriptor> = Vec::with_capacity(others.len() + 1);
    all.push(primary);
    all.extend(others.iter().copied());

    let metrics: Vec<NetworkMetrics> = join_all(tasks)
        .await
        .into_iter()
        .zip(all.iter())
        .map(|(outcome, network)| match outcome {
            Ok(m) => m,
            Err(e) => {
                warn!(network = %network.short_name, error = %e, "comparison sample failed; ranking with zeros");
                zeroed_metrics(network)
            }
        })
        .collect();

    NetworkComparison {
        primary: primary.short_name.clone(),
        tps_ranking: ranking(&metrics, |m| m.recent_tps, true),
        block_time_ranking: ranking(&metrics, |m| m.avg_block_time_s, false),
        gas_price_ranking: ranking(
            &metrics,
            |m| m.gas_price_wei.parse::<f64>().unwrap_or(0.0),
            false,
        ),
        utilization_ranking: ranking(&metrics, |m| m.utilization_pct, true),
        metrics,
    }
}

/// Estimate activity deltas between now and roughly `period_days` ago,
/// reading at most [`GROWTH_SAMPLE_CAP`] intermediate blocks.
pub async fn network_growth(
    client: &EvmClient,
    network: &NetworkDescriptor,
    period_days: u64,
) -> Result<NetworkGrowth, ServerError> {
    let period_days = period_days.max(1);
    let newest = client.latest_block(network).await?;
    let newest = BlockSample::from(&newest);

    // Estimate the period-old block height from recent block spacing.
    let recent = gather_samples(client, network, DEFAULT_SAMPLE_SIZE).await?;
    let recent_metrics = compute_metrics(network, recent, U256::zero(), newest.timestamp);
    let block_time = if recent_metrics.avg_block_time_s > 0.0 {
        recent_metrics.avg_block_time_s
    } else {
        return Err(ServerError::logic(
            "cannot estimate growth without a recent block-time baseline",
        ));
    };

    let span_blocks = ((period_days * 86_400) as f64 / block_time) as u64;
    let from_block = newest.number.saturating_sub(span_blocks);

    // Evenly spaced probe points across the period, capped.
    let probes = span_blocks.min(GROWTH_SAMPLE_CAP).max(2);
    let stride = span_blocks.max(1) / probes.max(1);
    let numbers: Vec<u64> = (0..probes)
        .map(|i| from_block + i * stride.max(1))
        .filter(|n| *n <= newest.number)
        .collect();

    let mut samples = Vec::with_capacity(numbers.len());
    for batch in numbers.chunks(BATCH_SIZE) {
        let fetches = batch.iter().map(|n| client.block_by_number(network, *n));
        for outcome in join_all(fetches).await {
            if let Ok(Some(block)) = outcome {
                samples.push(BlockSample::from(&block));
            }
        }
    }
    samples.sort_by_key(|s| s.number);
    if samples.len() < 2 {
        return Err(ServerError::logic(
            "too few probe blocks retrieved for a growth estimate",
        ));
    }

    let mid = samples.len() / 2;
    let early = compute_metrics(network, samples[..mid].to_vec(), U256::zero(), newest.timestamp);
    let late = compute_metrics(network, samples[mid..].to_vec(), U256::zero(), newest.timestamp);

    let elapsed_days = (newest.timestamp.saturating_sub(samples[0].timestamp)) as f64 / 86_400.0;
    let elapsed_days = if elapsed_days > 0.0 { elapsed_days } else { period_days as f64 };

    let blocks_spanned = newest.number.saturating_sub(samples[0].number);
    let daily_blocks = blocks_spanned as f64 / elapsed_days;
    let daily_transactions = daily_blocks * late.avg_tx_per_block;
    let avg_daily_tps = daily_transactions / 86_400.0;

    let block_time_improvement_pct = if early.avg_block_time_s > 0.0 {
        (early.avg_block_time_s - late.avg_block_time_s) / early.avg_block_time_s * 100.0
    } else {
        0.0
    };
    let tx_growth_rate_pct = if early.avg_tx_per_block > 0.0 {
        (late.avg_tx_per_block - early.avg_tx_per_block) / early.avg_tx_per_block * 100.0
    } else {
        0.0
    };

    Ok(NetworkGrowth {
        network: network.short_name.clone(),
        period_days,
        from_block: samples[0].number,
        to_block: newest.number,
        daily_blocks,
        daily_transactions,
        avg_daily_tps,
        block_time_improvement_pct,
        tx_growth_rate_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainRegistry;

    fn sample(number: u64, timestamp: u64, txs: usize, gas_used: u64, gas_limit: u64) -> BlockSample {
        BlockSample {
            number,
            timestamp,
            gas_used: U256::from(gas_used),
            gas_limit: U256::from(gas_limit),
            base_fee_per_gas: None,
            tx_count: txs,
        }
    }

    fn iota() -> NetworkDescriptor {
        ChainRegistry::new().resolve("iota").unwrap().clone()
    }

    #[test]
    fn steady_chain_metrics() {
        // 5 blocks, 2s apart, 10 txs each, half-full
        let samples: Vec<BlockSample> = (0..5)
            .map(|i| sample(100 + i, 1_000 + i * 2, 10, 15_000_000, 30_000_000))
            .collect();
        let m = compute_metrics(&iota(), samples, U256::from(1_000_000_000u64), 1_010);
        assert_eq!(m.sample_size, 5);
        assert!((m.avg_block_time_s - 2.0).abs() < 1e-9);
        assert!((m.avg_tx_per_block - 10.0).abs() < 1e-9);
        assert!((m.recent_tps - 5.0).abs() < 1e-9);
        assert!((m.utilization_pct - 50.0).abs() < 1e-9);
        assert!(m.healthy);
        assert_eq!(m.block_height, 104);
    }

    #[test]
    fn repeated_computation_is_deterministic() {
        let samples: Vec<BlockSample> = (0..5)
            .map(|i| sample(100 + i, 1_000 + i * 3, 7, 9_000_000, 30_000_000))
            .collect();
        let a = compute_metrics(&iota(), samples.clone(), U256::from(7u64), 2_000);
        let b = compute_metrics(&iota(), samples, U256::from(7u64), 2_000);
        assert_eq!(a.recent_tps, b.recent_tps);
        assert_eq!(a.utilization_pct, b.utilization_pct);
        assert_eq!(a.avg_gas_used, b.avg_gas_used);
    }

    #[test]
    fn unsorted_samples_are_ordered_before_differencing() {
        let samples = vec![
            sample(102, 1_004, 1, 1, 100),
            sample(100, 1_000, 1, 1, 100),
            sample(101, 1_002, 1, 1, 100),
        ];
        let m = compute_metrics(&iota(), samples, U256::zero(), 1_004);
        assert!((m.avg_block_time_s - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_sample_degrades_to_zeros() {
        let m = compute_metrics(&iota(), Vec::new(), U256::zero(), 1_000);
        assert_eq!(m.sample_size, 0);
        assert_eq!(m.recent_tps, 0.0);
        assert_eq!(m.avg_block_time_s, 0.0);
        assert!(!m.healthy);
    }

    #[test]
    fn single_block_degrades_to_zeros() {
        let m = compute_metrics(&iota(), vec![sample(1, 1_000, 5, 1, 2)], U256::zero(), 1_000);
        assert_eq!(m.sample_size, 1);
        assert_eq!(m.recent_tps, 0.0);
        assert!(!m.healthy);
    }

    #[test]
    fn zero_gas_limit_yields_zero_utilization() {
        let samples = vec![
            sample(100, 1_000, 1, 500, 0),
            sample(101, 1_002, 1, 500, 0),
        ];
        let m = compute_metrics(&iota(), samples, U256::zero(), 1_002);
        assert_eq!(m.utilization_pct, 0.0);
    }

    #[test]
    fn identical_timestamps_do_not_divide_by_zero() {
        let samples = vec![
            sample(100, 1_000, 8, 1, 100),
            sample(101, 1_000, 8, 1, 100),
        ];
        let m = compute_metrics(&iota(), samples, U256::zero(), 1_000);
        assert_eq!(m.avg_block_time_s, 0.0);
        assert_eq!(m.recent_tps, 0.0);
    }

    #[test]
    fn stale_tip_is_unhealthy() {
        let samples = vec![
            sample(100, 1_000, 1, 1, 100),
            sample(101, 1_002, 1, 1, 100),
        ];
        let m = compute_metrics(&iota(), samples, U256::zero(), 1_002 + 61);
        assert!(!m.healthy);
    }

    #[test]
    fn rankings_order_and_include_every_network() {
        let reg = ChainRegistry::new();
        let fast = compute_metrics(
            reg.resolve("iota").unwrap(),
            (0..3).map(|i| sample(i, 1_000 + i, 20, 1, 100)).collect(),
            U256::from(10u64),
            1_002,
        );
        let slow = compute_metrics(
            reg.resolve("ethereum").unwrap(),
            (0..3).map(|i| sample(i, 1_000 + i * 12, 20, 1, 100)).collect(),
            U256::from(30u64),
            1_024,
        );
        let metrics = vec![slow, fast];
        let tps = ranking(&metrics, |m| m.recent_tps, true);
        assert_eq!(tps.len(), 2);
        assert_eq!(tps[0].network, "iota");
        let gas = ranking(&metrics, |m| m.gas_price_wei.parse::<f64>().unwrap_or(0.0), false);
        assert_eq!(gas[0].network, "iota");
    }
}

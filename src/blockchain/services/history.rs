// src/blockchain/services/history.rs

use crate::blockchain::client::EvmClient;
use crate::blockchain::models::{
    AddressMetrics, GasEfficiency, SampledWindow, TransactionDetails, TxKind,
};
use crate::chains::NetworkDescriptor;
use crate::errors::ServerError;
use crate::utils::{format_amount, humanize_age};
use chrono::{DateTime, Utc};
use ethers::types::{Address, Block, Transaction, H256, U256};
use ethers::utils::to_checksum;
use futures::future::join_all;
use tracing::debug;

/// Upper bound on blocks walked by one scan.
pub const SCAN_BLOCK_CAP: usize = 50;

/// Concurrent block reads per batch.
const BATCH_SIZE: usize = 5;

/// Transactions inspected per block; oversized blocks are truncated.
pub const PER_BLOCK_TX_CAP: usize = 10;

const SELECTOR_ERC20_TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const SELECTOR_ERC20_APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
const SELECTOR_ERC721_TRANSFER_FROM: [u8; 4] = [0x23, 0xb8, 0x72, 0xdd];
const SELECTOR_ERC1155_SAFE_TRANSFER: [u8; 4] = [0xf2, 0x42, 0x43, 0x2a];

/// Label a transaction from its selector prefix and target.
/// Exhaustive: every input receives exactly one label.
pub fn classify(input: &[u8], to: Option<Address>) -> TxKind {
    if input.is_empty() || input == [0u8] {
        return TxKind::NativeTransfer;
    }
    if to.is_none() {
        return TxKind::ContractDeployment;
    }
    if input.len() >= 4 {
        let sel = &input[0..4];
        if sel == SELECTOR_ERC20_TRANSFER {
            return TxKind::Erc20Transfer;
        }
        if sel == SELECTOR_ERC20_APPROVE {
            return TxKind::TokenApproval;
        }
        if sel == SELECTOR_ERC721_TRANSFER_FROM {
            return TxKind::Erc721Transfer;
        }
        if sel == SELECTOR_ERC1155_SAFE_TRANSFER {
            return TxKind::Erc1155Transfer;
        }
    }
    TxKind::ContractInteraction
}

/// Bucket `gasUsed / gasLimit` the way block explorers label it.
pub fn gas_efficiency(gas_used: U256, gas_limit: U256) -> GasEfficiency {
    if gas_limit.is_zero() {
        return if gas_used.is_zero() {
            GasEfficiency::Excellent
        } else {
            GasEfficiency::Poor
        };
    }
    let permille = gas_used
        .saturating_mul(U256::from(1000u64))
        .checked_div(gas_limit)
        .unwrap_or_default();
    if permille < U256::from(600u64) {
        GasEfficiency::Excellent
    } else if permille < U256::from(800u64) {
        GasEfficiency::Good
    } else if permille < U256::from(950u64) {
        GasEfficiency::Fair
    } else {
        GasEfficiency::Poor
    }
}

/// One transaction retained by a block-window scan.
#[derive(Debug, Clone)]
pub struct ScannedTx {
    pub hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub block_number: u64,
    pub timestamp: u64,
    pub kind: TxKind,
}

/// Result of one bounded backward scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub txs: Vec<ScannedTx>,
    pub window: SampledWindow,
}

fn retain_from_block(block: &Block<Transaction>, out: &mut Vec<ScannedTx>) {
    let number = block.number.map(|n| n.as_u64()).unwrap_or_default();
    let timestamp = block.timestamp.as_u64();
    for tx in block.transactions.iter().take(PER_BLOCK_TX_CAP) {
        out.push(ScannedTx {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value: tx.value,
            block_number: number,
            timestamp,
            kind: classify(tx.input.as_ref(), tx.to),
        });
    }
}

/// Walk up to [`SCAN_BLOCK_CAP`] recent blocks with full transactions.
/// This is a scanner lower bound, not an index; the returned window
/// says exactly what was covered.
pub async fn scan_recent(
    client: &EvmClient,
    network: &NetworkDescriptor,
    max_blocks: usize,
) -> Result<ScanResult, ServerError> {
    let cap = max_blocks.min(SCAN_BLOCK_CAP).max(1);
    let latest = client.block_number(network).await?;
    let first = latest.saturating_sub(cap as u64 - 1);
    let numbers: Vec<u64> = (first..=latest).rev().collect();

    let mut txs = Vec::new();
    for batch in numbers.chunks(BATCH_SIZE) {
        let fetches = batch.iter().map(|n| client.block_with_txs(network, *n));
        for (number, outcome) in batch.iter().zip(join_all(fetches).await) {
            match outcome {
                Ok(Some(block)) => retain_from_block(&block, &mut txs),
                Ok(None) => {}
                Err(e) => {
                    debug!(network = %network.short_name, number, error = %e, "dropping failed block in scan")
                }
            }
        }
    }

    Ok(ScanResult {
        txs,
        window: SampledWindow {
            from_block: first,
            to_block: latest,
            scan_cap: cap,
            per_block_cap: PER_BLOCK_TX_CAP,
        },
    })
}

fn humanize_duration(seconds: u64) -> String {
    humanize_age(seconds)
        .trim_end_matches(" ago")
        .to_string()
}

/// Aggregate a scan window for one address. Counts are lower bounds by
/// construction; the window metadata travels with the record.
pub fn address_metrics(
    network: &NetworkDescriptor,
    address: Address,
    scan: &ScanResult,
    now_unix: u64,
) -> AddressMetrics {
    let mut sent = 0usize;
    let mut received = 0usize;
    let mut total_sent = U256::zero();
    let mut total_received = U256::zero();
    let mut first_ts: Option<u64> = None;
    let mut last_ts: Option<u64> = None;

    for tx in &scan.txs {
        let outbound = tx.from == address;
        let inbound = tx.to == Some(address);
        if !outbound && !inbound {
            continue;
        }
        if outbound {
            sent += 1;
            total_sent = total_sent.saturating_add(tx.value);
        }
        if inbound {
            received += 1;
            total_received = total_received.saturating_add(tx.value);
        }
        first_ts = Some(first_ts.map_or(tx.timestamp, |t| t.min(tx.timestamp)));
        last_ts = Some(last_ts.map_or(tx.timestamp, |t| t.max(tx.timestamp)));
    }

    let account_age = first_ts.map(|t| humanize_duration(now_unix.saturating_sub(t)));
    let to_datetime = |t: u64| DateTime::<Utc>::from_timestamp(t as i64, 0).unwrap_or(DateTime::UNIX_EPOCH);

    AddressMetrics {
        address: to_checksum(&address, None),
        network: network.short_name.clone(),
        tx_count: sent + received,
        sent,
        received,
        total_sent_wei: total_sent.to_string(),
        total_received_wei: total_received.to_string(),
        first_seen: first_ts.map(to_datetime),
        last_seen: last_ts.map(to_datetime),
        account_age,
        sampled_window: scan.window.clone(),
    }
}

/// Full detail view of one transaction: semantic label, receipt status,
/// gas efficiency, confirmations and age.
pub async fn transaction_details(
    client: &EvmClient,
    network: &NetworkDescriptor,
    hash: H256,
) -> Result<TransactionDetails, ServerError> {
    let (tx, receipt, latest) = tokio::join!(
        client.get_transaction(network, hash),
        client.get_receipt(network, hash),
        client.block_number(network)
    );
    let tx = tx?.ok_or_else(|| {
        ServerError::not_found(format!("transaction {:#x} on {}", hash, network.short_name))
    })?;
    let receipt = receipt?;
    let latest = latest?;

    let kind = classify(tx.input.as_ref(), tx.to);

    let (status, gas_used, gas_efficiency_label, confirmations) = match &receipt {
        Some(r) => {
            let status = match r.status.map(|s| s.as_u64()) {
                Some(1) => "success",
                Some(_) => "reverted",
                None => "unknown",
            };
            let used = r.gas_used.unwrap_or_default();
            let confirmations = r
                .block_number
                .map(|b| latest.saturating_sub(b.as_u64()))
                .unwrap_or(0);
            (
                status.to_string(),
                Some(used.to_string()),
                Some(gas_efficiency(used, tx.gas)),
                confirmations,
            )
        }
        None => ("pending".to_string(), None, None, 0),
    };

    // Block timestamp gives the age; a pending tx has neither.
    let age = match tx.block_number {
        Some(n) => client
            .block_by_number(network, n.as_u64())
            .await?
            .map(|b| humanize_age((Utc::now().timestamp() as u64).saturating_sub(b.timestamp.as_u64()))),
        None => None,
    };

    Ok(TransactionDetails {
        hash: format!("{:#x}", tx.hash),
        network: network.short_name.clone(),
        from: to_checksum(&tx.from, None),
        to: tx.to.map(|a| to_checksum(&a, None)),
        value_wei: tx.value.to_string(),
        value_formatted: format_amount(tx.value, network.native_token.decimals),
        kind,
        status,
        gas_limit: tx.gas.to_string(),
        gas_used,
        gas_efficiency: gas_efficiency_label,
        confirmations,
        age,
        block_number: tx.block_number.map(|n| n.as_u64()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainRegistry;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn iota() -> NetworkDescriptor {
        ChainRegistry::new().resolve("iota").unwrap().clone()
    }

    #[test]
    fn classifier_matches_selector_table() {
        let to = Some(addr(2));
        assert_eq!(classify(&[], to), TxKind::NativeTransfer);
        assert_eq!(classify(&[0u8], to), TxKind::NativeTransfer);
        assert_eq!(
            classify(&[0xa9, 0x05, 0x9c, 0xbb, 0, 0], to),
            TxKind::Erc20Transfer
        );
        assert_eq!(
            classify(&[0x09, 0x5e, 0xa7, 0xb3], to),
            TxKind::TokenApproval
        );
        assert_eq!(
            classify(&[0x23, 0xb8, 0x72, 0xdd], to),
            TxKind::Erc721Transfer
        );
        assert_eq!(
            classify(&[0xf2, 0x42, 0x43, 0x2a], to),
            TxKind::Erc1155Transfer
        );
        assert_eq!(classify(&[0xde, 0xad, 0xbe, 0xef], None), TxKind::ContractDeployment);
        assert_eq!(
            classify(&[0xde, 0xad, 0xbe, 0xef], to),
            TxKind::ContractInteraction
        );
        // Short calldata still gets a label.
        assert_eq!(classify(&[0x01], to), TxKind::ContractInteraction);
    }

    #[test]
    fn efficiency_buckets() {
        let limit = U256::from(100_000u64);
        assert_eq!(gas_efficiency(U256::from(59_999u64), limit), GasEfficiency::Excellent);
        assert_eq!(gas_efficiency(U256::from(60_000u64), limit), GasEfficiency::Good);
        assert_eq!(gas_efficiency(U256::from(79_999u64), limit), GasEfficiency::Good);
        assert_eq!(gas_efficiency(U256::from(80_000u64), limit), GasEfficiency::Fair);
        assert_eq!(gas_efficiency(U256::from(95_000u64), limit), GasEfficiency::Poor);
    }

    fn scan_with(txs: Vec<ScannedTx>) -> ScanResult {
        ScanResult {
            txs,
            window: SampledWindow {
                from_block: 100,
                to_block: 149,
                scan_cap: 50,
                per_block_cap: 10,
            },
        }
    }

    fn scanned(from: Address, to: Option<Address>, value: u64, ts: u64) -> ScannedTx {
        ScannedTx {
            hash: H256::zero(),
            from,
            to,
            value: U256::from(value),
            block_number: 120,
            timestamp: ts,
            kind: TxKind::NativeTransfer,
        }
    }

    #[test]
    fn address_metrics_sum_directional_flows() {
        let me = addr(1);
        let peer = addr(2);
        let scan = scan_with(vec![
            scanned(me, Some(peer), 500, 1_000),
            scanned(peer, Some(me), 300, 1_100),
            scanned(peer, Some(peer), 999, 1_200),
        ]);
        let m = address_metrics(&iota(), me, &scan, 1_500);
        assert_eq!(m.tx_count, 2);
        assert_eq!(m.sent, 1);
        assert_eq!(m.received, 1);
        assert_eq!(m.total_sent_wei, "500");
        assert_eq!(m.total_received_wei, "300");
        assert!(m.first_seen.is_some());
        assert_eq!(m.sampled_window.scan_cap, 50);
    }

    #[test]
    fn empty_window_yields_zero_metrics_without_timestamps() {
        let scan = scan_with(vec![scanned(addr(8), Some(addr(9)), 1, 1_000)]);
        let m = address_metrics(&iota(), addr(1), &scan, 1_500);
        assert_eq!(m.tx_count, 0);
        assert_eq!(m.sent, 0);
        assert_eq!(m.received, 0);
        assert!(m.first_seen.is_none());
        assert!(m.last_seen.is_none());
        assert!(m.account_age.is_none());
    }

    #[test]
    fn self_transfer_counts_both_directions() {
        let me = addr(1);
        let scan = scan_with(vec![scanned(me, Some(me), 100, 1_000)]);
        let m = address_metrics(&iota(), me, &scan, 1_000);
        assert_eq!(m.sent, 1);
        assert_eq!(m.received, 1);
        assert_eq!(m.tx_count, 2);
    }
}

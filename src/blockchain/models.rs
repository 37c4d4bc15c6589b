// src/blockchain/models.rs

use chrono::{DateTime, Utc};
use ethers::types::{Block, Transaction, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::chains::NativeToken;

// --- Block sampling ---

/// Minimal view of one sampled block; analytics are a deterministic
/// function of a slice of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSample {
    pub number: u64,
    pub timestamp: u64,
    pub gas_used: U256,
    pub gas_limit: U256,
    pub base_fee_per_gas: Option<U256>,
    pub tx_count: usize,
}

impl From<&Block<TxHash>> for BlockSample {
    fn from(block: &Block<TxHash>) -> Self {
        BlockSample {
            number: block.number.map(|n| n.as_u64()).unwrap_or_default(),
            timestamp: block.timestamp.as_u64(),
            gas_used: block.gas_used,
            gas_limit: block.gas_limit,
            base_fee_per_gas: block.base_fee_per_gas,
            tx_count: block.transactions.len(),
        }
    }
}

impl From<&Block<Transaction>> for BlockSample {
    fn from(block: &Block<Transaction>) -> Self {
        BlockSample {
            number: block.number.map(|n| n.as_u64()).unwrap_or_default(),
            timestamp: block.timestamp.as_u64(),
            gas_used: block.gas_used,
            gas_limit: block.gas_limit,
            base_fee_per_gas: block.base_fee_per_gas,
            tx_count: block.transactions.len(),
        }
    }
}

// --- Network analytics ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetrics {
    pub network: String,
    pub block_height: u64,
    pub sample_size: usize,
    pub avg_block_time_s: f64,
    pub avg_tx_per_block: f64,
    pub recent_tps: f64,
    pub avg_gas_used: String,
    pub utilization_pct: f64,
    pub gas_price_wei: String,
    pub healthy: bool,
    pub token_info: NativeToken,
}

/// One entry in a comparison ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedNetwork {
    pub network: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkComparison {
    pub primary: String,
    pub metrics: Vec<NetworkMetrics>,
    pub tps_ranking: Vec<RankedNetwork>,
    pub block_time_ranking: Vec<RankedNetwork>,
    pub gas_price_ranking: Vec<RankedNetwork>,
    pub utilization_ranking: Vec<RankedNetwork>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkGrowth {
    pub network: String,
    pub period_days: u64,
    pub from_block: u64,
    pub to_block: u64,
    pub daily_blocks: f64,
    pub daily_transactions: f64,
    pub avg_daily_tps: f64,
    pub block_time_improvement_pct: f64,
    pub tx_growth_rate_pct: f64,
}

// --- Gas ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Congestion {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasSpeed {
    Slow,
    Standard,
    Fast,
    Instant,
}

impl GasSpeed {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "slow" => Some(GasSpeed::Slow),
            "standard" => Some(GasSpeed::Standard),
            "fast" => Some(GasSpeed::Fast),
            "instant" => Some(GasSpeed::Instant),
            _ => None,
        }
    }
}

/// Tiered gas quote, all prices in native wei.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasQuote {
    pub network: String,
    pub base: String,
    pub slow: String,
    pub standard: String,
    pub fast: String,
    pub instant: String,
    pub congestion: Congestion,
    pub recommendation: String,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub network: String,
    pub gas_limit: String,
    pub gas_price_wei: String,
    pub total_wei: String,
    pub total_formatted: String,
    /// USD conversion is a stub; always null until a price oracle exists.
    pub usd_equivalent: Option<f64>,
}

// --- Historian ---

/// Semantic label derived from a transaction's selector prefix.
/// Exhaustive: every transaction receives exactly one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    #[serde(rename = "Native Token Transfer")]
    NativeTransfer,
    #[serde(rename = "ERC20 Transfer")]
    Erc20Transfer,
    #[serde(rename = "Token Approval")]
    TokenApproval,
    #[serde(rename = "ERC721 Transfer")]
    Erc721Transfer,
    #[serde(rename = "ERC1155 Transfer")]
    Erc1155Transfer,
    #[serde(rename = "Contract Deployment")]
    ContractDeployment,
    #[serde(rename = "Contract Interaction")]
    ContractInteraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasEfficiency {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub hash: String,
    pub network: String,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub value_wei: String,
    pub value_formatted: String,
    pub kind: TxKind,
    pub status: String,
    pub gas_limit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_efficiency: Option<GasEfficiency>,
    pub confirmations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// Window of blocks a scan actually covered. Attached to every address
/// metric so the figures read as a lower bound, never a lifetime total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampledWindow {
    pub from_block: u64,
    pub to_block: u64,
    pub scan_cap: usize,
    pub per_block_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressMetrics {
    pub address: String,
    pub network: String,
    pub tx_count: usize,
    pub sent: usize,
    pub received: usize,
    pub total_sent_wei: String,
    pub total_received_wei: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_age: Option<String>,
    pub sampled_window: SampledWindow,
}

// --- Balances ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceInfo {
    pub address: String,
    pub network: String,
    pub raw: String,
    pub formatted: String,
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub network: String,
    pub status: String,
    pub latest_block: String,
    pub block_timestamp: u64,
    pub block_delay: String,
    pub finality: String,
}

// --- Token & contract reader ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Metadata {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub total_supply: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFlags {
    pub external_calls: bool,
    pub self_destruct: bool,
    pub raw_send_transfer: bool,
    pub delegatecall: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAnalysis {
    pub address: String,
    pub network: String,
    pub is_contract: bool,
    pub implements: Vec<String>,
    pub functions: Vec<String>,
    pub events: Vec<String>,
    pub security: SecurityFlags,
}

// --- Arbitrage ---

/// One side of a directed arbitrage route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairLeg {
    pub network: String,
    pub price: f64,
    pub dex: String,
    pub liquidity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitragePair {
    pub token: String,
    pub base_token: String,
    pub buy: PairLeg,
    pub sell: PairLeg,
    pub profit_pct: f64,
    pub bridging_required: bool,
    pub taken_at: DateTime<Utc>,
}

/// Per-network price quote for one token, derived from pool reserves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenQuote {
    pub token: String,
    pub network: String,
    pub price: f64,
    pub price_formatted: String,
    pub base_token: String,
    pub dex: String,
    pub liquidity: String,
    pub taken_at: DateTime<Utc>,
}

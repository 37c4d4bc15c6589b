// src/blockchain/pools.rs

use serde::Serialize;
use std::collections::BTreeMap;

/// One canonical constant-product pool for a (token, network) pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolEntry {
    pub pair_address: String,
    pub dex_name: String,
    pub bridged_from_canonical: bool,
}

/// Static registry of the pools the arbitrage engine may quote.
/// Absence of a (symbol, network) entry means the token is not
/// quotable on that network.
#[derive(Debug, Clone)]
pub struct PoolRegistry {
    // symbol -> network short name -> pool
    pools: BTreeMap<String, BTreeMap<String, PoolEntry>>,
}

fn entry(pair_address: &str, dex_name: &str, bridged: bool) -> PoolEntry {
    PoolEntry {
        pair_address: pair_address.to_string(),
        dex_name: dex_name.to_string(),
        bridged_from_canonical: bridged,
    }
}

impl PoolRegistry {
    pub fn new() -> Self {
        let mut pools: BTreeMap<String, BTreeMap<String, PoolEntry>> = BTreeMap::new();

        let mut usdc = BTreeMap::new();
        usdc.insert(
            "iota".to_string(),
            entry(
                "0x3C844FB5AD27A078d945dDDA8076A4084A76E513",
                "MagicSea",
                true,
            ),
        );
        usdc.insert(
            "shimmer".to_string(),
            entry(
                "0x02eb23BDACb9cF4a80360cAbEc16B492d1aAD554",
                "ShimmerSea",
                true,
            ),
        );
        usdc.insert(
            "ethereum".to_string(),
            entry(
                "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc",
                "Uniswap V2",
                false,
            ),
        );
        usdc.insert(
            "bsc".to_string(),
            entry(
                "0xd99c7F6C65857AC913a8f880A4cb84032AB2FC5b",
                "PancakeSwap",
                true,
            ),
        );
        pools.insert("USDC".to_string(), usdc);

        let mut usdt = BTreeMap::new();
        usdt.insert(
            "iota".to_string(),
            entry(
                "0x8f0Ac48bC44Dcca7d6F3d3e73a09d26d5C392eF5",
                "MagicSea",
                true,
            ),
        );
        usdt.insert(
            "ethereum".to_string(),
            entry(
                "0x0d4a11d5EEaaC28EC3F61d100daF4d40471f1852",
                "Uniswap V2",
                false,
            ),
        );
        usdt.insert(
            "bsc".to_string(),
            entry(
                "0x16b9a82891338f9bA80E2D6970FddA79D1eb0daE",
                "PancakeSwap",
                true,
            ),
        );
        pools.insert("USDT".to_string(), usdt);

        let mut weth = BTreeMap::new();
        weth.insert(
            "iota".to_string(),
            entry(
                "0xA37Df22CE4e332B0e6c2b336A2D17Ac97bD0a304",
                "MagicSea",
                true,
            ),
        );
        weth.insert(
            "shimmer".to_string(),
            entry(
                "0x6C890075406AcD96aE50527D2E6F2A28ea0F83bE",
                "ShimmerSea",
                true,
            ),
        );
        weth.insert(
            "arbitrum".to_string(),
            entry(
                "0x905dfCD5649217c42684f23958568e533C711Aa3",
                "SushiSwap",
                false,
            ),
        );
        pools.insert("WETH".to_string(), weth);

        Self { pools }
    }

    pub fn entry(&self, symbol: &str, network: &str) -> Option<&PoolEntry> {
        self.pools
            .get(&symbol.to_uppercase())
            .and_then(|by_net| by_net.get(network))
    }

    /// Networks on which a symbol is quotable, in registry order.
    pub fn networks_for(&self, symbol: &str) -> Vec<String> {
        self.pools
            .get(&symbol.to_uppercase())
            .map(|by_net| by_net.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.pools.keys().cloned().collect()
    }

    /// Full registry view for the `list_arbitrage_tokens` tool.
    pub fn summary(&self) -> BTreeMap<String, BTreeMap<String, PoolEntry>> {
        self.pools.clone()
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainRegistry;

    #[test]
    fn every_pool_network_is_in_the_chain_registry() {
        let chains = ChainRegistry::new();
        let pools = PoolRegistry::new();
        for symbol in pools.symbols() {
            for network in pools.networks_for(&symbol) {
                assert!(
                    chains.resolve(&network).is_ok(),
                    "pool for {} references unknown network {}",
                    symbol,
                    network
                );
            }
        }
    }

    #[test]
    fn lookup_is_case_insensitive_on_symbol() {
        let pools = PoolRegistry::new();
        assert!(pools.entry("usdc", "iota").is_some());
        assert!(pools.entry("USDC", "iota").is_some());
        assert!(pools.entry("USDC", "avalanche").is_none());
    }

    #[test]
    fn absent_symbol_yields_no_networks() {
        let pools = PoolRegistry::new();
        assert!(pools.networks_for("DOGE").is_empty());
    }
}

// src/chains.rs

use crate::errors::ServerError;
use serde::{Deserialize, Serialize};

/// Chain ids of the sibling family, closed at registry build time.
pub const SIBLING_CHAIN_IDS: [u64; 3] = [8822, 148, 1075];

/// Short names of the sibling family, closed at registry build time.
pub const SIBLING_SHORT_NAMES: [&str; 3] = ["iota", "shimmer", "iota-testnet"];

/// Which member of the sibling family a network is, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiblingVariant {
    Mainnet,
    Testnet,
    AltMainnet,
    None,
}

/// Native token descriptor carried by every network entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeToken {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

/// Immutable description of one supported network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDescriptor {
    pub short_name: String,
    pub chain_id: u64,
    pub display_name: String,
    pub native_token: NativeToken,
    pub default_rpc_url: String,
    pub explorer_url: String,
    pub is_sibling_family: bool,
    pub sibling_variant: SiblingVariant,
}

fn network(
    short_name: &str,
    chain_id: u64,
    display_name: &str,
    token: (&str, &str, u32),
    rpc: &str,
    explorer: &str,
    variant: SiblingVariant,
) -> NetworkDescriptor {
    NetworkDescriptor {
        short_name: short_name.to_string(),
        chain_id,
        display_name: display_name.to_string(),
        native_token: NativeToken {
            name: token.0.to_string(),
            symbol: token.1.to_string(),
            decimals: token.2,
        },
        default_rpc_url: rpc.to_string(),
        explorer_url: explorer.to_string(),
        is_sibling_family: variant != SiblingVariant::None,
        sibling_variant: variant,
    }
}

/// Registry of every network the gateway can reach, keyed by short name
/// and chain id. Built once at startup; extending it is a code change.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    networks: Vec<NetworkDescriptor>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        let networks = vec![
            network(
                "iota",
                8822,
                "IOTA EVM",
                ("IOTA", "IOTA", 6),
                "https://json-rpc.evm.iotaledger.net",
                "https://explorer.evm.iota.org",
                SiblingVariant::Mainnet,
            ),
            network(
                "shimmer",
                148,
                "Shimmer EVM",
                ("Shimmer", "SMR", 6),
                "https://json-rpc.evm.shimmer.network",
                "https://explorer.evm.shimmer.network",
                SiblingVariant::AltMainnet,
            ),
            network(
                "iota-testnet",
                1075,
                "IOTA EVM Testnet",
                ("IOTA", "IOTA", 6),
                "https://json-rpc.evm.testnet.iotaledger.net",
                "https://explorer.evm.testnet.iotaledger.net",
                SiblingVariant::Testnet,
            ),
            network(
                "ethereum",
                1,
                "Ethereum Mainnet",
                ("Ether", "ETH", 18),
                "https://eth.llamarpc.com",
                "https://etherscan.io",
                SiblingVariant::None,
            ),
            network(
                "polygon",
                137,
                "Polygon PoS",
                ("POL", "POL", 18),
                "https://polygon-rpc.com",
                "https://polygonscan.com",
                SiblingVariant::None,
            ),
            network(
                "bsc",
                56,
                "BNB Smart Chain",
                ("BNB", "BNB", 18),
                "https://bsc-dataseed.bnbchain.org",
                "https://bscscan.com",
                SiblingVariant::None,
            ),
            network(
                "arbitrum",
                42161,
                "Arbitrum One",
                ("Ether", "ETH", 18),
                "https://arb1.arbitrum.io/rpc",
                "https://arbiscan.io",
                SiblingVariant::None,
            ),
            network(
                "base",
                8453,
                "Base",
                ("Ether", "ETH", 18),
                "https://mainnet.base.org",
                "https://basescan.org",
                SiblingVariant::None,
            ),
            network(
                "avalanche",
                43114,
                "Avalanche C-Chain",
                ("Avalanche", "AVAX", 18),
                "https://api.avax.network/ext/bc/C/rpc",
                "https://snowtrace.io",
                SiblingVariant::None,
            ),
        ];
        Self { networks }
    }

    /// Resolve a short name (case-insensitive) or decimal chain id string.
    pub fn resolve(&self, name_or_id: &str) -> Result<&NetworkDescriptor, ServerError> {
        let needle = name_or_id.trim().to_lowercase();
        if let Some(n) = self
            .networks
            .iter()
            .find(|n| n.short_name.to_lowercase() == needle)
        {
            return Ok(n);
        }
        if let Ok(id) = needle.parse::<u64>() {
            if let Some(n) = self.networks.iter().find(|n| n.chain_id == id) {
                return Ok(n);
            }
        }
        Err(ServerError::validation(format!(
            "unknown network '{}'. Supported: {}",
            name_or_id,
            self.networks
                .iter()
                .map(|n| n.short_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    pub fn resolve_id(&self, chain_id: u64) -> Result<&NetworkDescriptor, ServerError> {
        self.networks
            .iter()
            .find(|n| n.chain_id == chain_id)
            .ok_or_else(|| ServerError::validation(format!("unknown chain id {}", chain_id)))
    }

    pub fn list(&self) -> &[NetworkDescriptor] {
        &self.networks
    }

    /// Sibling-family membership by name or chain id, total over the
    /// closed set and false outside it.
    pub fn is_sibling(&self, name_or_id: &str) -> bool {
        let needle = name_or_id.trim().to_lowercase();
        if SIBLING_SHORT_NAMES.contains(&needle.as_str()) {
            return true;
        }
        needle
            .parse::<u64>()
            .map(|id| SIBLING_CHAIN_IDS.contains(&id))
            .unwrap_or(false)
    }

    /// The primary sibling network, used when a tool omits `network`.
    pub fn primary(&self) -> &NetworkDescriptor {
        &self.networks[0]
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_name_case_insensitive() {
        let reg = ChainRegistry::new();
        assert_eq!(reg.resolve("IOTA").unwrap().chain_id, 8822);
        assert_eq!(reg.resolve("Shimmer").unwrap().native_token.symbol, "SMR");
    }

    #[test]
    fn resolves_by_chain_id_string() {
        let reg = ChainRegistry::new();
        assert_eq!(reg.resolve("148").unwrap().short_name, "shimmer");
        assert_eq!(reg.resolve("1").unwrap().short_name, "ethereum");
    }

    #[test]
    fn unknown_network_is_a_validation_error() {
        let reg = ChainRegistry::new();
        assert!(matches!(
            reg.resolve("solana"),
            Err(crate::errors::ServerError::Validation(_))
        ));
    }

    #[test]
    fn sibling_classification_is_total_over_closed_set() {
        let reg = ChainRegistry::new();
        for name in SIBLING_SHORT_NAMES {
            assert!(reg.is_sibling(name));
        }
        for id in SIBLING_CHAIN_IDS {
            assert!(reg.is_sibling(&id.to_string()));
        }
        assert!(!reg.is_sibling("ethereum"));
        assert!(!reg.is_sibling("1"));
        assert!(!reg.is_sibling("42161"));
    }

    #[test]
    fn sibling_family_shares_six_decimals() {
        let reg = ChainRegistry::new();
        for n in reg.list().iter().filter(|n| n.is_sibling_family) {
            assert_eq!(n.native_token.decimals, 6);
        }
    }

    #[test]
    fn descriptor_round_trips_through_serde() {
        let reg = ChainRegistry::new();
        let original = reg.resolve("iota").unwrap();
        let json = serde_json::to_string(original).unwrap();
        let back: NetworkDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(*original, back);
    }
}

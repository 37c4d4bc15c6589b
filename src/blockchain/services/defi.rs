// src/blockchain/services/defi.rs

use crate::chains::NetworkDescriptor;
use crate::errors::ServerError;
use serde::Serialize;

/// One staking venue on a network.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingPool {
    pub name: String,
    pub token: String,
    pub apr_pct: f64,
    pub total_staked: String,
    pub min_stake: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingInfo {
    pub network: String,
    pub pools: Vec<StakingPool>,
    /// Where these figures came from. Synthesis of real inventories is
    /// a pluggable provider concern, not a gateway one.
    pub source: String,
}

/// Supplier of staking inventories. The dispatcher only depends on
/// this trait; swapping in a live indexer-backed provider is a
/// construction-time choice.
pub trait StakingProvider: Send + Sync {
    fn staking_info(&self, network: &NetworkDescriptor) -> Result<StakingInfo, ServerError>;
}

/// Built-in provider returning a static inventory for the sibling
/// family and declining elsewhere.
#[derive(Debug, Default)]
pub struct StaticStakingProvider;

impl StakingProvider for StaticStakingProvider {
    fn staking_info(&self, network: &NetworkDescriptor) -> Result<StakingInfo, ServerError> {
        if !network.is_sibling_family {
            return Err(ServerError::unsupported(format!(
                "staking inventory is only published for the IOTA family, not {}",
                network.short_name
            )));
        }
        let symbol = network.native_token.symbol.clone();
        Ok(StakingInfo {
            network: network.short_name.clone(),
            pools: vec![
                StakingPool {
                    name: format!("{} Native Staking", network.display_name),
                    token: symbol.clone(),
                    apr_pct: 6.5,
                    total_staked: "182000000".to_string(),
                    min_stake: "1".to_string(),
                },
                StakingPool {
                    name: "MagicSea LP Staking".to_string(),
                    token: format!("{}-USDC LP", symbol),
                    apr_pct: 14.2,
                    total_staked: "4200000".to_string(),
                    min_stake: "0.1".to_string(),
                },
            ],
            source: "static".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainRegistry;

    #[test]
    fn static_provider_serves_the_sibling_family_only() {
        let reg = ChainRegistry::new();
        let provider = StaticStakingProvider;
        let info = provider
            .staking_info(reg.resolve("shimmer").unwrap())
            .unwrap();
        assert_eq!(info.network, "shimmer");
        assert!(!info.pools.is_empty());
        assert!(provider
            .staking_info(reg.resolve("ethereum").unwrap())
            .is_err());
    }
}

// src/lib.rs

use std::sync::Arc;

// Re-export commonly used chain types
pub use ethers::types::{Address, H256, U256};

pub mod blockchain;
pub mod chains;
pub mod config;
pub mod errors;
pub mod mcp;
pub mod utils;

use blockchain::client::EvmClient;
use blockchain::pools::PoolRegistry;
use blockchain::services::defi::{StakingProvider, StaticStakingProvider};
use chains::ChainRegistry;
use config::Config;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Registry of supported networks
    pub chains: Arc<ChainRegistry>,
    /// Registry of quotable constant-product pools
    pub pools: Arc<PoolRegistry>,
    /// Lazily-connecting RPC client facade
    pub client: Arc<EvmClient>,
    /// Staking inventory provider (pluggable)
    pub staking: Arc<dyn StakingProvider>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let client = Arc::new(EvmClient::new(config.clone()));
        AppState {
            config,
            chains: Arc::new(ChainRegistry::new()),
            pools: Arc::new(PoolRegistry::new()),
            client,
            staking: Arc::new(StaticStakingProvider),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn test_state() -> AppState {
        AppState::new(Config::default())
    }
}

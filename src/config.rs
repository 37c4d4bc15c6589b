// src/config.rs

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;

/// Optional mTLS material for guarded upstream RPC endpoints. Threaded
/// into the RPC client factory at startup, never a process-wide global.
#[derive(Clone, Debug, Default)]
pub struct TlsMaterial {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub ca_path: Option<String>,
}

impl TlsMaterial {
    pub fn is_empty(&self) -> bool {
        self.cert_path.is_none() && self.key_path.is_none() && self.ca_path.is_none()
    }
}

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,
    pub host: String,

    /// Default network when a tool call omits `network`.
    pub default_chain_id: u64,

    /// RPC URL overrides for the sibling networks, keyed by chain id.
    pub rpc_url_overrides: HashMap<u64, String>,

    /// Bearer token for guarded sibling RPC endpoints.
    pub jwt_token: Option<String>,

    /// Seed phrase for the signer submodule only.
    pub mnemonic: Option<String>,

    pub tls: TlsMaterial,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();

        let mut rpc_url_overrides = HashMap::new();
        if let Ok(url) = env::var("IOTA_EVM_NODE_URL") {
            rpc_url_overrides.insert(8822, url);
        }
        if let Ok(url) = env::var("SHIMMER_EVM_NODE_URL") {
            rpc_url_overrides.insert(148, url);
        }
        if let Ok(url) = env::var("IOTA_EVM_TESTNET_NODE_URL") {
            rpc_url_overrides.insert(1075, url);
        }

        let default_chain_id = env::var("DEFAULT_CHAIN_ID")
            .unwrap_or_else(|_| "8822".to_string())
            .parse::<u64>()
            .context("DEFAULT_CHAIN_ID must be a valid number")?;

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            default_chain_id,
            rpc_url_overrides,
            jwt_token: env::var("IOTA_JWT_TOKEN").ok(),
            mnemonic: env::var("IOTA_MNEMONIC").ok(),
            tls: TlsMaterial {
                cert_path: env::var("SSL_CERT_PATH").ok(),
                key_path: env::var("SSL_KEY_PATH").ok(),
                ca_path: env::var("SSL_CA_PATH").ok(),
            },
        })
    }

    /// Effective RPC URL for a network: env override first, then the
    /// registry default.
    pub fn rpc_url_for(&self, chain_id: u64, default_url: &str) -> String {
        self.rpc_url_overrides
            .get(&chain_id)
            .cloned()
            .unwrap_or_else(|| default_url.to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            host: "127.0.0.1".to_string(),
            default_chain_id: 8822,
            rpc_url_overrides: HashMap::new(),
            jwt_token: None,
            mnemonic: None,
            tls: TlsMaterial::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_registry_default() {
        let mut config = Config::default();
        config
            .rpc_url_overrides
            .insert(8822, "https://private-node.internal".to_string());
        assert_eq!(
            config.rpc_url_for(8822, "https://json-rpc.evm.iotaledger.net"),
            "https://private-node.internal"
        );
        assert_eq!(
            config.rpc_url_for(148, "https://json-rpc.evm.shimmer.network"),
            "https://json-rpc.evm.shimmer.network"
        );
    }
}

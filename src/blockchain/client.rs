// src/blockchain/client.rs

use crate::chains::NetworkDescriptor;
use crate::config::{Config, TlsMaterial};
use crate::errors::ServerError;
use anyhow::{Context, Result};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Block, BlockNumber, Bytes, Transaction, TransactionReceipt, TxHash, H256, U256,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

/// Client for the read surface of every supported EVM network.
///
/// Providers are created lazily on first use, one per chain id, under a
/// single-winner write lock; afterwards access is read-only.
pub struct EvmClient {
    config: Config,
    providers: RwLock<HashMap<u64, Arc<Provider<Http>>>>,
}

impl EvmClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Provider for a network, building it on first use.
    pub async fn provider(
        &self,
        network: &NetworkDescriptor,
    ) -> Result<Arc<Provider<Http>>, ServerError> {
        {
            let providers = self.providers.read().await;
            if let Some(p) = providers.get(&network.chain_id) {
                return Ok(p.clone());
            }
        }

        let provider = Arc::new(self.build_provider(network).map_err(|e| {
            ServerError::upstream(format!(
                "failed to build RPC client for {}: {}",
                network.short_name, e
            ))
        })?);

        let mut providers = self.providers.write().await;
        // Another task may have won the race while we were building.
        Ok(providers
            .entry(network.chain_id)
            .or_insert(provider)
            .clone())
    }

    fn build_provider(&self, network: &NetworkDescriptor) -> Result<Provider<Http>> {
        let url_str = self
            .config
            .rpc_url_for(network.chain_id, &network.default_rpc_url);
        let url = Url::parse(&url_str).with_context(|| format!("invalid RPC URL for {}", network.short_name))?;

        let mut builder = reqwest::Client::builder();
        if network.is_sibling_family {
            if let Some(token) = &self.config.jwt_token {
                let mut headers = HeaderMap::new();
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("IOTA_JWT_TOKEN contains invalid header characters")?;
                headers.insert(AUTHORIZATION, value);
                builder = builder.default_headers(headers);
            }
        }
        builder = apply_tls(builder, &self.config.tls)?;

        let http_client = builder.build().context("failed to build HTTP client")?;
        debug!(network = %network.short_name, url = %url.host_str().unwrap_or(""), "initializing RPC provider");
        Ok(Provider::new(Http::new_with_client(url, http_client)))
    }

    pub async fn block_number(&self, network: &NetworkDescriptor) -> Result<u64, ServerError> {
        let provider = self.provider(network).await?;
        Ok(provider.get_block_number().await?.as_u64())
    }

    pub async fn latest_block(
        &self,
        network: &NetworkDescriptor,
    ) -> Result<Block<TxHash>, ServerError> {
        let provider = self.provider(network).await?;
        provider
            .get_block(BlockNumber::Latest)
            .await?
            .ok_or_else(|| ServerError::upstream("node returned no latest block"))
    }

    pub async fn latest_block_with_txs(
        &self,
        network: &NetworkDescriptor,
    ) -> Result<Block<Transaction>, ServerError> {
        let provider = self.provider(network).await?;
        provider
            .get_block_with_txs(BlockNumber::Latest)
            .await?
            .ok_or_else(|| ServerError::upstream("node returned no latest block"))
    }

    pub async fn block_by_number(
        &self,
        network: &NetworkDescriptor,
        number: u64,
    ) -> Result<Option<Block<TxHash>>, ServerError> {
        let provider = self.provider(network).await?;
        Ok(provider
            .get_block(BlockNumber::Number(number.into()))
            .await?)
    }

    pub async fn block_with_txs(
        &self,
        network: &NetworkDescriptor,
        number: u64,
    ) -> Result<Option<Block<Transaction>>, ServerError> {
        let provider = self.provider(network).await?;
        Ok(provider
            .get_block_with_txs(BlockNumber::Number(number.into()))
            .await?)
    }

    pub async fn get_transaction(
        &self,
        network: &NetworkDescriptor,
        hash: H256,
    ) -> Result<Option<Transaction>, ServerError> {
        let provider = self.provider(network).await?;
        Ok(provider.get_transaction(hash).await?)
    }

    pub async fn get_receipt(
        &self,
        network: &NetworkDescriptor,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, ServerError> {
        let provider = self.provider(network).await?;
        Ok(provider.get_transaction_receipt(hash).await?)
    }

    pub async fn get_balance(
        &self,
        network: &NetworkDescriptor,
        address: Address,
    ) -> Result<U256, ServerError> {
        let provider = self.provider(network).await?;
        Ok(provider.get_balance(address, None).await?)
    }

    pub async fn get_code(
        &self,
        network: &NetworkDescriptor,
        address: Address,
    ) -> Result<Bytes, ServerError> {
        let provider = self.provider(network).await?;
        Ok(provider.get_code(address, None).await?)
    }

    pub async fn gas_price(&self, network: &NetworkDescriptor) -> Result<U256, ServerError> {
        let provider = self.provider(network).await?;
        Ok(provider.get_gas_price().await?)
    }

    pub async fn estimate_gas(
        &self,
        network: &NetworkDescriptor,
        tx: &TypedTransaction,
    ) -> Result<U256, ServerError> {
        let provider = self.provider(network).await?;
        Ok(provider.estimate_gas(tx, None).await?)
    }

    /// Raw `eth_call` against a contract.
    pub async fn call(
        &self,
        network: &NetworkDescriptor,
        to: Address,
        data: Bytes,
    ) -> Result<Bytes, ServerError> {
        let provider = self.provider(network).await?;
        let tx = TypedTransaction::Legacy(
            ethers::types::TransactionRequest::new().to(to).data(data),
        );
        Ok(provider.call(&tx, None).await?)
    }
}

fn apply_tls(
    mut builder: reqwest::ClientBuilder,
    tls: &TlsMaterial,
) -> Result<reqwest::ClientBuilder> {
    if tls.is_empty() {
        return Ok(builder);
    }
    if let Some(ca_path) = &tls.ca_path {
        let pem = std::fs::read(ca_path).with_context(|| format!("reading SSL_CA_PATH {}", ca_path))?;
        let cert = reqwest::Certificate::from_pem(&pem).context("SSL_CA_PATH is not valid PEM")?;
        builder = builder.add_root_certificate(cert);
    }
    match (&tls.cert_path, &tls.key_path) {
        (Some(cert_path), Some(key_path)) => {
            let cert = std::fs::read(cert_path)
                .with_context(|| format!("reading SSL_CERT_PATH {}", cert_path))?;
            let key = std::fs::read(key_path)
                .with_context(|| format!("reading SSL_KEY_PATH {}", key_path))?;
            let identity = reqwest::Identity::from_pkcs8_pem(&cert, &key)
                .context("client certificate/key pair is not valid PKCS#8 PEM")?;
            builder = builder.identity(identity);
        }
        (None, None) => {}
        _ => {
            warn!("SSL_CERT_PATH and SSL_KEY_PATH must both be set; ignoring partial mTLS config");
        }
    }
    Ok(builder)
}

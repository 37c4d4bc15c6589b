// src/blockchain/signer.rs
//
// The only write path in the gateway. Kept deliberately thin: derive a
// wallet from the configured mnemonic, sign, submit, report the hash.

use crate::blockchain::client::EvmClient;
use crate::chains::NetworkDescriptor;
use crate::config::Config;
use crate::errors::ServerError;
use ethers::middleware::SignerMiddleware;
use ethers::providers::Middleware;
use ethers::signers::{coins_bip39::English, MnemonicBuilder, Signer};
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use ethers::utils::to_checksum;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    pub amount_wei: String,
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReceipt {
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    pub network: String,
}

fn wallet_from_config(
    config: &Config,
    network: &NetworkDescriptor,
) -> Result<ethers::signers::LocalWallet, ServerError> {
    let phrase = config.mnemonic.as_deref().ok_or_else(|| {
        ServerError::validation("IOTA_MNEMONIC is not configured; the signer is unavailable")
    })?;
    let wallet = MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .build()
        .map_err(|e| ServerError::validation(format!("IOTA_MNEMONIC is not a valid phrase: {}", e)))?;
    Ok(wallet.with_chain_id(network.chain_id))
}

/// Native-token value transfer signed with the configured mnemonic.
pub async fn transfer_native(
    client: &EvmClient,
    config: &Config,
    network: &NetworkDescriptor,
    to: Address,
    amount_wei: U256,
) -> Result<TransferReceipt, ServerError> {
    let wallet = wallet_from_config(config, network)?;
    let from = wallet.address();
    let provider = client.provider(network).await?;
    let signing = SignerMiddleware::new((*provider).clone(), wallet);

    let tx = TransactionRequest::new().from(from).to(to).value(amount_wei);
    let pending = signing
        .send_transaction(tx, None)
        .await
        .map_err(|e| ServerError::upstream(e.to_string()))?;
    let tx_hash = format!("{:#x}", *pending);
    info!(network = %network.short_name, tx_hash = %tx_hash, "submitted native transfer");

    Ok(TransferReceipt {
        tx_hash,
        from: to_checksum(&from, None),
        to: to_checksum(&to, None),
        amount_wei: amount_wei.to_string(),
        network: network.short_name.clone(),
    })
}

/// Deploy creation bytecode and wait for the inclusion receipt.
pub async fn deploy_contract(
    client: &EvmClient,
    config: &Config,
    network: &NetworkDescriptor,
    bytecode: Bytes,
) -> Result<DeployReceipt, ServerError> {
    if bytecode.is_empty() {
        return Err(ServerError::validation("deployment bytecode is empty"));
    }
    let wallet = wallet_from_config(config, network)?;
    let from = wallet.address();
    let provider = client.provider(network).await?;
    let signing = SignerMiddleware::new((*provider).clone(), wallet);

    let tx = TransactionRequest::new().from(from).data(bytecode);
    let pending = signing
        .send_transaction(tx, None)
        .await
        .map_err(|e| ServerError::upstream(e.to_string()))?;
    let tx_hash = format!("{:#x}", *pending);

    let receipt = pending
        .await
        .map_err(|e| ServerError::upstream(e.to_string()))?;
    let contract_address = receipt
        .and_then(|r| r.contract_address)
        .map(|a| to_checksum(&a, None));
    info!(network = %network.short_name, tx_hash = %tx_hash, ?contract_address, "contract deployed");

    Ok(DeployReceipt {
        tx_hash,
        contract_address,
        network: network.short_name.clone(),
    })
}

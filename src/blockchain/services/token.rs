// src/blockchain/services/token.rs

use crate::blockchain::client::EvmClient;
use crate::blockchain::models::Erc20Metadata;
use crate::chains::NetworkDescriptor;
use crate::errors::ServerError;
use ethers::abi::{decode, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::{keccak256, to_checksum};
use tracing::debug;

fn selector(sig: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(sig.as_bytes())[0..4]);
    sel
}

fn call_data(sig: &str) -> Bytes {
    Bytes::from(selector(sig).to_vec())
}

fn decode_string(raw: &Bytes) -> Option<String> {
    if let Ok(tokens) = decode(&[ParamType::String], raw) {
        if let Some(Token::String(s)) = tokens.first() {
            return Some(s.clone());
        }
    }
    // Some older tokens answer with bytes32; strip the zero padding.
    if let Ok(tokens) = decode(&[ParamType::FixedBytes(32)], raw) {
        if let Some(Token::FixedBytes(b)) = tokens.first() {
            let s: Vec<u8> = b.iter().copied().take_while(|c| *c != 0).collect();
            return String::from_utf8(s).ok();
        }
    }
    None
}

fn decode_u256(raw: &Bytes) -> Option<U256> {
    if let Ok(tokens) = decode(&[ParamType::Uint(256)], raw) {
        if let Some(Token::Uint(n)) = tokens.first() {
            return Some(*n);
        }
    }
    None
}

/// Read the four standard fungible-token view functions concurrently.
///
/// Each field that fails to decode falls back to its default
/// (`Unknown`, 18 decimals, zero supply). When the queried address is a
/// sibling network's native wrapper and every call reverts, the answer
/// comes from the registry-declared native token instead, so native
/// balance queries stay meaningful with an unreachable wrapper.
pub async fn erc20_metadata(
    client: &EvmClient,
    network: &NetworkDescriptor,
    token: Address,
) -> Result<Erc20Metadata, ServerError> {
    let (name_raw, symbol_raw, decimals_raw, total_raw) = tokio::join!(
        client.call(network, token, call_data("name()")),
        client.call(network, token, call_data("symbol()")),
        client.call(network, token, call_data("decimals()")),
        client.call(network, token, call_data("totalSupply()")),
    );

    let all_failed = name_raw.is_err() && symbol_raw.is_err() && decimals_raw.is_err() && total_raw.is_err();
    if all_failed && network.is_sibling_family {
        debug!(
            network = %network.short_name,
            "native wrapper unreachable; answering from registry descriptor"
        );
        return Ok(Erc20Metadata {
            address: to_checksum(&token, None),
            name: network.native_token.name.clone(),
            symbol: network.native_token.symbol.clone(),
            decimals: network.native_token.decimals,
            total_supply: "0".to_string(),
        });
    }

    let name = name_raw
        .ok()
        .as_ref()
        .and_then(decode_string)
        .unwrap_or_else(|| "Unknown".to_string());
    let symbol = symbol_raw
        .ok()
        .as_ref()
        .and_then(decode_string)
        .unwrap_or_else(|| "Unknown".to_string());
    let decimals = decimals_raw
        .ok()
        .as_ref()
        .and_then(decode_u256)
        .filter(|n| *n <= U256::from(255u64))
        .map(|n| n.as_u32())
        .unwrap_or(18);
    let total_supply = total_raw
        .ok()
        .as_ref()
        .and_then(decode_u256)
        .unwrap_or_default()
        .to_string();

    Ok(Erc20Metadata {
        address: to_checksum(&token, None),
        name,
        symbol,
        decimals,
        total_supply,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erc20_selectors_match_known_values() {
        assert_eq!(selector("name()"), [0x06, 0xfd, 0xde, 0x03]);
        assert_eq!(selector("symbol()"), [0x95, 0xd8, 0x9b, 0x41]);
        assert_eq!(selector("decimals()"), [0x31, 0x3c, 0xe5, 0x67]);
        assert_eq!(selector("totalSupply()"), [0x18, 0x16, 0x0d, 0xdd]);
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn decodes_abi_string() {
        // "USDC" ABI-encoded as a dynamic string
        let mut raw = vec![0u8; 96];
        raw[31] = 0x20;
        raw[63] = 4;
        raw[64..68].copy_from_slice(b"USDC");
        assert_eq!(decode_string(&Bytes::from(raw)), Some("USDC".to_string()));
    }

    #[test]
    fn decodes_bytes32_symbol() {
        // MKR-style bytes32 symbol
        let mut raw = vec![0u8; 32];
        raw[..3].copy_from_slice(b"MKR");
        assert_eq!(decode_string(&Bytes::from(raw)), Some("MKR".to_string()));
    }

    #[test]
    fn decodes_uint_word() {
        let mut raw = vec![0u8; 32];
        raw[31] = 6;
        assert_eq!(decode_u256(&Bytes::from(raw)), Some(U256::from(6)));
    }

    #[test]
    fn garbage_decodes_to_none() {
        assert_eq!(decode_u256(&Bytes::from(vec![1, 2, 3])), None);
        assert_eq!(decode_string(&Bytes::from(vec![1, 2, 3])), None);
    }
}

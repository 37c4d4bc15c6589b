// src/blockchain/services/contract.rs

use crate::blockchain::client::EvmClient;
use crate::blockchain::models::{ContractAnalysis, SecurityFlags};
use crate::chains::NetworkDescriptor;
use crate::errors::ServerError;
use ethers::types::Address;
use ethers::utils::to_checksum;
use serde_json::Value;
use std::collections::HashSet;

/// Required function signatures per recognized standard. A contract
/// implements a standard iff its declared ABI contains every signature
/// in the standard's closed set.
const STANDARDS: &[(&str, &[&str])] = &[
    (
        "ERC20",
        &[
            "totalSupply()",
            "balanceOf(address)",
            "transfer(address,uint256)",
            "transferFrom(address,address,uint256)",
            "approve(address,uint256)",
            "allowance(address,address)",
        ],
    ),
    (
        "ERC721",
        &[
            "balanceOf(address)",
            "ownerOf(uint256)",
            "safeTransferFrom(address,address,uint256)",
            "transferFrom(address,address,uint256)",
            "approve(address,uint256)",
            "getApproved(uint256)",
            "setApprovalForAll(address,bool)",
            "isApprovedForAll(address,address)",
        ],
    ),
    (
        "ERC1155",
        &[
            "balanceOf(address,uint256)",
            "balanceOfBatch(address[],uint256[])",
            "safeTransferFrom(address,address,uint256,uint256,bytes)",
            "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)",
            "setApprovalForAll(address,bool)",
            "isApprovedForAll(address,address)",
        ],
    ),
    (
        "ERC4626",
        &[
            "asset()",
            "totalAssets()",
            "convertToShares(uint256)",
            "convertToAssets(uint256)",
            "deposit(uint256,address)",
            "withdraw(uint256,address,address)",
        ],
    ),
    (
        "EIP2612",
        &[
            "permit(address,address,uint256,uint256,uint8,bytes32,bytes32)",
            "nonces(address)",
            "DOMAIN_SEPARATOR()",
        ],
    ),
    ("Ownable", &["owner()", "transferOwnership(address)"]),
    ("Pausable", &["paused()"]),
];

/// Canonical signature of one ABI entry: `name(type,type,...)`.
fn abi_signature(entry: &Value) -> Option<String> {
    let name = entry.get("name")?.as_str()?;
    let inputs = entry.get("inputs").and_then(|i| i.as_array());
    let params: Vec<&str> = inputs
        .map(|ins| {
            ins.iter()
                .filter_map(|p| p.get("type").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();
    Some(format!("{}({})", name, params.join(",")))
}

fn entry_kind(entry: &Value) -> Option<&str> {
    entry.get("type").and_then(|t| t.as_str())
}

/// Opcode-level heuristics over the deployed bytecode. These are
/// substring searches of the hex image and can false-positive on
/// embedded data; they flag candidates, they do not prove behavior.
pub fn security_flags(bytecode_hex: &str) -> SecurityFlags {
    let code = bytecode_hex.trim_start_matches("0x").to_lowercase();
    SecurityFlags {
        external_calls: code.contains("f1") || code.contains("fa"),
        self_destruct: code.contains("ff"),
        raw_send_transfer: code.contains("5af1"),
        delegatecall: code.contains("f4"),
    }
}

/// Classify a deployed contract against the recognized standard set.
pub async fn analyze(
    client: &EvmClient,
    network: &NetworkDescriptor,
    address: Address,
    abi: &[Value],
) -> Result<ContractAnalysis, ServerError> {
    let code = client.get_code(network, address).await?;

    if code.is_empty() {
        return Ok(ContractAnalysis {
            address: to_checksum(&address, None),
            network: network.short_name.clone(),
            is_contract: false,
            implements: Vec::new(),
            functions: Vec::new(),
            events: Vec::new(),
            security: SecurityFlags::default(),
        });
    }

    let mut functions = Vec::new();
    let mut events = Vec::new();
    let mut signatures = HashSet::new();
    for entry in abi {
        match entry_kind(entry) {
            Some("function") => {
                if let Some(sig) = abi_signature(entry) {
                    if let Some(name) = entry.get("name").and_then(|n| n.as_str()) {
                        functions.push(name.to_string());
                    }
                    signatures.insert(sig);
                }
            }
            Some("event") => {
                if let Some(name) = entry.get("name").and_then(|n| n.as_str()) {
                    events.push(name.to_string());
                }
            }
            _ => {}
        }
    }

    let implements = STANDARDS
        .iter()
        .filter(|(_, required)| required.iter().all(|sig| signatures.contains(*sig)))
        .map(|(name, _)| name.to_string())
        .collect();

    Ok(ContractAnalysis {
        address: to_checksum(&address, None),
        network: network.short_name.clone(),
        is_contract: true,
        implements,
        functions,
        events,
        security: security_flags(&format!("0x{}", hex::encode(&code))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn func(name: &str, types: &[&str]) -> Value {
        json!({
            "type": "function",
            "name": name,
            "inputs": types.iter().map(|t| json!({"type": t})).collect::<Vec<_>>()
        })
    }

    #[test]
    fn signature_includes_parameter_types() {
        let entry = func("transfer", &["address", "uint256"]);
        assert_eq!(
            abi_signature(&entry).unwrap(),
            "transfer(address,uint256)"
        );
        assert_eq!(abi_signature(&func("paused", &[])).unwrap(), "paused()");
    }

    #[test]
    fn full_erc20_abi_is_detected() {
        let abi = vec![
            func("totalSupply", &[]),
            func("balanceOf", &["address"]),
            func("transfer", &["address", "uint256"]),
            func("transferFrom", &["address", "address", "uint256"]),
            func("approve", &["address", "uint256"]),
            func("allowance", &["address", "address"]),
        ];
        let signatures: HashSet<String> = abi.iter().filter_map(abi_signature).collect();
        let (_, required) = STANDARDS.iter().find(|(n, _)| *n == "ERC20").unwrap();
        assert!(required.iter().all(|sig| signatures.contains(*sig)));
    }

    #[test]
    fn partial_erc20_abi_is_not_detected() {
        let abi = vec![func("transfer", &["address", "uint256"])];
        let signatures: HashSet<String> = abi.iter().filter_map(abi_signature).collect();
        let (_, required) = STANDARDS.iter().find(|(n, _)| *n == "ERC20").unwrap();
        assert!(!required.iter().all(|sig| signatures.contains(*sig)));
    }

    #[test]
    fn delegatecall_flag_from_bytecode() {
        let flags = security_flags("0x6080604052f4");
        assert!(flags.delegatecall);
        let clean = security_flags("0x60806052");
        assert!(!clean.delegatecall);
        assert!(!clean.self_destruct);
    }
}

//! # MCP Handler Module
//!
//! Dispatcher for the Model Context Protocol surface of the gateway.
//! Validates tool arguments against their schemas, routes to the
//! owning service, and wraps results (or typed errors) in the tool
//! envelope.
//!
//! ## Tools
//!
//! ### Network observation
//! - `get_iota_network_info` - registry entry plus chain-tip snapshot
//! - `verify_iota_network_status` - liveness verdict from block age
//! - `get_iota_gas_prices` - tiered gas quote with congestion signal
//! - `compare_iota_networks` - multi-network metric rankings
//! - `get_iota_network_growth` - period-over-period activity deltas
//!
//! ### Accounts & transactions
//! - `get_iota_balance` - native balance, raw and formatted
//! - `get_iota_address_metrics` - scan-window transfer activity
//! - `get_iota_transaction` - classified transaction detail
//! - `estimate_iota_transaction_cost` - gas cost projection
//! - `transfer_iota` - signed native transfer (signer submodule)
//!
//! ### Contracts & tokens
//! - `analyze_iota_smart_contract` - standard detection and security flags
//! - `get_iota_token_info` - fungible token metadata
//! - `deploy_iota_smart_contract` - bytecode deployment (signer submodule)
//! - `get_iota_staking_info` - staking inventory (pluggable provider)
//!
//! ### Cross-chain
//! - `get_cross_chain_token_price` - pool-derived spot price
//! - `find_arbitrage_opportunities` - directed profitable routes
//! - `list_arbitrage_tokens` - pool registry summary

use crate::blockchain::services::{analytics, arbitrage, contract, gas, history, token};
use crate::blockchain::signer;
use crate::blockchain::models::GasSpeed;
use crate::chains::NetworkDescriptor;
use crate::errors::ServerError;
use crate::mcp::args;
use crate::mcp::ops;
use crate::mcp::protocol::{error_codes, resource_contents, tool_error, tool_success, Request, Response};
use crate::mcp::resources;
use crate::utils::{parse_address, parse_decimal_u256, parse_tx_hash};
use crate::AppState;
use chrono::Utc;
use ethers::types::{Bytes, U256};
use serde_json::{json, Value};
use tracing::info;

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "ping" => Response::success(req.id.clone(), json!({})),
        "tools/list" => handle_tools_list(&req),
        "tools/call" => handle_tool_call(req, state).await,
        "resources/list" => Response::success(
            req.id.clone(),
            json!({ "resources": resources::resource_list() }),
        ),
        "resources/templates/list" => Response::success(
            req.id.clone(),
            json!({ "resourceTemplates": resources::resource_templates() }),
        ),
        "resources/read" => handle_resource_read(req, state).await,
        // Convenience aliases so a CLI can call a tool name directly;
        // rewritten into tools/call to reuse the same logic.
        name if TOOL_NAMES.contains(&name) => {
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": name,
                    "arguments": req.params.clone().unwrap_or_else(|| json!({}))
                })),
            };
            handle_tool_call(wrapped, state).await
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

const TOOL_NAMES: [&str; 17] = [
    "get_iota_network_info",
    "get_iota_balance",
    "transfer_iota",
    "get_iota_staking_info",
    "verify_iota_network_status",
    "get_iota_gas_prices",
    "estimate_iota_transaction_cost",
    "deploy_iota_smart_contract",
    "analyze_iota_smart_contract",
    "get_cross_chain_token_price",
    "find_arbitrage_opportunities",
    "list_arbitrage_tokens",
    "compare_iota_networks",
    "get_iota_network_growth",
    "get_iota_address_metrics",
    "get_iota_transaction",
    "get_iota_token_info",
];

/// Handles a 'tools/call' request by dispatching it to the correct tool logic.
async fn handle_tool_call(req: Request, state: AppState) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' field in params".into(),
            )
        }
    };

    if !TOOL_NAMES.contains(&tool_name) {
        return Response::error(
            req.id.clone(),
            error_codes::METHOD_NOT_FOUND,
            format!("Tool not found: {}", tool_name),
        );
    }

    let empty_args = json!({});
    let arguments = params.get("arguments").unwrap_or(&empty_args);

    // Every tool failure becomes an isError envelope, never a raw
    // exception or a bare protocol error.
    let envelope = match call_tool(tool_name, arguments, &state).await {
        Ok(payload) => tool_success(&payload),
        Err(e) => tool_error(format!("{} failed: {}", tool_name, e)),
    };
    Response::success(req.id, envelope)
}

async fn handle_resource_read(req: Request, state: AppState) -> Response {
    let uri = req
        .params
        .as_ref()
        .and_then(|p| p.get("uri"))
        .and_then(|u| u.as_str());
    let uri = match uri {
        Some(u) => u.to_string(),
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'uri' field in params".into(),
            )
        }
    };
    match resources::read_resource(&state, &uri).await {
        Ok(value) => Response::success(req.id, resource_contents(&uri, &value)),
        Err(e) => Response::error(
            req.id,
            error_codes::INVALID_PARAMS,
            format!("resources/read {} failed: {}", uri, e),
        ),
    }
}

/// Resolve the `network` argument, falling back to the configured
/// default chain.
fn resolve_network(state: &AppState, arguments: &Value) -> Result<NetworkDescriptor, ServerError> {
    match args::optional_str(arguments, "network") {
        Some(name) => state.chains.resolve(name).cloned(),
        None => state.chains.resolve_id(state.config.default_chain_id).cloned(),
    }
}

fn require_sibling(tool: &str, network: &NetworkDescriptor) -> Result<(), ServerError> {
    if network.is_sibling_family {
        Ok(())
    } else {
        Err(ServerError::validation(format!(
            "{} only operates on the IOTA family (iota, shimmer, iota-testnet); got '{}'",
            tool, network.short_name
        )))
    }
}

async fn call_tool(name: &str, arguments: &Value, state: &AppState) -> Result<Value, ServerError> {
    match name {
        "get_iota_network_info" => {
            let network = resolve_network(state, arguments)?;
            ops::network_info(state, &network).await
        }

        "get_iota_balance" => {
            let network = resolve_network(state, arguments)?;
            let address = args::required_str(arguments, "address")?;
            let info = ops::balance_info(state, &network, address).await?;
            Ok(json!(info))
        }

        "transfer_iota" => {
            let network = resolve_network(state, arguments)?;
            require_sibling("transfer_iota", &network)?;
            let to = parse_address(args::required_str(arguments, "toAddress")?)?;
            let amount = args::required_str(arguments, "amount")?;
            let wei: U256 = ethers::utils::parse_units(amount, network.native_token.decimals)
                .map_err(|_| {
                    ServerError::validation(format!(
                        "'amount' must be a decimal {} amount",
                        network.native_token.symbol
                    ))
                })?
                .into();
            let receipt =
                signer::transfer_native(state.client.as_ref(), &state.config, &network, to, wei)
                    .await?;
            Ok(json!(receipt))
        }

        "get_iota_staking_info" => {
            let network = resolve_network(state, arguments)?;
            let info = state.staking.staking_info(&network)?;
            Ok(json!(info))
        }

        "verify_iota_network_status" => {
            let network = resolve_network(state, arguments)?;
            let status = ops::network_status(state, &network).await?;
            Ok(json!(status))
        }

        "get_iota_gas_prices" => {
            let network = resolve_network(state, arguments)?;
            let quote = gas::gas_quote(state.client.as_ref(), &network).await?;
            Ok(json!(quote))
        }

        "estimate_iota_transaction_cost" => {
            let network = resolve_network(state, arguments)?;
            let gas_limit =
                parse_decimal_u256(args::required_str(arguments, "gasLimit")?, "gasLimit")?;
            let explicit_price = match args::optional_str(arguments, "gasPrice") {
                Some(p) => Some(parse_decimal_u256(p, "gasPrice")?),
                None => None,
            };
            let speed = args::optional_enum(
                arguments,
                "speed",
                &["slow", "standard", "fast", "instant"],
            )?
            .and_then(GasSpeed::parse)
            .unwrap_or(GasSpeed::Standard);
            let estimate = gas::estimate_cost(
                state.client.as_ref(),
                &network,
                gas_limit,
                explicit_price,
                speed,
            )
            .await?;
            Ok(json!({
                "estimate": estimate,
                "nativeSymbol": network.native_token.symbol,
            }))
        }

        "deploy_iota_smart_contract" => {
            let network = resolve_network(state, arguments)?;
            require_sibling("deploy_iota_smart_contract", &network)?;
            let bytecode_hex = args::required_str(arguments, "bytecode")?;
            let raw = hex::decode(bytecode_hex.trim_start_matches("0x"))
                .map_err(|_| ServerError::validation("'bytecode' must be hex"))?;
            let receipt = signer::deploy_contract(
                state.client.as_ref(),
                &state.config,
                &network,
                Bytes::from(raw),
            )
            .await?;
            Ok(json!(receipt))
        }

        "analyze_iota_smart_contract" => {
            let network = resolve_network(state, arguments)?;
            let address = parse_address(args::required_str(arguments, "contractAddress")?)?;
            let abi = args::required_array(arguments, "abi")?;
            let analysis = contract::analyze(state.client.as_ref(), &network, address, abi).await?;
            Ok(json!(analysis))
        }

        "get_cross_chain_token_price" => {
            let symbol = args::required_str(arguments, "token")?;
            let network = state
                .chains
                .resolve(args::required_str(arguments, "network")?)?
                .clone();
            let quote =
                arbitrage::quote_on_network(state.client.as_ref(), &state.pools, &network, symbol)
                    .await?;
            Ok(json!(quote))
        }

        "find_arbitrage_opportunities" => {
            let symbol = args::required_str(arguments, "token")?;
            let min_profit = args::optional_f64(arguments, "minProfitPercent")?
                .unwrap_or(arbitrage::DEFAULT_MIN_PROFIT_PCT);
            let networks = match args::optional_str_array(arguments, "networks")? {
                Some(list) => list,
                None => state.pools.networks_for(symbol),
            };
            let opportunities = arbitrage::find_opportunities(
                state.client.as_ref(),
                &state.chains,
                &state.pools,
                symbol,
                &networks,
                min_profit,
            )
            .await?;
            let preview: Vec<_> = opportunities.iter().take(3).collect();
            Ok(json!({
                "token": symbol.to_uppercase(),
                "minProfitPercent": min_profit,
                "networksConsidered": networks,
                "count": opportunities.len(),
                "topOpportunities": preview,
                "opportunities": opportunities,
            }))
        }

        "list_arbitrage_tokens" => {
            let summary = state.pools.summary();
            Ok(json!({
                "tokens": state.pools.symbols(),
                "pools": summary,
            }))
        }

        "compare_iota_networks" => {
            let primary = resolve_network(state, arguments)?;
            let other_names = match args::optional_str_array(arguments, "compareWith")? {
                Some(list) => list,
                None => state
                    .chains
                    .list()
                    .iter()
                    .filter(|n| n.is_sibling_family && n.chain_id != primary.chain_id)
                    .map(|n| n.short_name.clone())
                    .collect(),
            };
            let mut others = Vec::with_capacity(other_names.len());
            for name in &other_names {
                let descriptor = state.chains.resolve(name)?;
                if descriptor.chain_id != primary.chain_id {
                    others.push(descriptor);
                }
            }
            let comparison =
                analytics::compare_networks(state.client.as_ref(), &primary, &others).await;
            Ok(json!(comparison))
        }

        "get_iota_network_growth" => {
            let network = resolve_network(state, arguments)?;
            let period_days = args::optional_u64(arguments, "periodDays")?.unwrap_or(7);
            let growth =
                analytics::network_growth(state.client.as_ref(), &network, period_days).await?;
            Ok(json!(growth))
        }

        "get_iota_address_metrics" => {
            let network = resolve_network(state, arguments)?;
            let address = parse_address(args::required_str(arguments, "address")?)?;
            let max_blocks = args::optional_u64(arguments, "maxBlocks")?
                .unwrap_or(history::SCAN_BLOCK_CAP as u64) as usize;
            let scan =
                history::scan_recent(state.client.as_ref(), &network, max_blocks).await?;
            let metrics = history::address_metrics(
                &network,
                address,
                &scan,
                Utc::now().timestamp() as u64,
            );
            Ok(json!(metrics))
        }

        "get_iota_transaction" => {
            let network = resolve_network(state, arguments)?;
            let hash = parse_tx_hash(args::required_str(arguments, "txHash")?)?;
            let details =
                history::transaction_details(state.client.as_ref(), &network, hash).await?;
            Ok(json!(details))
        }

        "get_iota_token_info" => {
            let network = resolve_network(state, arguments)?;
            let address = parse_address(args::required_str(arguments, "tokenAddress")?)?;
            let metadata =
                token::erc20_metadata(state.client.as_ref(), &network, address).await?;
            Ok(json!(metadata))
        }

        other => Err(ServerError::not_found(format!("tool '{}'", other))),
    }
}

/// Handles the 'initialize' request.
fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": "iota-mcp-server",
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({
        "tools": { "listChanged": false },
        "resources": { "listChanged": false }
    });
    let instructions = "Gateway to the IOTA EVM family (IOTA EVM, Shimmer EVM, IOTA EVM Testnet) \
        and other EVM networks: balances, network analytics, gas quotes, contract analysis and \
        cross-chain arbitrage detection.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": "2025-06-18",
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

/// Handles the 'tools/list' request by returning a JSON definition of all available tools.
fn handle_tools_list(req: &Request) -> Response {
    let network_property = json!({
        "type": "string",
        "description": "Network short name or chain id (e.g. 'iota', 'shimmer', '8822'). Defaults to the configured network."
    });
    let tools = json!([
        {
            "name": "get_iota_network_info",
            "description": "Get the registry entry, latest block number and native token for a network.",
            "inputSchema": {
                "type": "object",
                "properties": { "network": network_property.clone() },
                "additionalProperties": false
            }
        },
        {
            "name": "get_iota_balance",
            "description": "Get the native token balance of an address, raw and formatted.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "address": {"type": "string", "description": "The 0x... address to check."},
                    "network": network_property.clone()
                },
                "required": ["address"],
                "additionalProperties": false
            }
        },
        {
            "name": "transfer_iota",
            "description": "Send native tokens from the server wallet on an IOTA family network.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "toAddress": {"type": "string", "description": "Recipient 0x... address."},
                    "amount": {"type": "string", "description": "Amount in native units (e.g. '1.5')."},
                    "network": network_property.clone()
                },
                "required": ["toAddress", "amount"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_iota_staking_info",
            "description": "List staking pools and rates on an IOTA family network.",
            "inputSchema": {
                "type": "object",
                "properties": { "network": network_property.clone() },
                "additionalProperties": false
            }
        },
        {
            "name": "verify_iota_network_status",
            "description": "Check liveness of a network from the age of its newest block.",
            "inputSchema": {
                "type": "object",
                "properties": { "network": network_property.clone() },
                "additionalProperties": false
            }
        },
        {
            "name": "get_iota_gas_prices",
            "description": "Get tiered gas prices (slow/standard/fast/instant) with a congestion signal.",
            "inputSchema": {
                "type": "object",
                "properties": { "network": network_property.clone() },
                "additionalProperties": false
            }
        },
        {
            "name": "estimate_iota_transaction_cost",
            "description": "Estimate the total cost of a transaction at a gas limit and speed tier.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "gasLimit": {"type": "string", "description": "Gas limit as a decimal string (e.g. '21000')."},
                    "gasPrice": {"type": "string", "description": "Explicit gas price in wei; overrides 'speed'."},
                    "speed": {"type": "string", "enum": ["slow", "standard", "fast", "instant"], "description": "Quote tier used when no explicit price is given."},
                    "network": network_property.clone()
                },
                "required": ["gasLimit"],
                "additionalProperties": false
            }
        },
        {
            "name": "deploy_iota_smart_contract",
            "description": "Deploy creation bytecode from the server wallet on an IOTA family network.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "bytecode": {"type": "string", "description": "0x-prefixed creation bytecode."},
                    "network": network_property.clone()
                },
                "required": ["bytecode"],
                "additionalProperties": false
            }
        },
        {
            "name": "analyze_iota_smart_contract",
            "description": "Classify a contract against ERC standards and flag risky opcode families.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "contractAddress": {"type": "string", "description": "Deployed contract address."},
                    "abi": {"type": "array", "description": "Contract ABI as a JSON array."},
                    "network": network_property.clone()
                },
                "required": ["contractAddress", "abi"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_cross_chain_token_price",
            "description": "Spot price of a token on one network, derived from its registered pool reserves.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "token": {"type": "string", "description": "Token symbol (e.g. 'USDC')."},
                    "network": network_property.clone()
                },
                "required": ["token", "network"],
                "additionalProperties": false
            }
        },
        {
            "name": "find_arbitrage_opportunities",
            "description": "Quote a token across networks and list directed routes above a profit threshold.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "token": {"type": "string", "description": "Token symbol to quote."},
                    "networks": {"type": "array", "items": {"type": "string"}, "description": "Candidate networks; defaults to every network with a registered pool."},
                    "minProfitPercent": {"type": "number", "description": "Minimum profit percent, default 1.0."}
                },
                "required": ["token"],
                "additionalProperties": false
            }
        },
        {
            "name": "list_arbitrage_tokens",
            "description": "List the tokens and pools the arbitrage engine can quote.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "compare_iota_networks",
            "description": "Rank networks by TPS, block time, gas price and utilization.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_property.clone(),
                    "compareWith": {"type": "array", "items": {"type": "string"}, "description": "Networks to compare against; defaults to the rest of the IOTA family."}
                },
                "additionalProperties": false
            }
        },
        {
            "name": "get_iota_network_growth",
            "description": "Estimate daily blocks, transactions and growth rates over a period.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "network": network_property.clone(),
                    "periodDays": {"type": "number", "description": "Look-back period in days, default 7."}
                },
                "additionalProperties": false
            }
        },
        {
            "name": "get_iota_address_metrics",
            "description": "Transfer activity of an address over a bounded recent-block scan (lower bound).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "address": {"type": "string", "description": "The 0x... address to inspect."},
                    "maxBlocks": {"type": "number", "description": "Blocks to scan, capped at 50."},
                    "network": network_property.clone()
                },
                "required": ["address"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_iota_transaction",
            "description": "Fetch and classify a transaction: label, status, gas efficiency, confirmations, age.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "txHash": {"type": "string", "description": "0x-prefixed transaction hash."},
                    "network": network_property.clone()
                },
                "required": ["txHash"],
                "additionalProperties": false
            }
        },
        {
            "name": "get_iota_token_info",
            "description": "Read name, symbol, decimals and total supply of a fungible token.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "tokenAddress": {"type": "string", "description": "Token contract address."},
                    "network": network_property.clone()
                },
                "required": ["tokenAddress"],
                "additionalProperties": false
            }
        },
    ]);
    Response::success(req.id.clone(), json!({ "tools": tools }))
}

// src/mcp/resources.rs
//
// URI-templated resource surface. Each template binds path variables
// and routes to the same core operations the tools use. Aliases
// without a {network} segment default to the primary sibling.

use crate::blockchain::services::history;
use crate::errors::ServerError;
use crate::mcp::ops;
use crate::utils::{parse_address, parse_tx_hash};
use crate::AppState;
use chrono::Utc;
use serde_json::{json, Value};

const SCHEME: &str = "iota://";

/// Templates advertised by `resources/templates/list`.
pub fn resource_templates() -> Value {
    json!([
        {
            "uriTemplate": "iota://{network}/info",
            "name": "Network information",
            "description": "Registry entry and chain-tip snapshot for a network",
            "mimeType": "application/json"
        },
        {
            "uriTemplate": "iota://{network}/block/latest",
            "name": "Latest block",
            "description": "Header-level view of the newest block",
            "mimeType": "application/json"
        },
        {
            "uriTemplate": "iota://{network}/address/{address}/balance",
            "name": "Native balance",
            "description": "Native token balance of an address, raw and formatted",
            "mimeType": "application/json"
        },
        {
            "uriTemplate": "iota://{network}/address/{address}/metrics",
            "name": "Address activity metrics",
            "description": "Recent-window transfer activity for an address (scanner lower bound)",
            "mimeType": "application/json"
        },
        {
            "uriTemplate": "iota://{network}/tx/{txHash}",
            "name": "Transaction details",
            "description": "Classified transaction with receipt, confirmations and age",
            "mimeType": "application/json"
        },
        {
            "uriTemplate": "iota://{network}/status",
            "name": "Network status",
            "description": "Liveness verdict from the newest block's age",
            "mimeType": "application/json"
        }
    ])
}

/// Bare resources advertised by `resources/list`; these are the
/// network-less aliases bound to the primary sibling.
pub fn resource_list() -> Value {
    json!([
        {
            "uri": "iota://info",
            "name": "IOTA EVM network information",
            "mimeType": "application/json"
        },
        {
            "uri": "iota://block/latest",
            "name": "IOTA EVM latest block",
            "mimeType": "application/json"
        },
        {
            "uri": "iota://status",
            "name": "IOTA EVM network status",
            "mimeType": "application/json"
        }
    ])
}

/// A parsed resource path: the owning network plus the route segments.
struct ResourcePath<'a> {
    network: String,
    segments: Vec<&'a str>,
}

/// Route heads a path may start with when the network segment is
/// omitted; the primary sibling is implied.
const ROUTE_HEADS: [&str; 5] = ["info", "block", "address", "tx", "status"];

fn parse_uri<'a>(state: &AppState, uri: &'a str) -> Result<ResourcePath<'a>, ServerError> {
    let rest = uri.strip_prefix(SCHEME).ok_or_else(|| {
        ServerError::validation(format!("unsupported resource URI '{}'; expected {}…", uri, SCHEME))
    })?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(ServerError::validation("resource URI has no path"));
    }
    if ROUTE_HEADS.contains(&segments[0]) {
        return Ok(ResourcePath {
            network: state.chains.primary().short_name.clone(),
            segments,
        });
    }
    // First segment names the network; the registry validates it.
    let network = state.chains.resolve(segments[0])?.short_name.clone();
    Ok(ResourcePath {
        network,
        segments: segments[1..].to_vec(),
    })
}

/// Resolve and read one resource URI.
pub async fn read_resource(state: &AppState, uri: &str) -> Result<Value, ServerError> {
    let path = parse_uri(state, uri)?;
    let network = state.chains.resolve(&path.network)?.clone();

    match path.segments.as_slice() {
        ["info"] => ops::network_info(state, &network).await,
        ["status"] => Ok(serde_json::to_value(ops::network_status(state, &network).await?)
            .unwrap_or(Value::Null)),
        ["block", "latest"] => ops::latest_block_summary(state, &network).await,
        ["address", address, "balance"] => {
            let info = ops::balance_info(state, &network, address).await?;
            Ok(serde_json::to_value(info).unwrap_or(Value::Null))
        }
        ["address", address, "metrics"] => {
            let address = parse_address(address)?;
            let scan = history::scan_recent(state.client.as_ref(), &network, history::SCAN_BLOCK_CAP).await?;
            let metrics = history::address_metrics(
                &network,
                address,
                &scan,
                Utc::now().timestamp() as u64,
            );
            Ok(serde_json::to_value(metrics).unwrap_or(Value::Null))
        }
        ["tx", hash] => {
            let hash = parse_tx_hash(hash)?;
            let details =
                history::transaction_details(state.client.as_ref(), &network, hash).await?;
            Ok(serde_json::to_value(details).unwrap_or(Value::Null))
        }
        _ => Err(ServerError::not_found(format!("no resource at '{}'", uri))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    #[test]
    fn network_segment_is_parsed_and_validated() {
        let state = test_state();
        let path = parse_uri(&state, "iota://shimmer/status").unwrap();
        assert_eq!(path.network, "shimmer");
        assert_eq!(path.segments, vec!["status"]);
        assert!(parse_uri(&state, "iota://nosuchchain/status").is_err());
    }

    #[test]
    fn bare_aliases_default_to_the_primary_sibling() {
        let state = test_state();
        let path = parse_uri(&state, "iota://status").unwrap();
        assert_eq!(path.network, "iota");
        let path = parse_uri(&state, "iota://block/latest").unwrap();
        assert_eq!(path.network, "iota");
        assert_eq!(path.segments, vec!["block", "latest"]);
    }

    #[test]
    fn variables_bind_by_position() {
        let state = test_state();
        let path = parse_uri(
            &state,
            "iota://148/address/0x4e83362442B8d1beC281594CEA3050c8EB01311C/balance",
        )
        .unwrap();
        assert_eq!(path.network, "shimmer");
        assert_eq!(path.segments[0], "address");
        assert_eq!(path.segments[2], "balance");
    }

    #[test]
    fn foreign_schemes_are_rejected() {
        let state = test_state();
        assert!(parse_uri(&state, "eth://iota/status").is_err());
    }
}

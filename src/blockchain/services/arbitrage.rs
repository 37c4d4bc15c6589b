// src/blockchain/services/arbitrage.rs

use crate::blockchain::client::EvmClient;
use crate::blockchain::models::{ArbitragePair, PairLeg, TokenQuote};
use crate::blockchain::pools::PoolRegistry;
use crate::blockchain::services::token;
use crate::chains::{ChainRegistry, NetworkDescriptor};
use crate::errors::ServerError;
use crate::utils::format_amount;
use chrono::Utc;
use ethers::abi::{decode, ParamType, Token as AbiToken};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::keccak256;
use futures::future::join_all;
use tracing::{debug, warn};

/// Minimum profit threshold applied when the caller does not supply one.
pub const DEFAULT_MIN_PROFIT_PCT: f64 = 1.0;

fn call_data(sig: &str) -> Bytes {
    Bytes::from(keccak256(sig.as_bytes())[0..4].to_vec())
}

fn decode_reserves(raw: &Bytes) -> Result<(U256, U256), ServerError> {
    let tokens = decode(
        &[
            ParamType::Uint(112),
            ParamType::Uint(112),
            ParamType::Uint(32),
        ],
        raw,
    )
    .map_err(|e| ServerError::upstream(format!("malformed getReserves response: {}", e)))?;
    match (tokens.first(), tokens.get(1)) {
        (Some(AbiToken::Uint(r0)), Some(AbiToken::Uint(r1))) => Ok((*r0, *r1)),
        _ => Err(ServerError::upstream("getReserves returned unexpected types")),
    }
}

fn decode_address(raw: &Bytes) -> Result<Address, ServerError> {
    let tokens = decode(&[ParamType::Address], raw)
        .map_err(|e| ServerError::upstream(format!("malformed token address response: {}", e)))?;
    match tokens.first() {
        Some(AbiToken::Address(a)) => Ok(*a),
        _ => Err(ServerError::upstream("pair token slot is not an address")),
    }
}

/// Spot price of `symbol` on one network, read from the registered
/// constant-product pool: `reserve_base * 10^dec_target / reserve_target`,
/// denominated in the pair's base token.
pub async fn quote_on_network(
    client: &EvmClient,
    pools: &PoolRegistry,
    network: &NetworkDescriptor,
    symbol: &str,
) -> Result<TokenQuote, ServerError> {
    let pool = pools.entry(symbol, &network.short_name).ok_or_else(|| {
        ServerError::not_found(format!(
            "no pool registered for {} on {}",
            symbol, network.short_name
        ))
    })?;
    let pair: Address = pool
        .pair_address
        .parse()
        .map_err(|_| ServerError::logic(format!("pool registry holds a bad address for {}", symbol)))?;

    let (reserves_raw, token0_raw, token1_raw) = tokio::join!(
        client.call(network, pair, call_data("getReserves()")),
        client.call(network, pair, call_data("token0()")),
        client.call(network, pair, call_data("token1()")),
    );
    let (reserve0, reserve1) = decode_reserves(&reserves_raw?)?;
    let token0 = decode_address(&token0_raw?)?;
    let token1 = decode_address(&token1_raw?)?;

    let (meta0, meta1) = tokio::join!(
        token::erc20_metadata(client, network, token0),
        token::erc20_metadata(client, network, token1),
    );
    let meta0 = meta0?;
    let meta1 = meta1?;

    let wanted = symbol.to_uppercase();
    let (target, base, reserve_target, reserve_base) =
        if meta0.symbol.to_uppercase() == wanted {
            (&meta0, &meta1, reserve0, reserve1)
        } else if meta1.symbol.to_uppercase() == wanted {
            (&meta1, &meta0, reserve1, reserve0)
        } else {
            return Err(ServerError::logic(format!(
                "pool {} holds {}/{}, not {}",
                pool.pair_address, meta0.symbol, meta1.symbol, symbol
            )));
        };

    if reserve_target.is_zero() {
        return Err(ServerError::logic(format!(
            "pool for {} on {} has no target-side liquidity",
            symbol, network.short_name
        )));
    }
    // U256 holds ~1e77; anything past that is a broken token contract.
    if target.decimals > 76 || base.decimals > 76 {
        return Err(ServerError::logic(format!(
            "pool tokens on {} report implausible decimals",
            network.short_name
        )));
    }

    let scaled = reserve_base
        .saturating_mul(U256::exp10(target.decimals as usize))
        / reserve_target;
    let price_formatted = format_amount(scaled, base.decimals);
    let price = price_formatted.parse::<f64>().unwrap_or(0.0);

    Ok(TokenQuote {
        token: target.symbol.clone(),
        network: network.short_name.clone(),
        price,
        price_formatted,
        base_token: base.symbol.clone(),
        dex: pool.dex_name.clone(),
        liquidity: format_amount(reserve_target, target.decimals),
        taken_at: Utc::now(),
    })
}

/// Enumerate directed profitable routes over a set of quotes.
///
/// Both legs must be denominated in the same base token; mismatched
/// pairs are skipped with a warning. Emitted pairs satisfy
/// `profit_pct >= min_profit_pct`; the result is sorted by profit,
/// best first. Bridging is required whenever the route leaves the
/// sibling family on either side.
pub fn enumerate_opportunities(
    chains: &ChainRegistry,
    symbol: &str,
    quotes: &[TokenQuote],
    min_profit_pct: f64,
) -> Vec<ArbitragePair> {
    let mut pairs = Vec::new();
    for buy in quotes {
        for sell in quotes {
            if buy.network == sell.network {
                continue;
            }
            if buy.base_token != sell.base_token {
                warn!(
                    token = symbol,
                    buy = %buy.network,
                    sell = %sell.network,
                    "skipping pair with mismatched base tokens ({} vs {})",
                    buy.base_token,
                    sell.base_token
                );
                continue;
            }
            if buy.price <= 0.0 {
                continue;
            }
            let profit_pct = (sell.price - buy.price) / buy.price * 100.0;
            if profit_pct < min_profit_pct {
                continue;
            }
            let bridging_required =
                !(chains.is_sibling(&buy.network) && chains.is_sibling(&sell.network));
            pairs.push(ArbitragePair {
                token: symbol.to_uppercase(),
                base_token: buy.base_token.clone(),
                buy: PairLeg {
                    network: buy.network.clone(),
                    price: buy.price,
                    dex: buy.dex.clone(),
                    liquidity: buy.liquidity.clone(),
                },
                sell: PairLeg {
                    network: sell.network.clone(),
                    price: sell.price,
                    dex: sell.dex.clone(),
                    liquidity: sell.liquidity.clone(),
                },
                profit_pct,
                bridging_required,
                taken_at: Utc::now(),
            });
        }
    }
    pairs.sort_by(|a, b| {
        b.profit_pct
            .partial_cmp(&a.profit_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs
}

/// Quote `symbol` on every candidate network that has a registered
/// pool, then enumerate profitable routes. Fewer than two quotable
/// networks yields an empty list, not an error.
pub async fn find_opportunities(
    client: &EvmClient,
    chains: &ChainRegistry,
    pools: &PoolRegistry,
    symbol: &str,
    candidate_networks: &[String],
    min_profit_pct: f64,
) -> Result<Vec<ArbitragePair>, ServerError> {
    if min_profit_pct < 0.0 {
        return Err(ServerError::validation(
            "minProfitPercent must be zero or positive",
        ));
    }

    let mut quotable: Vec<&NetworkDescriptor> = Vec::new();
    for name in candidate_networks {
        let descriptor = chains.resolve(name)?;
        if pools.entry(symbol, &descriptor.short_name).is_some() {
            quotable.push(descriptor);
        } else {
            debug!(token = symbol, network = %descriptor.short_name, "not quotable; skipping");
        }
    }
    if quotable.len() < 2 {
        return Ok(Vec::new());
    }

    let fetches = quotable
        .iter()
        .map(|network| quote_on_network(client, pools, network, symbol));
    let quotes: Vec<TokenQuote> = join_all(fetches)
        .await
        .into_iter()
        .zip(quotable.iter())
        .filter_map(|(outcome, network)| match outcome {
            Ok(q) => Some(q),
            Err(e) => {
                warn!(token = symbol, network = %network.short_name, error = %e, "dropping failed quote");
                None
            }
        })
        .collect();

    Ok(enumerate_opportunities(chains, symbol, &quotes, min_profit_pct))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(network: &str, price: f64, base: &str) -> TokenQuote {
        TokenQuote {
            token: "USDC".to_string(),
            network: network.to_string(),
            price,
            price_formatted: format!("{}", price),
            base_token: base.to_string(),
            dex: "TestSwap".to_string(),
            liquidity: "1000000".to_string(),
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn spread_below_threshold_yields_nothing() {
        let chains = ChainRegistry::new();
        let quotes = vec![quote("iota", 0.998, "wIOTA"), quote("ethereum", 1.002, "wIOTA")];
        let pairs = enumerate_opportunities(&chains, "USDC", &quotes, 0.5);
        assert!(pairs.is_empty());
    }

    #[test]
    fn lowering_threshold_surfaces_the_single_route() {
        let chains = ChainRegistry::new();
        let quotes = vec![quote("iota", 0.998, "wIOTA"), quote("ethereum", 1.002, "wIOTA")];
        let pairs = enumerate_opportunities(&chains, "USDC", &quotes, 0.1);
        assert_eq!(pairs.len(), 1);
        let p = &pairs[0];
        assert_eq!(p.buy.network, "iota");
        assert_eq!(p.sell.network, "ethereum");
        let expected = (1.002 - 0.998) / 0.998 * 100.0;
        assert!((p.profit_pct - expected).abs() < 1e-9);
        assert!(p.profit_pct > 0.40 && p.profit_pct < 0.41);
        assert!(p.bridging_required);
    }

    #[test]
    fn sibling_to_sibling_route_needs_no_bridge() {
        let chains = ChainRegistry::new();
        let quotes = vec![quote("iota", 1.0, "wIOTA"), quote("shimmer", 1.05, "wIOTA")];
        let pairs = enumerate_opportunities(&chains, "USDC", &quotes, 1.0);
        assert_eq!(pairs.len(), 1);
        assert!(!pairs[0].bridging_required);
    }

    #[test]
    fn mismatched_base_tokens_are_skipped() {
        let chains = ChainRegistry::new();
        let quotes = vec![quote("iota", 1.0, "wIOTA"), quote("ethereum", 2.0, "WETH")];
        assert!(enumerate_opportunities(&chains, "USDC", &quotes, 0.0).is_empty());
    }

    #[test]
    fn routes_are_sorted_by_profit_descending() {
        let chains = ChainRegistry::new();
        let quotes = vec![
            quote("iota", 1.00, "wIOTA"),
            quote("shimmer", 1.03, "wIOTA"),
            quote("ethereum", 1.10, "wIOTA"),
        ];
        let pairs = enumerate_opportunities(&chains, "USDC", &quotes, 1.0);
        assert!(pairs.len() >= 2);
        for w in pairs.windows(2) {
            assert!(w[0].profit_pct >= w[1].profit_pct);
        }
        assert_eq!(pairs[0].buy.network, "iota");
        assert_eq!(pairs[0].sell.network, "ethereum");
    }

    #[test]
    fn every_emitted_pair_satisfies_the_invariants() {
        let chains = ChainRegistry::new();
        let quotes = vec![
            quote("iota", 0.97, "wIOTA"),
            quote("shimmer", 1.01, "wIOTA"),
            quote("ethereum", 1.04, "wIOTA"),
        ];
        let min = 1.0;
        for p in enumerate_opportunities(&chains, "USDC", &quotes, min) {
            assert_ne!(p.buy.network, p.sell.network);
            assert!(p.profit_pct >= min);
            let recomputed = (p.sell.price - p.buy.price) / p.buy.price * 100.0;
            assert!((p.profit_pct - recomputed).abs() < 1e-9);
            assert_eq!(
                p.bridging_required,
                !(chains.is_sibling(&p.buy.network) && chains.is_sibling(&p.sell.network))
            );
        }
    }

    #[test]
    fn reserve_decode_round_trip() {
        // reserve0 = 5_000_000, reserve1 = 10_000_000, ts = 0
        let mut raw = vec![0u8; 96];
        raw[24..32].copy_from_slice(&5_000_000u64.to_be_bytes());
        raw[56..64].copy_from_slice(&10_000_000u64.to_be_bytes());
        let (r0, r1) = decode_reserves(&Bytes::from(raw)).unwrap();
        assert_eq!(r0, U256::from(5_000_000u64));
        assert_eq!(r1, U256::from(10_000_000u64));
    }
}

//! DexScreener API Client - liquidity pool discovery
//!
//! Used only to find which LP pair holds a token's liquidity. Holder
//! balances and supply always come from the explorer and the chain.
//!
//! API: https://api.dexscreener.com/latest/dex/tokens/{tokenAddress}
//! Free, no API key required

use eyre::{eyre, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::utils::constants::{chain_id_to_dexscreener_name, DEXSCREENER_API_URL, USER_AGENT};

/// DexScreener API response
#[derive(Debug, Deserialize)]
pub struct DexScreenerResponse {
    #[serde(default)]
    pub pairs: Option<Vec<DexPair>>,
}

/// A trading pair from DexScreener
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    /// Chain name ("ethereum", "bsc", ...)
    pub chain_id: String,
    /// DEX identifier ("uniswap", "pancakeswap", ...)
    pub dex_id: String,
    pub pair_address: String,
    /// Labels (e.g. ["v3"] for concentrated-liquidity pools)
    #[serde(default)]
    pub labels: Vec<String>,
    pub liquidity: Option<DexLiquidity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexLiquidity {
    pub usd: Option<f64>,
}

impl DexPair {
    /// V2-style pair: an ERC-20 LP token whose holders can be listed.
    /// V3/V4 positions are NFTs and Velodrome-style pools differ.
    pub fn is_v2_compatible(&self) -> bool {
        let is_v3 = self.labels.iter().any(|l| l.contains("v3") || l.contains("v4"));
        let is_velodrome_style = matches!(
            self.dex_id.to_lowercase().as_str(),
            "velodrome" | "aerodrome" | "ramses" | "thena" | "equalizer"
        );
        !is_v3 && !is_velodrome_style
    }

    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }
}

/// DexScreener API client
#[derive(Clone)]
pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| eyre!("Failed to build DexScreener client: {}", e))?;
        Ok(Self {
            client,
            base_url: DEXSCREENER_API_URL.to_string(),
        })
    }

    /// All pairs for a token, highest liquidity first
    pub async fn get_token_pairs(&self, token_address: &str) -> Result<Vec<DexPair>> {
        let url = format!("{}/tokens/{}", self.base_url, token_address);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| eyre!("DexScreener request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(eyre!("DexScreener API error: {}", response.status()));
        }

        let data: DexScreenerResponse = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse DexScreener response: {}", e))?;

        let mut pairs = data.pairs.unwrap_or_default();
        sort_by_liquidity(&mut pairs);
        Ok(pairs)
    }

    /// Address of the LP pair holding the token's liquidity on `chain_id`
    pub async fn find_pool(&self, token_address: &str, chain_id: u64) -> Result<Option<String>> {
        let chain_name = chain_id_to_dexscreener_name(chain_id)
            .ok_or_else(|| eyre!("Unsupported chain_id: {}", chain_id))?;
        let pairs = self.get_token_pairs(token_address).await?;
        let pool = select_pool(&pairs, chain_name).map(|p| p.pair_address.clone());

        match &pool {
            Some(address) => info!("📊 DexScreener: LP pool {} on {}", address, chain_name),
            None => warn!("⚠️ DexScreener: no V2 pool for {} on {}", token_address, chain_name),
        }
        Ok(pool)
    }
}

fn sort_by_liquidity(pairs: &mut [DexPair]) {
    pairs.sort_by(|a, b| {
        b.liquidity_usd()
            .partial_cmp(&a.liquidity_usd())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Deepest V2-compatible pair on the chain. Pairs must already be sorted.
fn select_pool<'a>(pairs: &'a [DexPair], chain_name: &str) -> Option<&'a DexPair> {
    pairs
        .iter()
        .filter(|p| p.chain_id.eq_ignore_ascii_case(chain_name))
        .find(|p| p.is_v2_compatible())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(chain: &str, dex: &str, address: &str, usd: f64, labels: &[&str]) -> DexPair {
        DexPair {
            chain_id: chain.into(),
            dex_id: dex.into(),
            pair_address: address.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            liquidity: Some(DexLiquidity { usd: Some(usd) }),
        }
    }

    #[test]
    fn test_pool_prefers_deepest_v2_on_chain() {
        let mut pairs = vec![
            pair("bsc", "pancakeswap", "0xsmall", 1_000.0, &[]),
            pair("bsc", "pancakeswap", "0xv3", 90_000.0, &["v3"]),
            pair("ethereum", "uniswap", "0xeth", 500_000.0, &[]),
            pair("bsc", "biswap", "0xdeep", 40_000.0, &[]),
        ];
        sort_by_liquidity(&mut pairs);
        let pool = select_pool(&pairs, "bsc").unwrap();
        assert_eq!(pool.pair_address, "0xdeep");
    }

    #[test]
    fn test_no_pool_when_only_v3() {
        let pairs = vec![pair("base", "aerodrome", "0xaero", 10.0, &[])];
        assert!(select_pool(&pairs, "base").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"schemaVersion":"1.0.0","pairs":[{"chainId":"bsc","dexId":"pancakeswap",
            "pairAddress":"0xpair","labels":["v2"],"liquidity":{"usd":1234.5,"base":1,"quote":2},
            "baseToken":{"address":"0xt","name":"T","symbol":"T"}}]}"#;
        let data: DexScreenerResponse = serde_json::from_str(json).unwrap();
        let pairs = data.pairs.unwrap();
        assert_eq!(pairs[0].pair_address, "0xpair");
        assert!(pairs[0].is_v2_compatible());
        assert_eq!(pairs[0].liquidity_usd(), 1234.5);
    }

    #[test]
    fn test_null_pairs() {
        let data: DexScreenerResponse = serde_json::from_str(r#"{"pairs":null}"#).unwrap();
        assert!(data.pairs.is_none());
    }
}

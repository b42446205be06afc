//! RPC Client Module - JSON-RPC `eth_call` for ERC-20 reads
//!
//! 1. Private URL from `<CHAIN>_HTTP_URL`, public RPC as fallback
//! 2. Exponential backoff with ±20% jitter between retries
//! 3. User-Agent header, gzip responses
//!
//! Retries are kept short: every call already runs under the aggregator's
//! per-call timeout.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use eyre::{eyre, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::utils::constants::{
    get_chain_name, get_public_rpc_fallback, get_rpc_env_key, USER_AGENT as USER_AGENT_CONST,
};

sol! {
    function totalSupply() external view returns (uint256);
    function name() external view returns (string);
    function symbol() external view returns (string);
    function decimals() external view returns (uint8);
}

/// Base retry delay in milliseconds
pub const BASE_RETRY_MS: u64 = 250;

/// Maximum retry delay in milliseconds
pub const MAX_RETRY_MS: u64 = 2_000;

/// Attempts per endpoint
pub const MAX_RETRIES: u32 = 3;

/// Jitter percentage for retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// ERC-20 metadata read on-chain. Each field is read independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<U256>,
}

impl TokenMetadata {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.symbol.is_none()
            && self.decimals.is_none()
            && self.total_supply.is_none()
    }
}

/// RPC provider with retry and fallback
#[derive(Clone)]
pub struct RpcProvider {
    /// Configured RPC URL, or the public one when none is set
    primary_url: String,
    /// Public RPC used after the primary fails
    fallback_url: Option<String>,
    client: reqwest::Client,
    chain_id: u64,
}

impl RpcProvider {
    /// Create a provider for a chain from environment configuration
    pub fn new(chain_id: u64, timeout: Duration) -> Result<Self> {
        let public = get_public_rpc_fallback(chain_id);
        let configured = get_rpc_env_key(chain_id)
            .and_then(|key| std::env::var(key).ok())
            .filter(|url| !url.is_empty());

        let (primary_url, fallback_url) = match (configured, public) {
            (Some(url), public) => (url, public.map(String::from)),
            (None, Some(public)) => (public.to_string(), None),
            (None, None) => return Err(eyre!("No RPC endpoint for chain_id {}", chain_id)),
        };

        Ok(Self {
            primary_url,
            fallback_url,
            client: Self::build_client(timeout)?,
            chain_id,
        })
    }

    /// Provider for an explicit URL, no fallback
    pub fn with_url(chain_id: u64, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            primary_url: url.into(),
            fallback_url: None,
            client: Self::build_client(timeout)?,
            chain_id,
        })
    }

    fn build_client(timeout: Duration) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
    }

    /// Execute a JSON-RPC call on the primary, then the fallback
    pub async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        match self.call_with_retry(&self.primary_url, &payload).await {
            Ok(result) => return Ok(result),
            Err(e) => warn!("⚠️ Primary RPC failed on {}: {}", get_chain_name(self.chain_id), e),
        }

        if let Some(ref fallback) = self.fallback_url {
            info!("🔄 Trying fallback RPC for {}", get_chain_name(self.chain_id));
            match self.call_with_retry(fallback, &payload).await {
                Ok(result) => return Ok(result),
                Err(e) => warn!("⚠️ Fallback RPC also failed: {}", e),
            }
        }

        Err(eyre!("All RPC endpoints failed for {}", get_chain_name(self.chain_id)))
    }

    async fn call_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                debug!("⏳ Retry {}/{} after {}ms", attempt + 1, MAX_RETRIES, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.execute_call::<T>(url, payload).await {
                Ok(result) => return Ok(result),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| eyre!("Unknown error after {} retries", MAX_RETRIES)))
    }

    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| eyre!("Request failed: {}", e))?;

        let status = response.status();
        if status == 429 {
            return Err(eyre!("Rate limited (HTTP 429)"));
        }
        if !status.is_success() {
            return Err(eyre!("HTTP error: {}", status));
        }

        let json: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse response: {}", e))?;

        if let Some(error) = json.error {
            return Err(eyre!("RPC error: {} (code: {})", error.message, error.code));
        }

        json.result.ok_or_else(|| eyre!("No result in response"))
    }

    /// Execute `eth_call` at the latest block
    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String> {
        let params = serde_json::json!([{ "to": to, "data": data }, "latest"]);
        self.call::<String>("eth_call", params).await
    }

    /// `eth_call` a view function and decode its return
    async fn read<C: SolCall>(&self, token: Address, call: C) -> Result<C::Return> {
        let calldata = format!("0x{}", hex::encode(call.abi_encode()));
        let raw = self.eth_call(&token.to_string(), &calldata).await?;
        decode_return::<C>(&raw)
    }

    /// ERC-20 `totalSupply()` (tokens and LP pair tokens)
    pub async fn total_supply(&self, token: Address) -> Result<U256> {
        Ok(self.read(token, totalSupplyCall {}).await?._0)
    }

    /// `name()`, `symbol()`, `decimals()` and `totalSupply()`, concurrently.
    /// A token that lacks one of them only loses that field.
    pub async fn token_metadata(&self, token: Address) -> TokenMetadata {
        let (name, symbol, decimals, total_supply) = tokio::join!(
            self.read(token, nameCall {}),
            self.read(token, symbolCall {}),
            self.read(token, decimalsCall {}),
            self.total_supply(token),
        );
        if let Err(e) = &name {
            debug!("name() unreadable for {}: {}", token, e);
        }
        TokenMetadata {
            name: name.ok().map(|r| r._0),
            symbol: symbol.ok().map(|r| r._0),
            decimals: decimals.ok().map(|r| r._0),
            total_supply: total_supply.ok(),
        }
    }

    /// RPC URL with any path credentials hidden
    pub fn masked_url(&self) -> String {
        match self.primary_url.split_once("/v2/") {
            Some((base, _)) => format!("{}/v2/***HIDDEN***", base),
            None => self.primary_url.clone(),
        }
    }
}

/// Exponential backoff (capped) with random ±20% jitter, never below 50ms
fn backoff_delay(attempt: u32) -> u64 {
    let base = BASE_RETRY_MS.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = base.min(MAX_RETRY_MS);
    let jitter_range = (capped * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 = rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    (capped as i64 + jitter).max(50) as u64
}

/// Decode an `eth_call` hex result as the return of `C`
fn decode_return<C: SolCall>(raw: &str) -> Result<C::Return> {
    let bytes = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| eyre!("Invalid eth_call hex: {}", e))?;
    C::abi_decode_returns(&bytes, true)
        .map_err(|e| eyre!("Failed to decode {} return: {}", C::SIGNATURE, e))
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_supply_selector() {
        // keccak256("totalSupply()")[..4]
        assert_eq!(totalSupplyCall::SELECTOR, [0x18, 0x16, 0x0d, 0xdd]);
    }

    #[test]
    fn test_decode_total_supply() {
        let raw = format!("0x{:064x}", 1_000_000u64);
        let decoded = decode_return::<totalSupplyCall>(&raw).unwrap();
        assert_eq!(decoded._0, U256::from(1_000_000u64));
        assert!(decode_return::<totalSupplyCall>("0xzz").is_err());
        assert!(decode_return::<totalSupplyCall>("0x").is_err());
    }

    #[test]
    fn test_decode_string_and_uint8_returns() {
        // offset 0x20, length 4, "Trap" right-padded
        let raw = format!(
            "0x{:064x}{:064x}{}{}",
            0x20,
            4,
            hex::encode("Trap"),
            "0".repeat(56)
        );
        assert_eq!(decode_return::<nameCall>(&raw).unwrap()._0, "Trap");
        assert_eq!(decode_return::<symbolCall>(&raw).unwrap()._0, "Trap");

        let raw = format!("0x{:064x}", 18);
        assert_eq!(decode_return::<decimalsCall>(&raw).unwrap()._0, 18);
    }

    #[test]
    fn test_view_selectors() {
        assert_eq!(nameCall::SELECTOR, [0x06, 0xfd, 0xde, 0x03]);
        assert_eq!(symbolCall::SELECTOR, [0x95, 0xd8, 0x9b, 0x41]);
        assert_eq!(decimalsCall::SELECTOR, [0x31, 0x3c, 0xe5, 0x67]);
    }

    #[test]
    fn test_empty_metadata() {
        assert!(TokenMetadata::default().is_empty());
        let named = TokenMetadata {
            symbol: Some("TKN".into()),
            ..TokenMetadata::default()
        };
        assert!(!named.is_empty());
    }

    #[test]
    fn test_backoff_bounds() {
        for attempt in 1..6 {
            let delay = backoff_delay(attempt);
            assert!(delay >= 50);
            assert!(delay <= MAX_RETRY_MS + MAX_RETRY_MS * RETRY_JITTER_PERCENT / 100);
        }
    }

    #[test]
    fn test_masked_url() {
        let provider = RpcProvider::with_url(
            1,
            "https://eth-mainnet.g.alchemy.com/v2/secret",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(provider.masked_url(), "https://eth-mainnet.g.alchemy.com/v2/***HIDDEN***");
        assert_eq!(provider.chain_id, 1);
    }

    #[test]
    fn test_public_fallback_when_unconfigured() {
        // Avalanche has a public endpoint and no private URL in test environments
        if std::env::var("AVALANCHE_HTTP_URL").is_err() {
            let provider = RpcProvider::new(43114, Duration::from_secs(1)).unwrap();
            assert!(provider.masked_url().contains("avax"));
        }
        assert!(RpcProvider::new(999, Duration::from_secs(1)).is_err());
    }
}

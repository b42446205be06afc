//! Configuration module for the Trap Checker
//!
//! All tunables come from the environment with defaults from
//! `utils/constants.rs`. Bonus weights and level thresholds are part of
//! `ScoringPolicy` so deployments can recalibrate without a rebuild.

use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::errors::{AppError, AppResult};
use crate::utils::constants::{
    is_chain_supported, DEFAULT_CACHE_TTL_SECS, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_CHAIN_ID,
    DEFAULT_CONCENTRATION_BONUS, DEFAULT_CONCENTRATION_THRESHOLD_BPS, DEFAULT_EXPLORER_API_URL,
    DEFAULT_HIGH_THRESHOLD, DEFAULT_MEDIUM_THRESHOLD, DEFAULT_OWNER_BONUS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SUSPICIOUS_TX_BONUS, DEFAULT_TOP_HOLDERS,
    DEFAULT_TX_PAGE_SIZE,
};

/// Read an env var and parse it, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("⚠️ Ignoring invalid value for {}: {:?}", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Fixed bonuses and thresholds used by the analyzers and the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringPolicy {
    /// Added when the interface exposes `owner`/`getOwner`
    pub owner_bonus: u32,
    /// Added when one LP holder exceeds `concentration_threshold_bps`
    pub concentration_bonus: u32,
    /// Added when the transfer page holds at least one self-transfer
    pub suspicious_tx_bonus: u32,
    /// Strict upper bound for a single holder's share (basis points)
    pub concentration_threshold_bps: u64,
    /// Lowest total score classified MEDIUM
    pub medium_threshold: u32,
    /// Lowest total score classified HIGH
    pub high_threshold: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            owner_bonus: DEFAULT_OWNER_BONUS,
            concentration_bonus: DEFAULT_CONCENTRATION_BONUS,
            suspicious_tx_bonus: DEFAULT_SUSPICIOUS_TX_BONUS,
            concentration_threshold_bps: DEFAULT_CONCENTRATION_THRESHOLD_BPS,
            medium_threshold: DEFAULT_MEDIUM_THRESHOLD,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
        }
    }
}

impl ScoringPolicy {
    /// Build the policy from `TRAP_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            owner_bonus: env_or("TRAP_OWNER_BONUS", defaults.owner_bonus),
            concentration_bonus: env_or("TRAP_CONCENTRATION_BONUS", defaults.concentration_bonus),
            suspicious_tx_bonus: env_or("TRAP_SUSPICIOUS_TX_BONUS", defaults.suspicious_tx_bonus),
            concentration_threshold_bps: env_or(
                "TRAP_CONCENTRATION_THRESHOLD_BPS",
                defaults.concentration_threshold_bps,
            ),
            medium_threshold: env_or("TRAP_MEDIUM_THRESHOLD", defaults.medium_threshold),
            high_threshold: env_or("TRAP_HIGH_THRESHOLD", defaults.high_threshold),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.medium_threshold >= self.high_threshold {
            return Err(AppError::invalid_config(format!(
                "medium threshold ({}) must be below high threshold ({})",
                self.medium_threshold, self.high_threshold
            )));
        }
        if self.concentration_threshold_bps == 0 {
            return Err(AppError::invalid_config(
                "concentration threshold must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Configuration for one risk-check pipeline
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Explorer API key (Etherscan v2 key works for every supported chain)
    pub explorer_api_key: Option<String>,
    /// Explorer endpoint
    pub explorer_api_url: String,
    /// Chain used when the request omits one
    pub default_chain_id: u64,
    /// Timeout for each external call
    pub call_timeout: Duration,
    /// Deadline for a whole risk check
    pub request_timeout: Duration,
    /// LP holders inspected by the liquidity analyzer
    pub top_holders: usize,
    /// Transfers inspected by the transaction-history analyzer
    pub tx_page_size: usize,
    /// Bonus weights and thresholds
    pub scoring: ScoringPolicy,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            explorer_api_key: Self::get_explorer_key(),
            explorer_api_url: std::env::var("EXPLORER_API_URL")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_API_URL.to_string()),
            default_chain_id: env_or("TRAP_DEFAULT_CHAIN_ID", DEFAULT_CHAIN_ID),
            call_timeout: Duration::from_millis(env_or(
                "TRAP_CALL_TIMEOUT_MS",
                DEFAULT_CALL_TIMEOUT_MS,
            )),
            request_timeout: Duration::from_millis(env_or(
                "TRAP_REQUEST_TIMEOUT_MS",
                DEFAULT_REQUEST_TIMEOUT_MS,
            )),
            top_holders: env_or("TRAP_TOP_HOLDERS", DEFAULT_TOP_HOLDERS),
            tx_page_size: env_or("TRAP_TX_PAGE_SIZE", DEFAULT_TX_PAGE_SIZE),
            scoring: ScoringPolicy::from_env(),
        }
    }
}

impl CheckerConfig {
    /// Explorer key from environment. The key is NEVER logged.
    fn get_explorer_key() -> Option<String> {
        ["ETHERSCAN_API_KEY", "BSCSCAN_API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|key| !key.is_empty() && key != "YOUR_API_KEY")
            .inspect(|_| info!("🔑 Explorer API key configured (key hidden)"))
    }

    /// Load from environment and validate
    pub fn from_env() -> AppResult<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if !is_chain_supported(self.default_chain_id) {
            return Err(AppError::unsupported_chain(self.default_chain_id));
        }
        if self.call_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(AppError::invalid_config("timeouts must be greater than zero"));
        }
        if self.request_timeout < self.call_timeout {
            warn!(
                "⚠️ Request timeout ({:?}) is shorter than call timeout ({:?})",
                self.request_timeout, self.call_timeout
            );
        }
        if self.top_holders == 0 || self.tx_page_size == 0 {
            return Err(AppError::invalid_config(
                "top holder count and transfer page size must be greater than zero",
            ));
        }
        self.scoring.validate()
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cache_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        // Hosting platforms inject PORT; TRAP_PORT is for local runs
        let port = std::env::var("PORT")
            .or_else(|_| std::env::var("TRAP_PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Self {
            host: std::env::var("TRAP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            cache_ttl_secs: env_or("TRAP_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = ScoringPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.medium_threshold, 30);
        assert_eq!(policy.high_threshold, 60);
        assert_eq!(policy.concentration_threshold_bps, 2_000);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let policy = ScoringPolicy {
            medium_threshold: 60,
            high_threshold: 30,
            ..ScoringPolicy::default()
        };
        let err = policy.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = CheckerConfig {
            call_timeout: Duration::ZERO,
            ..CheckerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_default_chain_rejected() {
        let config = CheckerConfig {
            default_chain_id: 999,
            ..CheckerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigUnsupportedChain);
    }
}

//! Constants Module - Single Source of Truth
//!
//! Chain metadata, collaborator endpoints and the default scoring weights.
//! Weights and thresholds here are only defaults; `ScoringPolicy` may
//! override them from the environment.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound HTTP requests
pub const USER_AGENT: &str = concat!("TrapChecker/", env!("CARGO_PKG_VERSION"));

// ============================================
// TIMEOUTS & PAGING
// ============================================

/// Default timeout for one external call (milliseconds)
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;

/// Default deadline for a whole risk check (milliseconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 20_000;

/// Default cache TTL (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Number of LP holders inspected
pub const DEFAULT_TOP_HOLDERS: usize = 5;

/// Number of most recent transfers inspected
pub const DEFAULT_TX_PAGE_SIZE: usize = 50;

/// Maximum addresses accepted by one batch request
pub const MAX_BATCH_ADDRESSES: usize = 50;

// ============================================
// SCORING DEFAULTS
// ============================================

/// Bonus when an `owner`/`getOwner` accessor is exposed
pub const DEFAULT_OWNER_BONUS: u32 = 5;

/// Bonus when one LP holder exceeds the concentration threshold
pub const DEFAULT_CONCENTRATION_BONUS: u32 = 10;

/// Bonus when the transfer page contains self-transfers
pub const DEFAULT_SUSPICIOUS_TX_BONUS: u32 = 5;

/// LP concentration threshold in basis points (2000 = 20.00%)
pub const DEFAULT_CONCENTRATION_THRESHOLD_BPS: u64 = 2_000;

/// Lowest score classified MEDIUM
pub const DEFAULT_MEDIUM_THRESHOLD: u32 = 30;

/// Lowest score classified HIGH
pub const DEFAULT_HIGH_THRESHOLD: u32 = 60;

/// Basis-point scale used for holder percentages
pub const BPS_SCALE: u64 = 10_000;

// ============================================
// EXPLORER
// ============================================

/// Etherscan v2 unified endpoint (chain selected with `chainid`)
pub const DEFAULT_EXPLORER_API_URL: &str = "https://api.etherscan.io/v2/api";

/// DexScreener public API
pub const DEXSCREENER_API_URL: &str = "https://api.dexscreener.com/latest/dex";

// ============================================
// CHAIN IDS
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain
pub const CHAIN_ID_BSC: u64 = 56;
/// Polygon
pub const CHAIN_ID_POLYGON: u64 = 137;
/// Arbitrum One
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
/// Optimism
pub const CHAIN_ID_OPTIMISM: u64 = 10;
/// Avalanche C-Chain
pub const CHAIN_ID_AVALANCHE: u64 = 43114;
/// Base
pub const CHAIN_ID_BASE: u64 = 8453;

/// Chain used when the caller does not pick one
pub const DEFAULT_CHAIN_ID: u64 = CHAIN_ID_BSC;

/// All supported EVM chain IDs
pub const SUPPORTED_CHAIN_IDS: [u64; 7] = [
    CHAIN_ID_ETHEREUM,
    CHAIN_ID_BSC,
    CHAIN_ID_POLYGON,
    CHAIN_ID_ARBITRUM,
    CHAIN_ID_OPTIMISM,
    CHAIN_ID_AVALANCHE,
    CHAIN_ID_BASE,
];

/// Check if chain ID is supported
#[inline]
pub fn is_chain_supported(chain_id: u64) -> bool {
    SUPPORTED_CHAIN_IDS.contains(&chain_id)
}

/// Parse a chain selector: numeric id or short name ("bsc", "eth", ...)
pub fn parse_chain(selector: &str) -> Option<u64> {
    let selector = selector.trim().to_lowercase();
    if let Ok(id) = selector.parse::<u64>() {
        return is_chain_supported(id).then_some(id);
    }
    match selector.as_str() {
        "eth" | "ethereum" | "mainnet" => Some(CHAIN_ID_ETHEREUM),
        "bsc" | "bnb" => Some(CHAIN_ID_BSC),
        "polygon" | "matic" => Some(CHAIN_ID_POLYGON),
        "arbitrum" | "arb" => Some(CHAIN_ID_ARBITRUM),
        "optimism" | "op" => Some(CHAIN_ID_OPTIMISM),
        "avalanche" | "avax" => Some(CHAIN_ID_AVALANCHE),
        "base" => Some(CHAIN_ID_BASE),
        _ => None,
    }
}

// ============================================
// CHAIN METADATA
// ============================================

/// Get chain name
pub fn get_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "Ethereum",
        CHAIN_ID_BSC => "BNB Smart Chain",
        CHAIN_ID_POLYGON => "Polygon",
        CHAIN_ID_ARBITRUM => "Arbitrum One",
        CHAIN_ID_OPTIMISM => "Optimism",
        CHAIN_ID_AVALANCHE => "Avalanche C-Chain",
        CHAIN_ID_BASE => "Base",
        _ => "Unknown",
    }
}

/// Environment variable holding a private RPC URL for a chain
pub fn get_rpc_env_key(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("ETH_HTTP_URL"),
        CHAIN_ID_BSC => Some("BSC_HTTP_URL"),
        CHAIN_ID_POLYGON => Some("POLYGON_HTTP_URL"),
        CHAIN_ID_ARBITRUM => Some("ARBITRUM_HTTP_URL"),
        CHAIN_ID_OPTIMISM => Some("OPTIMISM_HTTP_URL"),
        CHAIN_ID_AVALANCHE => Some("AVALANCHE_HTTP_URL"),
        CHAIN_ID_BASE => Some("BASE_HTTP_URL"),
        _ => None,
    }
}

/// Get public RPC fallback URL for a chain
pub fn get_public_rpc_fallback(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("https://eth.llamarpc.com"),
        CHAIN_ID_BSC => Some("https://bsc-dataseed.binance.org"),
        CHAIN_ID_POLYGON => Some("https://polygon-rpc.com"),
        CHAIN_ID_ARBITRUM => Some("https://arb1.arbitrum.io/rpc"),
        CHAIN_ID_OPTIMISM => Some("https://mainnet.optimism.io"),
        CHAIN_ID_AVALANCHE => Some("https://api.avax.network/ext/bc/C/rpc"),
        CHAIN_ID_BASE => Some("https://mainnet.base.org"),
        _ => None,
    }
}

// ============================================
// DEXSCREENER CHAIN MAPPING
// ============================================

/// Convert numeric chain ID to DexScreener chain name
pub fn chain_id_to_dexscreener_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("ethereum"),
        CHAIN_ID_BSC => Some("bsc"),
        CHAIN_ID_POLYGON => Some("polygon"),
        CHAIN_ID_ARBITRUM => Some("arbitrum"),
        CHAIN_ID_OPTIMISM => Some("optimism"),
        CHAIN_ID_AVALANCHE => Some("avalanche"),
        CHAIN_ID_BASE => Some("base"),
        _ => None,
    }
}

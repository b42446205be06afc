//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::models::errors::AppError;
use crate::models::types::{ContractSource, ContractTarget, RiskLevel};
use crate::utils::cache::CacheStats;
use crate::utils::telemetry::TelemetryStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    /// Safe to retry the same request later
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from(&AppError::bad_request(message))
    }

    pub fn unauthorized() -> Self {
        Self {
            code: "API_UNAUTHORIZED".to_string(),
            message: "Invalid or missing API key".to_string(),
            retryable: false,
            details: None,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "API_RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            retryable: true,
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            retryable: err.is_retryable(),
            details: None,
        }
    }
}

// ============================================
// Trap Check
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapCheckRequest {
    pub address: String,
    /// Defaults to the configured chain
    #[serde(default, alias = "chain_id")]
    pub chain_id: Option<u64>,
}

/// `GET /api/trap-check?address=&chain=` and `GET /api/getSource?address=&chain=`
#[derive(Debug, Deserialize)]
pub struct TrapCheckQuery {
    pub address: Option<String>,
    /// Chain id or short name ("bsc", "eth", ...)
    pub chain: Option<String>,
}

// ============================================
// Batch Check
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckRequest {
    pub addresses: Vec<String>,
    #[serde(default, alias = "chain_id")]
    pub chain_id: Option<u64>,
    /// Max concurrent checks (default: 10, max: 50)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    10
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckData {
    pub total_requested: usize,
    pub total_processed: usize,
    pub total_high: usize,
    pub total_medium: usize,
    pub total_low: usize,
    pub total_failed: usize,
    pub results: Vec<BatchItemResult>,
    pub processing_time_ms: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub address: String,
    pub status: String, // "success" | "error"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trap_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
}

// ============================================
// Source Scan
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceScanRequest {
    pub source: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "chain_id")]
    pub chain_id: Option<u64>,
}

// ============================================
// Verified Source
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceData {
    pub address: String,
    pub chain_id: u64,
    /// Raw explorer `SourceCode` field
    pub source: String,
    pub contract_name: String,
    pub compiler: String,
}

impl SourceData {
    pub fn new(target: &ContractTarget, contract: ContractSource) -> Self {
        Self {
            address: target.address.clone(),
            chain_id: target.chain_id,
            source: contract.source,
            contract_name: contract.contract_name,
            compiler: contract.compiler,
        }
    }
}

// ============================================
// Stats / Health
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub checks: TelemetryStats,
    pub cache: CacheStats,
    pub uptime_seconds: u64,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub default_chain_id: u64,
}

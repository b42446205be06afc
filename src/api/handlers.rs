//! API Request Handlers

use alloy_primitives::Address;
use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::types::*;
use crate::core::aggregator::RiskAggregator;
use crate::models::config::CheckerConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{ContractTarget, RiskAssessment, RiskLevel};
use crate::providers::ContractDataSource;
use crate::utils::cache::AssessmentCache;
use crate::utils::constants::{is_chain_supported, parse_chain, APP_VERSION, MAX_BATCH_ADDRESSES};
use crate::utils::telemetry::CheckTelemetry;

/// Max risk checks in flight across all requests
const MAX_INFLIGHT_CHECKS: usize = 100;

type HandlerError = (StatusCode, Json<ApiResponse<()>>);

/// Shared application state
pub struct AppState {
    pub source: Arc<dyn ContractDataSource>,
    pub aggregator: RiskAggregator,
    pub config: CheckerConfig,
    pub cache: AssessmentCache,
    pub telemetry: Arc<CheckTelemetry>,
    pub start_time: Instant,
    pub batch_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: CheckerConfig, source: Arc<dyn ContractDataSource>, cache_ttl_secs: u64) -> Self {
        let cache = AssessmentCache::with_ttl(cache_ttl_secs);

        // Background task: cleanup expired cache entries every 60 seconds
        let cache_clone = cache.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                cache_clone.cleanup_expired();
            }
        });

        Self {
            source,
            aggregator: RiskAggregator::new(&config),
            config,
            cache,
            telemetry: Arc::new(CheckTelemetry::new()),
            start_time: Instant::now(),
            batch_semaphore: Arc::new(Semaphore::new(MAX_INFLIGHT_CHECKS)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Validate the address and chain of an incoming request
    pub fn resolve_target(&self, address: &str, chain_id: Option<u64>) -> AppResult<ContractTarget> {
        let address = address.trim();
        address
            .parse::<Address>()
            .map_err(|_| AppError::invalid_address(format!("Invalid contract address: {:?}", address)))?;

        let chain_id = chain_id.unwrap_or(self.config.default_chain_id);
        if !is_chain_supported(chain_id) {
            return Err(AppError::unsupported_chain(chain_id));
        }
        Ok(ContractTarget::new(chain_id, address))
    }

    /// Cached assessment, or a fresh one under the request deadline
    pub async fn check(&self, target: &ContractTarget) -> AppResult<Arc<RiskAssessment>> {
        if let Some(hit) = self.cache.get(target) {
            return Ok(hit);
        }

        let _permit = self
            .batch_semaphore
            .acquire()
            .await
            .map_err(|_| AppError::request_cancelled("Server is shutting down"))?;

        let start = Instant::now();
        let result = self
            .aggregator
            .assess_within(self.source.as_ref(), target, self.config.request_timeout)
            .await;

        match result {
            Ok(assessment) => {
                self.telemetry
                    .record(&assessment, start.elapsed().as_millis() as u64);
                let assessment = Arc::new(assessment);
                self.cache.set(target, Arc::clone(&assessment));
                Ok(assessment)
            }
            Err(e) => {
                if e.code == ErrorCode::RequestTimeout {
                    self.telemetry.record_timeout();
                }
                Err(e)
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn error_response(err: &AppError, start: Instant) -> HandlerError {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("❌ {}", err);
    } else {
        warn!("⚠️ {}", err);
    }
    (
        status,
        Json(ApiResponse::error(ApiError::from(err), elapsed_ms(start))),
    )
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: APP_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
        default_chain_id: state.config.default_chain_id,
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Trap Check
// ============================================

pub async fn trap_check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrapCheckRequest>,
) -> Result<Json<ApiResponse<RiskAssessment>>, HandlerError> {
    let start = Instant::now();
    let target = state
        .resolve_target(&req.address, req.chain_id)
        .map_err(|e| error_response(&e, start))?;

    run_check(&state, target, start).await
}

/// Target from `?address=0x..&chain=bsc`
fn query_target(state: &AppState, query: TrapCheckQuery) -> AppResult<ContractTarget> {
    let address = query
        .address
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Missing ?address parameter"))?;

    let chain_id = match query.chain.as_deref() {
        Some(selector) => Some(
            parse_chain(selector)
                .ok_or_else(|| AppError::bad_request(format!("Unknown chain: {}", selector)))?,
        ),
        None => None,
    };

    state.resolve_target(&address, chain_id)
}

/// `GET /api/trap-check?address=0x..&chain=bsc`
pub async fn trap_check_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrapCheckQuery>,
) -> Result<Json<ApiResponse<RiskAssessment>>, HandlerError> {
    let start = Instant::now();
    let target = query_target(&state, query).map_err(|e| error_response(&e, start))?;

    run_check(&state, target, start).await
}

async fn run_check(
    state: &AppState,
    target: ContractTarget,
    start: Instant,
) -> Result<Json<ApiResponse<RiskAssessment>>, HandlerError> {
    let assessment = state
        .check(&target)
        .await
        .map_err(|e| error_response(&e, start))?;

    info!(
        "🔍 Trap check {} on chain {}: {} ({} pts) in {:.1}ms",
        target.address,
        target.chain_id,
        assessment.risk_level().as_str(),
        assessment.total_score(),
        elapsed_ms(start)
    );

    Ok(Json(ApiResponse::success(
        RiskAssessment::clone(&assessment),
        elapsed_ms(start),
    )))
}

// ============================================
// Source Scan
// ============================================

/// Scan pasted source text. Only the pattern analyzer has input.
pub async fn scan_source(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SourceScanRequest>,
) -> Result<Json<ApiResponse<RiskAssessment>>, HandlerError> {
    let start = Instant::now();

    if req.source.trim().is_empty() {
        return Err(error_response(
            &AppError::bad_request("Source text is empty"),
            start,
        ));
    }
    let chain_id = req.chain_id.unwrap_or(state.config.default_chain_id);
    let address = req.address.unwrap_or_default();

    let assessment = state.aggregator.scan_source(&address, chain_id, &req.source);
    Ok(Json(ApiResponse::success(assessment, elapsed_ms(start))))
}

// ============================================
// Verified Source
// ============================================

/// `GET /api/getSource?address=0x..&chain=eth`: raw published source
pub async fn get_source(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrapCheckQuery>,
) -> Result<Json<ApiResponse<SourceData>>, HandlerError> {
    let start = Instant::now();
    let target = query_target(&state, query).map_err(|e| error_response(&e, start))?;

    let limit = state.config.call_timeout;
    let contract = tokio::time::timeout(limit, state.source.contract_source(&target))
        .await
        .map_err(|_| {
            AppError::external_timeout(format!("source lookup exceeded {}ms", limit.as_millis()))
        })
        .and_then(|result| result)
        .map_err(|e| error_response(&e, start))?;

    info!(
        "📄 Source for {} on chain {}: {} ({} bytes)",
        target.address,
        target.chain_id,
        contract.contract_name,
        contract.source.len()
    );

    Ok(Json(ApiResponse::success(
        SourceData::new(&target, contract),
        elapsed_ms(start),
    )))
}

// ============================================
// Batch Check
// ============================================

pub async fn batch_check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchCheckRequest>,
) -> Result<Json<ApiResponse<BatchCheckData>>, HandlerError> {
    let start = Instant::now();

    if req.addresses.is_empty() {
        return Err(error_response(
            &AppError::bad_request("Empty address list"),
            start,
        ));
    }
    if req.addresses.len() > MAX_BATCH_ADDRESSES {
        return Err(error_response(
            &AppError::bad_request(format!(
                "Max {} addresses per batch (got {})",
                MAX_BATCH_ADDRESSES,
                req.addresses.len()
            )),
            start,
        ));
    }

    let concurrency = req.concurrency.clamp(1, MAX_BATCH_ADDRESSES);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let total_requested = req.addresses.len();

    info!(
        "📦 Batch check: {} addresses (concurrency: {})",
        total_requested, concurrency
    );

    let handles: Vec<_> = req
        .addresses
        .into_iter()
        .map(|address| {
            let state = Arc::clone(&state);
            let sem = Arc::clone(&semaphore);
            let chain_id = req.chain_id;
            let handle = tokio::spawn({
                let address = address.clone();
                async move {
                    let item_start = Instant::now();
                    let result = match sem.acquire().await {
                        Ok(_permit) => match state.resolve_target(&address, chain_id) {
                            Ok(target) => state.check(&target).await,
                            Err(e) => Err(e),
                        },
                        Err(_) => Err(AppError::request_cancelled("Batch was cancelled")),
                    };
                    batch_item(address, result, item_start)
                }
            });
            (address, handle)
        })
        .collect();

    let (addresses, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    let results: Vec<BatchItemResult> = join_all(handles)
        .await
        .into_iter()
        .zip(addresses)
        .map(|(joined, address)| {
            joined.unwrap_or_else(|e| {
                error!("❌ Batch task for {} failed: {}", address, e);
                batch_item(address, Err(AppError::internal("Check task failed")), start)
            })
        })
        .collect();

    let count = |level: RiskLevel| results.iter().filter(|r| r.risk == Some(level)).count();
    let total_failed = results.iter().filter(|r| r.status == "error").count();

    let data = BatchCheckData {
        total_requested,
        total_processed: results.len() - total_failed,
        total_high: count(RiskLevel::High),
        total_medium: count(RiskLevel::Medium),
        total_low: count(RiskLevel::Low),
        total_failed,
        processing_time_ms: elapsed_ms(start),
        results,
    };

    info!(
        "✅ Batch complete: {}/{} processed, {} HIGH, {:.0}ms",
        data.total_processed, data.total_requested, data.total_high, data.processing_time_ms
    );

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

fn batch_item(
    address: String,
    result: AppResult<Arc<RiskAssessment>>,
    start: Instant,
) -> BatchItemResult {
    match result {
        Ok(assessment) => BatchItemResult {
            address,
            status: "success".to_string(),
            risk: Some(assessment.risk_level()),
            trap_score: Some(assessment.total_score()),
            degraded: Some(assessment.is_degraded()),
            error: None,
            latency_ms: elapsed_ms(start),
        },
        Err(e) => BatchItemResult {
            address,
            status: "error".to_string(),
            risk: None,
            trap_score: None,
            degraded: None,
            error: Some(ApiError::from(&e)),
            latency_ms: elapsed_ms(start),
        },
    }
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();

    let data = StatsData {
        checks: state.telemetry.snapshot(),
        cache: state.cache.stats(),
        uptime_seconds: state.uptime_seconds(),
        api_version: "v1".to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

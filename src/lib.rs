//! Trap Checker Library
//!
//! Weighted rug-pull risk signals for verified EVM token contracts:
//! - Source patterns (mint, blacklist, tx.origin, trading toggles, ...)
//! - Owner accessor exposure
//! - LP holder concentration
//! - Self-transfers in recent token history
//!
//! Module Structure:
//! - `models/` - Types, errors, configuration
//! - `core/` - Analyzers and the risk aggregator
//! - `providers/` - Explorer, DexScreener and RPC collaborators
//! - `utils/` - Cache, constants, telemetry
//! - `api/` - HTTP surface

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    analyze_liquidity, analyze_ownership, analyze_source, analyze_transfers, CollectedSignals,
    RiskAggregator, RuleSet, STANDARD_RULES,
};
pub use models::{
    Advisory, AnalyzerFinding, AnalyzerKind, AnalyzerStatus, AppError, AppResult, CheckerConfig,
    ContractSource, ContractTarget, ErrorCode, InterfaceDecl, LiquiditySnapshot, RiskAssessment,
    RiskLevel, ScoringPolicy, ServerConfig, SourceText, TokenInfo, TransferRecord,
};
pub use providers::{ContractDataSource, ExplorerDataSource};
pub use utils::{AssessmentCache, CheckTelemetry};

//! Risk Aggregator
//!
//! Drives one risk check through Collecting → Scoring → Leveling →
//! Advising → Done. Collaborator failures are absorbed into the affected
//! analyzer's status; only the global deadline fails the whole check.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::liquidity::analyze_liquidity;
use super::ownership::analyze_ownership;
use super::rules::{RuleSet, STANDARD_RULES};
use super::source_analyzer::analyze_source;
use super::transactions::analyze_transfers;
use crate::models::config::{CheckerConfig, ScoringPolicy};
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    Advisory, AnalyzerFinding, ContractTarget, InterfaceDecl, LiquiditySnapshot, RiskAssessment,
    RiskLevel, SourceText, TokenInfo, TransferRecord,
};
use crate::providers::ContractDataSource;

/// Aggregator state machine stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentStage {
    Collecting,
    Scoring,
    Leveling,
    Advising,
    Done,
}

/// Raw collaborator results for one contract
#[derive(Debug)]
pub struct CollectedSignals {
    pub source: AppResult<SourceText>,
    pub interface: AppResult<InterfaceDecl>,
    pub liquidity: AppResult<LiquiditySnapshot>,
    pub transfers: AppResult<Vec<TransferRecord>>,
    /// Reported only, never scored
    pub token: AppResult<TokenInfo>,
}

impl CollectedSignals {
    /// Only source text is known (pasted-source scan)
    pub fn source_only(source: SourceText) -> Self {
        let skipped = || AppError::input_unavailable("not collected for a source-only scan");
        Self {
            source: Ok(source),
            interface: Err(skipped()),
            liquidity: Err(skipped()),
            transfers: Err(skipped()),
            token: Err(skipped()),
        }
    }
}

/// Combines analyzer findings into a `RiskAssessment`
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    rules: Arc<RuleSet>,
    policy: ScoringPolicy,
    call_timeout: Duration,
    top_holders: usize,
    tx_page_size: usize,
}

impl RiskAggregator {
    pub fn new(config: &CheckerConfig) -> Self {
        Self {
            rules: Arc::clone(&STANDARD_RULES),
            policy: config.scoring.clone(),
            call_timeout: config.call_timeout,
            top_holders: config.top_holders,
            tx_page_size: config.tx_page_size,
        }
    }

    /// Replace the rule set (custom deployments)
    pub fn with_rules(mut self, rules: Arc<RuleSet>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Collect inputs and assess. Never fails: an unreachable collaborator
    /// only marks its analyzer `Unavailable`.
    pub async fn assess<S>(&self, source: &S, target: &ContractTarget) -> RiskAssessment
    where
        S: ContractDataSource + ?Sized,
    {
        let start = Instant::now();
        let signals = self.collect(source, target).await;
        let assessment = self.assemble(target, signals);
        info!(
            address = %target.address,
            chain_id = target.chain_id,
            score = assessment.total_score(),
            latency_ms = start.elapsed().as_millis() as u64,
            "{}",
            assessment.summary()
        );
        assessment
    }

    /// `assess` under a global deadline. Elapsed deadline drops every
    /// in-flight collaborator call and yields `REQUEST_TIMEOUT`.
    pub async fn assess_within<S>(
        &self,
        source: &S,
        target: &ContractTarget,
        deadline: Duration,
    ) -> AppResult<RiskAssessment>
    where
        S: ContractDataSource + ?Sized,
    {
        tokio::time::timeout(deadline, self.assess(source, target))
            .await
            .map_err(|_| {
                warn!("⏱️ Risk check for {} exceeded {:?}", target.address, deadline);
                AppError::request_timeout(deadline.as_millis())
            })
    }

    /// Assess pasted source text; other analyzers report `Unavailable`
    pub fn scan_source(&self, address: &str, chain_id: u64, text: &str) -> RiskAssessment {
        let target = ContractTarget::new(chain_id, address);
        self.assemble(
            &target,
            CollectedSignals::source_only(SourceText::Flat(text.to_string())),
        )
    }

    async fn collect<S>(&self, source: &S, target: &ContractTarget) -> CollectedSignals
    where
        S: ContractDataSource + ?Sized,
    {
        debug!(stage = ?AssessmentStage::Collecting, address = %target.address);
        let limit = self.call_timeout;

        let (source_text, interface, liquidity, transfers, token) = tokio::join!(
            bounded(limit, "verified source", source.verified_source(target)),
            bounded(limit, "interface", source.interface(target)),
            bounded(limit, "liquidity", source.liquidity(target, self.top_holders)),
            bounded(
                limit,
                "transfer history",
                source.recent_transfers(target, self.tx_page_size)
            ),
            bounded(limit, "token info", source.token_info(target)),
        );

        CollectedSignals {
            source: source_text,
            interface,
            liquidity,
            transfers,
            token,
        }
    }

    /// Pure assembly of already-collected inputs
    pub fn assemble(&self, target: &ContractTarget, signals: CollectedSignals) -> RiskAssessment {
        let mut scan = analyze_source(signals.source.as_ref().ok(), &self.rules);
        let mut ownership = analyze_ownership(signals.interface.as_ref().ok(), &self.policy);
        let mut liquidity = analyze_liquidity(
            signals.liquidity.as_ref().ok(),
            &self.policy,
            self.top_holders,
        );
        let mut transfers = analyze_transfers(
            signals.transfers.as_deref().ok(),
            &self.policy,
            self.tx_page_size,
        );

        attach_error(&mut scan.finding, &signals.source);
        attach_error(&mut ownership, &signals.interface);
        attach_error(&mut liquidity.finding, &signals.liquidity);
        attach_error(&mut transfers.finding, &signals.transfers);

        debug!(stage = ?AssessmentStage::Scoring);
        let findings: BTreeMap<&'static str, AnalyzerFinding> = [
            scan.finding.clone(),
            ownership.clone(),
            liquidity.finding.clone(),
            transfers.finding.clone(),
        ]
        .into_iter()
        .map(|f| (f.analyzer.as_str(), f))
        .collect();

        let total = findings
            .values()
            .fold(0u32, |acc, f| acc.saturating_add(f.score_contribution));

        for finding in findings.values().filter(|f| !f.is_available()) {
            warn!(
                analyzer = finding.analyzer.as_str(),
                error = finding.error.as_deref().unwrap_or("-"),
                "⚠️ Analyzer unavailable: {}",
                finding.message
            );
        }

        debug!(stage = ?AssessmentStage::Leveling, total);
        let risk = RiskLevel::from_score(total, &self.policy);

        debug!(stage = ?AssessmentStage::Advising);
        let mut advisories: BTreeSet<Advisory> = scan.advisories.clone();
        if liquidity.concentration_risk {
            advisories.insert(Advisory::LiquidityConcentration);
        }
        if !transfers.suspicious.is_empty() {
            advisories.insert(Advisory::SuspiciousTransfers);
        }
        let suggestions = advisories
            .iter()
            .map(|a| a.sentence().to_string())
            .collect();

        if let Err(e) = &signals.token {
            debug!(error = %e, "Token info unavailable");
        }

        debug!(stage = ?AssessmentStage::Done);
        RiskAssessment {
            address: target.address.clone(),
            chain_id: target.chain_id,
            trap_count: scan.code_traps.len(),
            owner_trap_count: scan.owner_traps.len(),
            traps: scan.code_traps.iter().map(|l| l.to_string()).collect(),
            owner_traps: scan.owner_traps.iter().map(|l| l.to_string()).collect(),
            trap_score: total,
            risk,
            owner_status: ownership.message.clone(),
            concentration_risk: liquidity.concentration_risk,
            top_holders: liquidity.holders,
            suspicious_txs: transfers.suspicious,
            suggestions,
            note: risk.note().to_string(),
            findings,
            token_info: signals.token.ok(),
        }
    }
}

/// Run one collaborator call under its own timeout
async fn bounded<T, F>(limit: Duration, what: &'static str, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::external_timeout(format!(
            "{} call exceeded {}ms",
            what,
            limit.as_millis()
        ))),
    }
}

fn attach_error<T>(finding: &mut AnalyzerFinding, input: &AppResult<T>) {
    if let Err(e) = input {
        finding.error = Some(e.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{RuleCategory, RuleSpec};
    use crate::models::types::{AnalyzerKind, AnalyzerStatus, HolderBalance};
    use alloy_primitives::U256;

    fn aggregator() -> RiskAggregator {
        RiskAggregator::new(&CheckerConfig::default())
    }

    fn target() -> ContractTarget {
        ContractTarget::new(56, "0x1111111111111111111111111111111111111111")
    }

    fn nothing() -> CollectedSignals {
        let gone = || AppError::input_unavailable("down");
        CollectedSignals {
            source: Err(gone()),
            interface: Err(gone()),
            liquidity: Err(gone()),
            transfers: Err(gone()),
            token: Err(gone()),
        }
    }

    #[test]
    fn test_all_unavailable_still_assesses() {
        let assessment = aggregator().assemble(&target(), nothing());
        assert_eq!(assessment.total_score(), 0);
        assert_eq!(assessment.risk_level(), RiskLevel::Low);
        assert_eq!(assessment.findings().len(), 4);
        assert!(assessment.is_degraded());
        assert!(assessment.findings().values().all(|f| f.error.is_some()));
        assert_eq!(assessment.owner_status(), "ownership status indeterminate");
        assert!(assessment.suggestions().is_empty());
    }

    #[test]
    fn test_total_sums_every_analyzer() {
        let signals = CollectedSignals {
            source: Ok(SourceText::Flat("tx.origin == owner; function mint(address a) {}".into())),
            interface: Ok(InterfaceDecl::new(["owner", "transfer"])),
            liquidity: Ok(LiquiditySnapshot {
                pool_address: "0xpool".into(),
                total_supply: U256::from(100u64),
                top_holders: vec![HolderBalance {
                    address: "0xwhale".into(),
                    balance: U256::from(90u64),
                }],
            }),
            transfers: Ok(vec![TransferRecord {
                hash: "0xdead".into(),
                from: "0xa".into(),
                to: "0xA".into(),
                ..TransferRecord::default()
            }]),
            token: Ok(TokenInfo {
                symbol: Some("TRAP".into()),
                verified: true,
                ..TokenInfo::default()
            }),
        };
        let assessment = aggregator().assemble(&target(), signals);
        // 15 + 20 + owner 5 + concentration 10 + self-transfer 5
        assert_eq!(assessment.total_score(), 55);
        assert_eq!(assessment.risk_level(), RiskLevel::Medium);
        assert!(!assessment.is_degraded());
        assert_eq!(
            assessment.suggestions(),
            &[
                Advisory::TxOriginTrap.sentence().to_string(),
                Advisory::Mint.sentence().to_string(),
                Advisory::LiquidityConcentration.sentence().to_string(),
                Advisory::SuspiciousTransfers.sentence().to_string(),
            ]
        );
        assert_eq!(assessment.note(), RiskLevel::Medium.note());
        assert_eq!(assessment.token_info().unwrap().symbol.as_deref(), Some("TRAP"));
    }

    #[test]
    fn test_custom_rule_set() {
        let specs = [RuleSpec {
            id: "hidden_fee",
            category: RuleCategory::CodeTrap,
            pattern: r"_hiddenFee",
            label: "_hiddenFee (undisclosed fee)",
            weight: 40,
            advisory: None,
        }];
        let aggregator = aggregator().with_rules(Arc::new(RuleSet::from_specs(&specs)));
        assert_eq!(aggregator.rules().len(), 1);

        let assessment = aggregator.scan_source("0xabc", 56, "uint _hiddenFee; function mint() {}");
        // standard rules are gone, mint no longer matches
        assert_eq!(assessment.traps(), &["_hiddenFee (undisclosed fee)".to_string()]);
        assert!(assessment.owner_traps().is_empty());
        assert_eq!(assessment.total_score(), 40);
        assert_eq!(assessment.risk_level(), RiskLevel::Medium);
    }

    #[test]
    fn test_suggestion_order_is_fixed() {
        // trading toggle before blacklist in the text, advisories still in priority order
        let assessment = aggregator().scan_source(
            "0xabc",
            56,
            "function openTrading() {} mapping(address=>bool) isBlacklisted;",
        );
        assert_eq!(
            assessment.suggestions(),
            &[
                Advisory::Blacklist.sentence().to_string(),
                Advisory::TradingToggle.sentence().to_string(),
            ]
        );
    }

    #[test]
    fn test_scan_source_marks_other_analyzers_unavailable() {
        let assessment = aggregator().scan_source("0xabc", 56, "function mint(address a) {}");
        let source = assessment.finding(AnalyzerKind::SourcePatterns).unwrap();
        assert_eq!(source.status, AnalyzerStatus::Ok);
        for kind in [
            AnalyzerKind::Ownership,
            AnalyzerKind::Liquidity,
            AnalyzerKind::TransactionHistory,
        ] {
            assert_eq!(
                assessment.finding(kind).unwrap().status,
                AnalyzerStatus::Unavailable
            );
        }
        assert_eq!(assessment.total_score(), 20);
    }

    #[test]
    fn test_output_fields_always_present() {
        let assessment = aggregator().assemble(&target(), nothing());
        let json = serde_json::to_value(&assessment).unwrap();
        for key in [
            "address",
            "chainId",
            "trapCount",
            "ownerTrapCount",
            "traps",
            "ownerTraps",
            "trapScore",
            "risk",
            "ownerStatus",
            "concentrationRisk",
            "topHolders",
            "suspiciousTxs",
            "suggestions",
            "note",
            "findings",
            "tokenInfo",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["traps"], serde_json::json!([]));
        assert_eq!(json["risk"], "LOW");
        assert!(json["tokenInfo"].is_null());
    }
}

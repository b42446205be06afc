//! Type definitions for the Trap Checker
//! Inputs consumed from collaborators, per-analyzer findings and the
//! aggregated assessment returned to callers.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

use super::config::ScoringPolicy;

// ============================================
// Risk level
// ============================================

/// Ordinal risk classification of a total score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Inclusive-low thresholds: `medium_threshold` is MEDIUM, `high_threshold` is HIGH
    pub fn from_score(score: u32, policy: &ScoringPolicy) -> Self {
        if score >= policy.high_threshold {
            RiskLevel::High
        } else if score >= policy.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "✅",
            RiskLevel::Medium => "⚠️",
            RiskLevel::High => "🚨",
        }
    }

    /// Summary sentence shown with the verdict
    pub fn note(&self) -> &'static str {
        match self {
            RiskLevel::High => "🚨 Token shows many dangerous trap signals. DO NOT invest.",
            RiskLevel::Medium => {
                "⚠️ Risk signals detected. Review LP ownership and simulate a test sell."
            }
            RiskLevel::Low => "✅ No common traps detected. Still test with a small trade first.",
        }
    }
}

// ============================================
// Advisories
// ============================================

/// Signal categories that produce an advisory sentence.
/// Declaration order is the order suggestions are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    TxOriginTrap,
    Blacklist,
    TaxWallet,
    Mint,
    TradingToggle,
    LiquidityConcentration,
    SuspiciousTransfers,
}

impl Advisory {
    pub fn sentence(&self) -> &'static str {
        match self {
            Advisory::TxOriginTrap => {
                "→ Possible DEX router trap (tx.origin check); simulate a SELL to confirm."
            }
            Advisory::Blacklist => {
                "→ Wallets may be blacklisted when selling; review the owner functions."
            }
            Advisory::TaxWallet => "→ Dev can manually withdraw collected tax.",
            Advisory::Mint => "→ Token supply can be minted without limit; high rug risk.",
            Advisory::TradingToggle => "→ Dev can disable trading at any time.",
            Advisory::LiquidityConcentration => {
                "→ A single holder controls a large share of the LP; high LP rug risk."
            }
            Advisory::SuspiciousTransfers => {
                "→ Transaction history shows signs of liquidity removal or tax-wallet activity."
            }
        }
    }
}

// ============================================
// Analyzer findings
// ============================================

/// The four independent analyzers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    SourcePatterns,
    Ownership,
    Liquidity,
    TransactionHistory,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::SourcePatterns => "source_patterns",
            AnalyzerKind::Ownership => "ownership",
            AnalyzerKind::Liquidity => "liquidity",
            AnalyzerKind::TransactionHistory => "transaction_history",
        }
    }
}

/// Completion status of one analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyzerStatus {
    Ok,
    /// Completed, but part of the input had to be skipped
    PartialFailure,
    /// No usable input; contributes nothing
    Unavailable,
}

/// Output of one analyzer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerFinding {
    pub analyzer: AnalyzerKind,
    pub status: AnalyzerStatus,
    /// Ids of fired rules, in rule-table order
    pub matched_rules: Vec<&'static str>,
    /// Sum of matched weights plus any analyzer bonus
    pub score_contribution: u32,
    /// Named sub-scores (e.g. code vs owner traps)
    pub breakdown: BTreeMap<&'static str, u32>,
    pub message: String,
    /// Collaborator error behind an `Unavailable` status
    pub error: Option<String>,
}

impl AnalyzerFinding {
    pub fn new(analyzer: AnalyzerKind, status: AnalyzerStatus, message: impl Into<String>) -> Self {
        Self {
            analyzer,
            status,
            matched_rules: Vec::new(),
            score_contribution: 0,
            breakdown: BTreeMap::new(),
            message: message.into(),
            error: None,
        }
    }

    /// Zero-score finding for an analyzer that had no usable input
    pub fn unavailable(analyzer: AnalyzerKind, message: impl Into<String>) -> Self {
        Self::new(analyzer, AnalyzerStatus::Unavailable, message)
    }

    pub fn is_available(&self) -> bool {
        self.status != AnalyzerStatus::Unavailable
    }
}

// ============================================
// Collaborator inputs
// ============================================

/// Contract being checked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractTarget {
    pub chain_id: u64,
    pub address: String,
}

impl ContractTarget {
    pub fn new(chain_id: u64, address: impl Into<String>) -> Self {
        Self {
            chain_id,
            address: address.into(),
        }
    }

    /// Cache key: chain id plus lowercase address
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.chain_id, self.address.to_lowercase())
    }
}

/// One file of a multi-file verified source bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

/// Verified source as returned by the explorer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceText {
    /// Single flattened file
    Flat(String),
    /// Multi-file bundle, in the explorer's key order
    Bundle(Vec<SourceFile>),
}

impl SourceText {
    /// All source as one text blob; bundle files joined by newlines
    pub fn flatten(&self) -> Cow<'_, str> {
        match self {
            SourceText::Flat(text) => Cow::Borrowed(text.as_str()),
            SourceText::Bundle(files) => Cow::Owned(
                files
                    .iter()
                    .map(|f| f.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }

    /// True when there is no non-whitespace source at all
    pub fn is_empty(&self) -> bool {
        match self {
            SourceText::Flat(text) => text.trim().is_empty(),
            SourceText::Bundle(files) => files.iter().all(|f| f.content.trim().is_empty()),
        }
    }

    pub fn file_count(&self) -> usize {
        match self {
            SourceText::Flat(_) => 1,
            SourceText::Bundle(files) => files.len(),
        }
    }
}

/// Declared interface: function names from the ABI, in ABI order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceDecl {
    pub functions: Vec<String>,
}

impl InterfaceDecl {
    pub fn new<I, S>(functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            functions: functions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn declares(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f == name)
    }
}

/// Raw LP token balance of one holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderBalance {
    pub address: String,
    pub balance: U256,
}

/// LP token supply and its largest holders, ordered by balance (desc)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquiditySnapshot {
    pub pool_address: String,
    pub total_supply: U256,
    pub top_holders: Vec<HolderBalance>,
}

/// Holder share of the LP supply, as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderShare {
    pub address: String,
    /// Raw balance as a decimal string
    pub balance: String,
    /// Two-decimal percentage, truncated ("40.00")
    pub percent: String,
    pub basis_points: u64,
}

/// Token transfer record from the explorer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub token_symbol: String,
}

impl TransferRecord {
    /// Sender and receiver are the same address (case-insensitive)
    pub fn is_self_transfer(&self) -> bool {
        !self.from.is_empty() && self.from.eq_ignore_ascii_case(&self.to)
    }
}

/// Token metadata reported next to the verdict. Never scored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    /// Raw supply as a decimal string
    pub total_supply: Option<String>,
    /// Explorer `ContractName`
    pub contract_name: Option<String>,
    /// Explorer `CompilerVersion`
    pub compiler: Option<String>,
    pub verified: bool,
}

/// Contract as published on the explorer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSource {
    /// Raw `SourceCode` field, bundles left as published
    pub source: String,
    pub contract_name: String,
    pub compiler: String,
}

impl ContractSource {
    pub fn is_verified(&self) -> bool {
        !self.source.trim().is_empty()
    }
}

// ============================================
// Aggregated assessment
// ============================================

/// Final verdict for one contract. Built once by the aggregator and never
/// modified afterwards; every field is always present in the output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub(crate) address: String,
    pub(crate) chain_id: u64,
    pub(crate) trap_count: usize,
    pub(crate) owner_trap_count: usize,
    pub(crate) traps: Vec<String>,
    pub(crate) owner_traps: Vec<String>,
    pub(crate) trap_score: u32,
    pub(crate) risk: RiskLevel,
    pub(crate) owner_status: String,
    pub(crate) concentration_risk: bool,
    pub(crate) top_holders: Vec<HolderShare>,
    pub(crate) suspicious_txs: Vec<TransferRecord>,
    pub(crate) suggestions: Vec<String>,
    pub(crate) note: String,
    pub(crate) findings: BTreeMap<&'static str, AnalyzerFinding>,
    pub(crate) token_info: Option<TokenInfo>,
}

impl RiskAssessment {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn total_score(&self) -> u32 {
        self.trap_score
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk
    }

    pub fn traps(&self) -> &[String] {
        &self.traps
    }

    pub fn owner_traps(&self) -> &[String] {
        &self.owner_traps
    }

    pub fn owner_status(&self) -> &str {
        &self.owner_status
    }

    pub fn concentration_risk(&self) -> bool {
        self.concentration_risk
    }

    pub fn top_holders(&self) -> &[HolderShare] {
        &self.top_holders
    }

    pub fn suspicious_txs(&self) -> &[TransferRecord] {
        &self.suspicious_txs
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn findings(&self) -> &BTreeMap<&'static str, AnalyzerFinding> {
        &self.findings
    }

    pub fn finding(&self, kind: AnalyzerKind) -> Option<&AnalyzerFinding> {
        self.findings.get(kind.as_str())
    }

    pub fn token_info(&self) -> Option<&TokenInfo> {
        self.token_info.as_ref()
    }

    /// At least one analyzer could not run
    pub fn is_degraded(&self) -> bool {
        self.findings.values().any(|f| !f.is_available())
    }

    /// One-line log summary
    pub fn summary(&self) -> String {
        format!(
            "{} Risk: {} | score {} | {} trap(s), {} owner trap(s) | {}",
            self.risk.emoji(),
            self.risk.as_str(),
            self.trap_score,
            self.trap_count,
            self.owner_trap_count,
            self.address
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries_are_inclusive_low() {
        let policy = ScoringPolicy::default();
        assert_eq!(RiskLevel::from_score(0, &policy), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(29, &policy), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30, &policy), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(59, &policy), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60, &policy), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(500, &policy), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"MEDIUM\"");
    }

    #[test]
    fn test_bundle_flatten_keeps_order() {
        let source = SourceText::Bundle(vec![
            SourceFile { name: "b.sol".into(), content: "contract B {}".into() },
            SourceFile { name: "a.sol".into(), content: "contract A {}".into() },
        ]);
        assert_eq!(source.flatten(), "contract B {}\ncontract A {}");
        assert_eq!(source.file_count(), 2);
    }

    #[test]
    fn test_whitespace_source_is_empty() {
        assert!(SourceText::Flat("  \n\t".into()).is_empty());
        assert!(SourceText::Bundle(vec![]).is_empty());
        assert!(!SourceText::Flat("pragma solidity ^0.8.0;".into()).is_empty());
    }

    #[test]
    fn test_self_transfer_is_case_insensitive() {
        let tx = TransferRecord {
            hash: "0x01".into(),
            from: "0xABCDEF".into(),
            to: "0xabcdef".into(),
            ..TransferRecord::default()
        };
        assert!(tx.is_self_transfer());

        let blank = TransferRecord::default();
        assert!(!blank.is_self_transfer());
    }

    #[test]
    fn test_transfer_record_explorer_field_names() {
        let json = r#"{"hash":"0x1","from":"0xa","to":"0xb","value":"10",
            "tokenName":"Trap","tokenSymbol":"TRP","blockNumber":"1"}"#;
        let tx: TransferRecord = serde_json::from_str(json).unwrap();
        assert_eq!(tx.token_symbol, "TRP");
        let out = serde_json::to_value(&tx).unwrap();
        assert_eq!(out["tokenName"], "Trap");
    }

    #[test]
    fn test_blank_contract_source_is_unverified() {
        let published = ContractSource {
            source: "contract A {}".into(),
            ..ContractSource::default()
        };
        assert!(published.is_verified());
        assert!(!ContractSource { source: " \n".into(), ..published }.is_verified());
    }
}

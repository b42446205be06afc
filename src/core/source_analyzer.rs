//! Source Pattern Analyzer
//!
//! Applies every rule to the flattened verified source. Rules are evaluated
//! independently with no short-circuit, so one contract may fire many.

use std::collections::BTreeSet;

use super::rules::{RuleCategory, RuleSet};
use crate::models::types::{Advisory, AnalyzerFinding, AnalyzerKind, AnalyzerStatus, SourceText};

/// Breakdown key for the code-trap sub-score
pub const CODE_TRAP_SCORE: &str = "codeTrapScore";
/// Breakdown key for the owner-trap sub-score
pub const OWNER_TRAP_SCORE: &str = "ownerTrapScore";

/// Source analyzer result
#[derive(Debug, Clone)]
pub struct SourceScan {
    pub finding: AnalyzerFinding,
    /// Labels of fired code-trap rules, table order
    pub code_traps: Vec<&'static str>,
    /// Labels of fired owner-trap rules, table order
    pub owner_traps: Vec<&'static str>,
    pub advisories: BTreeSet<Advisory>,
}

impl SourceScan {
    fn unavailable(message: &str) -> Self {
        let mut finding = AnalyzerFinding::unavailable(AnalyzerKind::SourcePatterns, message);
        finding.breakdown.insert(CODE_TRAP_SCORE, 0);
        finding.breakdown.insert(OWNER_TRAP_SCORE, 0);
        Self {
            finding,
            code_traps: Vec::new(),
            owner_traps: Vec::new(),
            advisories: BTreeSet::new(),
        }
    }

    pub fn code_trap_score(&self) -> u32 {
        self.finding.breakdown.get(CODE_TRAP_SCORE).copied().unwrap_or(0)
    }

    pub fn owner_trap_score(&self) -> u32 {
        self.finding.breakdown.get(OWNER_TRAP_SCORE).copied().unwrap_or(0)
    }
}

/// Scan source text. Empty or absent source is `Unavailable`, which is
/// distinct from an available source where nothing matched.
pub fn analyze_source(source: Option<&SourceText>, rules: &RuleSet) -> SourceScan {
    let Some(source) = source.filter(|s| !s.is_empty()) else {
        return SourceScan::unavailable("source code unavailable (contract not verified)");
    };

    let text = source.flatten();
    let mut finding = AnalyzerFinding::new(AnalyzerKind::SourcePatterns, AnalyzerStatus::Ok, "");
    let mut code_traps = Vec::new();
    let mut owner_traps = Vec::new();
    let mut advisories = BTreeSet::new();
    let mut code_score: u32 = 0;
    let mut owner_score: u32 = 0;
    let mut skipped = 0usize;

    for rule in rules.iter() {
        match rule.matches(&text) {
            Some(true) => {}
            Some(false) => continue,
            None => {
                skipped += 1;
                continue;
            }
        }

        finding.matched_rules.push(rule.id);
        match rule.category {
            RuleCategory::CodeTrap => {
                code_score = code_score.saturating_add(rule.weight);
                code_traps.push(rule.label);
            }
            RuleCategory::OwnerTrap => {
                owner_score = owner_score.saturating_add(rule.weight);
                owner_traps.push(rule.label);
            }
        }
        if let Some(advisory) = rule.advisory {
            advisories.insert(advisory);
        }
    }

    finding.breakdown.insert(CODE_TRAP_SCORE, code_score);
    finding.breakdown.insert(OWNER_TRAP_SCORE, owner_score);
    finding.score_contribution = code_score.saturating_add(owner_score);
    finding.message = format!(
        "{} code trap(s), {} owner trap(s) in {} file(s)",
        code_traps.len(),
        owner_traps.len(),
        source.file_count()
    );
    if skipped > 0 {
        finding.message.push_str(&format!("; {} rule(s) skipped", skipped));
    }

    SourceScan {
        finding,
        code_traps,
        owner_traps,
        advisories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{RuleSpec, STANDARD_RULE_SPECS};
    use crate::models::types::SourceFile;

    fn flat(text: &str) -> SourceText {
        SourceText::Flat(text.to_string())
    }

    #[test]
    fn test_empty_source_is_unavailable() {
        let rules = RuleSet::standard();
        for source in [None, Some(flat("")), Some(flat("   \n"))] {
            let scan = analyze_source(source.as_ref(), &rules);
            assert_eq!(scan.finding.status, AnalyzerStatus::Unavailable);
            assert_eq!(scan.finding.score_contribution, 0);
        }
    }

    #[test]
    fn test_no_match_is_ok_not_unavailable() {
        let rules = RuleSet::standard();
        let scan = analyze_source(Some(&flat("contract Plain { uint256 x; }")), &rules);
        assert_eq!(scan.finding.status, AnalyzerStatus::Ok);
        assert_eq!(scan.finding.score_contribution, 0);
        assert!(scan.finding.matched_rules.is_empty());
    }

    #[test]
    fn test_mint_only_source() {
        let rules = RuleSet::standard();
        let scan = analyze_source(
            Some(&flat("function mint(address to) external onlyOwner {}")),
            &rules,
        );
        assert_eq!(scan.finding.matched_rules, vec!["mint"]);
        assert_eq!(scan.owner_trap_score(), 20);
        assert_eq!(scan.code_trap_score(), 0);
        assert!(scan.code_traps.is_empty());
        assert!(scan.advisories.contains(&Advisory::Mint));
    }

    #[test]
    fn test_all_matching_rules_contribute() {
        let rules = RuleSet::standard();
        let source = "require(tx.origin != pair); mapping(address=>bool) bots[]; \
                      function manualSwap() external {} function setTax(uint t) {}";
        let scan = analyze_source(Some(&flat(source)), &rules);

        // tx_origin_require 10 + tax_wallet 10 + blacklist 12
        assert_eq!(scan.code_trap_score(), 32);
        // set_tax 10
        assert_eq!(scan.owner_trap_score(), 10);
        assert_eq!(scan.finding.score_contribution, 42);
        assert_eq!(
            scan.finding.matched_rules,
            vec!["tx_origin_require", "tax_wallet", "blacklist", "set_tax"]
        );
    }

    #[test]
    fn test_bundle_matches_across_files() {
        let rules = RuleSet::standard();
        let source = SourceText::Bundle(vec![
            SourceFile { name: "Token.sol".into(), content: "bool tradingOpen;".into() },
            SourceFile { name: "Owner.sol".into(), content: "function renounceOwnership() {}".into() },
        ]);
        let scan = analyze_source(Some(&source), &rules);
        assert_eq!(scan.finding.matched_rules, vec!["trading_flags", "renounce"]);
        assert!(scan.finding.message.contains("2 file(s)"));
    }

    #[test]
    fn test_unusable_rule_is_skipped() {
        let mut specs = STANDARD_RULE_SPECS.to_vec();
        specs.push(RuleSpec {
            id: "broken",
            category: RuleCategory::CodeTrap,
            pattern: "[",
            label: "broken",
            weight: 99,
            advisory: None,
        });
        let rules = RuleSet::from_specs(&specs);
        let scan = analyze_source(Some(&flat("function mint(uint a) {}")), &rules);
        assert_eq!(scan.finding.status, AnalyzerStatus::Ok);
        assert_eq!(scan.finding.score_contribution, 20);
        assert!(scan.finding.message.contains("1 rule(s) skipped"));
    }

    #[test]
    fn test_scan_is_deterministic() {
        let rules = RuleSet::standard();
        let source = flat("tx.origin == owner; maxTxAmount; openTrading(); blacklist");
        let first = analyze_source(Some(&source), &rules);
        let second = analyze_source(Some(&source), &rules);
        assert_eq!(first.finding.matched_rules, second.finding.matched_rules);
        assert_eq!(first.finding.score_contribution, second.finding.score_contribution);
    }
}

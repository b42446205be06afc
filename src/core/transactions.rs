//! Transaction History Analyzer
//!
//! Flags self-transfers (sender == receiver) in the most recent page of
//! token transfers.

use crate::models::config::ScoringPolicy;
use crate::models::types::{AnalyzerFinding, AnalyzerKind, AnalyzerStatus, TransferRecord};

/// Transaction analyzer result
#[derive(Debug, Clone)]
pub struct TransferReport {
    pub finding: AnalyzerFinding,
    /// Every self-transfer in the page, in page order
    pub suspicious: Vec<TransferRecord>,
}

pub fn analyze_transfers(
    page: Option<&[TransferRecord]>,
    policy: &ScoringPolicy,
    limit: usize,
) -> TransferReport {
    let Some(page) = page else {
        return TransferReport {
            finding: AnalyzerFinding::unavailable(
                AnalyzerKind::TransactionHistory,
                "transfer history unavailable",
            ),
            suspicious: Vec::new(),
        };
    };

    let window = &page[..page.len().min(limit)];
    let mut incomplete = 0usize;
    let suspicious: Vec<TransferRecord> = window
        .iter()
        .filter(|tx| {
            if tx.from.is_empty() || tx.to.is_empty() {
                incomplete += 1;
                return false;
            }
            tx.is_self_transfer()
        })
        .cloned()
        .collect();

    let status = if incomplete > 0 {
        AnalyzerStatus::PartialFailure
    } else {
        AnalyzerStatus::Ok
    };
    let mut finding = AnalyzerFinding::new(
        AnalyzerKind::TransactionHistory,
        status,
        format!(
            "{} self-transfer(s) in {} recent transfer(s)",
            suspicious.len(),
            window.len()
        ),
    );
    if incomplete > 0 {
        finding.error = Some(format!("{} record(s) missing sender or receiver", incomplete));
    }
    if !suspicious.is_empty() {
        finding.matched_rules.push("self_transfer");
        finding.breakdown.insert("suspiciousTxBonus", policy.suspicious_tx_bonus);
        finding.score_contribution = policy.suspicious_tx_bonus;
    }

    TransferReport { finding, suspicious }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(hash: &str, from: &str, to: &str) -> TransferRecord {
        TransferRecord {
            hash: hash.into(),
            from: from.into(),
            to: to.into(),
            value: "1000".into(),
            token_name: "Trap".into(),
            token_symbol: "TRP".into(),
        }
    }

    #[test]
    fn test_self_transfers_flagged() {
        let policy = ScoringPolicy::default();
        let page = vec![
            tx("0x1", "0xAaAa", "0xaaaa"),
            tx("0x2", "0xaaaa", "0xbbbb"),
            tx("0x3", "0xCCCC", "0xcccc"),
        ];
        let report = analyze_transfers(Some(page.as_slice()), &policy, 50);
        assert_eq!(report.suspicious.len(), 2);
        assert_eq!(report.suspicious[0], page[0]);
        assert_eq!(report.suspicious[1].hash, "0x3");
        assert_eq!(report.finding.score_contribution, 5);
    }

    #[test]
    fn test_bonus_is_flat() {
        let policy = ScoringPolicy::default();
        let page: Vec<_> = (0..10).map(|i| tx(&format!("0x{}", i), "0xa", "0xa")).collect();
        let report = analyze_transfers(Some(page.as_slice()), &policy, 50);
        assert_eq!(report.suspicious.len(), 10);
        assert_eq!(report.finding.score_contribution, 5);
    }

    #[test]
    fn test_clean_history() {
        let policy = ScoringPolicy::default();
        let report = analyze_transfers(Some(&[tx("0x1", "0xa", "0xb")][..]), &policy, 50);
        assert_eq!(report.finding.status, AnalyzerStatus::Ok);
        assert!(report.suspicious.is_empty());
        assert_eq!(report.finding.score_contribution, 0);
    }

    #[test]
    fn test_unreachable_source() {
        let policy = ScoringPolicy::default();
        let report = analyze_transfers(None, &policy, 50);
        assert_eq!(report.finding.status, AnalyzerStatus::Unavailable);
        assert!(report.suspicious.is_empty());
        assert_eq!(report.finding.score_contribution, 0);
    }

    #[test]
    fn test_page_is_bounded() {
        let policy = ScoringPolicy::default();
        let page = vec![tx("0x1", "0xa", "0xb"), tx("0x2", "0xc", "0xc")];
        let report = analyze_transfers(Some(page.as_slice()), &policy, 1);
        assert!(report.suspicious.is_empty());
    }

    #[test]
    fn test_incomplete_records_are_partial() {
        let policy = ScoringPolicy::default();
        let page = vec![tx("0x1", "", ""), tx("0x2", "0xc", "0xc")];
        let report = analyze_transfers(Some(page.as_slice()), &policy, 50);
        assert_eq!(report.finding.status, AnalyzerStatus::PartialFailure);
        assert_eq!(report.suspicious.len(), 1);
    }
}

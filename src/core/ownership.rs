//! Ownership Privilege Analyzer

use crate::models::config::ScoringPolicy;
use crate::models::types::{AnalyzerFinding, AnalyzerKind, AnalyzerStatus, InterfaceDecl};

/// Accessor names that reveal a live owner
pub const OWNER_ACCESSORS: [&str; 2] = ["owner", "getOwner"];

pub const OWNER_PRESENT: &str = "owner still holds control (not renounced)";
pub const OWNER_ABSENT: &str = "no owner accessor found (may be renounced)";
pub const OWNER_UNKNOWN: &str = "ownership status indeterminate";

/// Check the declared interface for an owner accessor.
/// A missing or empty interface is `Unavailable`.
pub fn analyze_ownership(interface: Option<&InterfaceDecl>, policy: &ScoringPolicy) -> AnalyzerFinding {
    let Some(interface) = interface.filter(|i| !i.functions.is_empty()) else {
        return AnalyzerFinding::unavailable(AnalyzerKind::Ownership, OWNER_UNKNOWN);
    };

    let accessor = OWNER_ACCESSORS.iter().find(|name| interface.declares(name));

    match accessor {
        Some(_) => {
            let mut finding =
                AnalyzerFinding::new(AnalyzerKind::Ownership, AnalyzerStatus::Ok, OWNER_PRESENT);
            finding.matched_rules.push("owner_accessor");
            finding.breakdown.insert("ownerBonus", policy.owner_bonus);
            finding.score_contribution = policy.owner_bonus;
            finding
        }
        None => AnalyzerFinding::new(AnalyzerKind::Ownership, AnalyzerStatus::Ok, OWNER_ABSENT),
    }
}

//! Liquidity Concentration Analyzer
//!
//! Holder shares are computed in basis points with integer division so the
//! two-decimal percentage is truncated, never rounded. Scaling happens in
//! 512 bits so no uint256 balance can overflow it.

use alloy_primitives::{U256, U512};

use crate::models::config::ScoringPolicy;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    AnalyzerFinding, AnalyzerKind, AnalyzerStatus, HolderShare, LiquiditySnapshot,
};
use crate::utils::constants::BPS_SCALE;

/// Liquidity analyzer result
#[derive(Debug, Clone)]
pub struct LiquidityReport {
    pub finding: AnalyzerFinding,
    pub holders: Vec<HolderShare>,
    pub concentration_risk: bool,
}

impl LiquidityReport {
    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            finding: AnalyzerFinding::unavailable(AnalyzerKind::Liquidity, message),
            holders: Vec::new(),
            concentration_risk: false,
        }
    }
}

fn widen(value: U256) -> U512 {
    let mut limbs = [0u64; 8];
    limbs[..4].copy_from_slice(value.as_limbs());
    U512::from_limbs(limbs)
}

/// `balance * 10000 / total_supply`
pub fn holder_basis_points(balance: U256, total_supply: U256) -> AppResult<u64> {
    if total_supply.is_zero() {
        return Err(AppError::invariant("LP total supply is zero"));
    }
    let bps = widen(balance) * U512::from(BPS_SCALE) / widen(total_supply);
    if bps > U512::from(u64::MAX) {
        return Err(AppError::invariant("holder share out of range"));
    }
    Ok(bps.as_limbs()[0])
}

/// Basis points as a two-decimal percentage ("40.00", "0.03")
pub fn format_percent(bps: u64) -> String {
    format!("{}.{:02}", bps / 100, bps % 100)
}

/// Compute holder shares over the first `top_n` holders and flag any single
/// holder strictly above the concentration threshold.
pub fn analyze_liquidity(
    snapshot: Option<&LiquiditySnapshot>,
    policy: &ScoringPolicy,
    top_n: usize,
) -> LiquidityReport {
    let Some(snapshot) = snapshot else {
        return LiquidityReport::unavailable("liquidity pool not resolvable");
    };
    if snapshot.pool_address.trim().is_empty() {
        return LiquidityReport::unavailable("liquidity pool not resolvable");
    }
    if snapshot.total_supply.is_zero() {
        let mut report = LiquidityReport::unavailable("LP total supply is zero");
        report.finding.error = Some(AppError::invariant("LP total supply is zero").to_string());
        return report;
    }

    let mut holders = Vec::with_capacity(top_n.min(snapshot.top_holders.len()));
    let mut skipped = 0usize;

    for holder in snapshot.top_holders.iter().take(top_n) {
        match holder_basis_points(holder.balance, snapshot.total_supply) {
            Ok(bps) => holders.push(HolderShare {
                address: holder.address.clone(),
                balance: holder.balance.to_string(),
                percent: format_percent(bps),
                basis_points: bps,
            }),
            Err(_) => skipped += 1,
        }
    }

    let concentration_risk = holders
        .iter()
        .any(|h| h.basis_points > policy.concentration_threshold_bps);

    let status = if skipped > 0 {
        AnalyzerStatus::PartialFailure
    } else {
        AnalyzerStatus::Ok
    };
    let mut finding = AnalyzerFinding::new(
        AnalyzerKind::Liquidity,
        status,
        match (holders.first(), concentration_risk) {
            (Some(top), true) => format!(
                "single holder controls {}% of LP {} (threshold {}%)",
                top.percent,
                snapshot.pool_address,
                format_percent(policy.concentration_threshold_bps)
            ),
            (Some(top), false) => format!(
                "largest LP holder owns {}% of {}",
                top.percent, snapshot.pool_address
            ),
            (None, _) => format!("no LP holder data for {}", snapshot.pool_address),
        },
    );
    if skipped > 0 {
        finding.error = Some(format!("{} holder(s) skipped: share out of range", skipped));
    }
    if concentration_risk {
        finding.matched_rules.push("lp_concentration");
        finding.breakdown.insert("concentrationBonus", policy.concentration_bonus);
        finding.score_contribution = policy.concentration_bonus;
    }

    LiquidityReport {
        finding,
        holders,
        concentration_risk,
    }
}

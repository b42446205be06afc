//! Check Telemetry
//!
//! Process-wide counters for completed checks. No addresses are stored.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::types::{RiskAssessment, RiskLevel};

#[derive(Debug, Default)]
pub struct CheckTelemetry {
    total: AtomicU64,
    low: AtomicU64,
    medium: AtomicU64,
    high: AtomicU64,
    degraded: AtomicU64,
    timeouts: AtomicU64,
    latency_ms_sum: AtomicU64,
}

impl CheckTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed assessment
    pub fn record(&self, assessment: &RiskAssessment, latency_ms: u64) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.latency_ms_sum.fetch_add(latency_ms, Ordering::Relaxed);
        let bucket = match assessment.risk_level() {
            RiskLevel::Low => &self.low,
            RiskLevel::Medium => &self.medium,
            RiskLevel::High => &self.high,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
        if assessment.is_degraded() {
            self.degraded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a check that hit the global deadline
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetryStats {
        let total = self.total.load(Ordering::Relaxed);
        let latency = self.latency_ms_sum.load(Ordering::Relaxed);
        TelemetryStats {
            total_checks: total,
            low_risk: self.low.load(Ordering::Relaxed),
            medium_risk: self.medium.load(Ordering::Relaxed),
            high_risk: self.high.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                latency as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

/// Aggregated statistics for `/v1/stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryStats {
    pub total_checks: u64,
    pub low_risk: u64,
    pub medium_risk: u64,
    pub high_risk: u64,
    pub degraded: u64,
    pub timeouts: u64,
    pub avg_latency_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::RiskAggregator;
    use crate::models::config::CheckerConfig;

    #[test]
    fn test_counts_by_level() {
        let telemetry = CheckTelemetry::new();
        let aggregator = RiskAggregator::new(&CheckerConfig::default());

        let low = aggregator.scan_source("0xa", 56, "contract A {}");
        let medium = aggregator.scan_source(
            "0xb",
            56,
            "tx.origin == x; mint(a); bots[a]",
        );
        telemetry.record(&low, 100);
        telemetry.record(&medium, 300);
        telemetry.record_timeout();

        let stats = telemetry.snapshot();
        assert_eq!(stats.total_checks, 2);
        assert_eq!(stats.low_risk, 1);
        assert_eq!(stats.medium_risk, 1);
        assert_eq!(stats.high_risk, 0);
        assert_eq!(stats.degraded, 2);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.avg_latency_ms, 200.0);
    }
}

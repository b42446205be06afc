//! In-Memory Assessment Cache
//!
//! Thread-safe TTL cache of completed risk assessments keyed by
//! `chain:address` (lowercase). DashMap gives concurrent access without a
//! global lock. Degraded assessments are never stored.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::models::types::{ContractTarget, RiskAssessment};
use crate::utils::constants::DEFAULT_CACHE_TTL_SECS;

/// Cache entry with its creation time
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub assessment: Arc<RiskAssessment>,
    pub created_at: Instant,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > Duration::from_secs(self.ttl_secs)
    }

    pub fn remaining_ttl(&self) -> u64 {
        self.ttl_secs.saturating_sub(self.created_at.elapsed().as_secs())
    }
}

#[derive(Clone)]
pub struct AssessmentCache {
    store: Arc<DashMap<String, CacheEntry>>,
    ttl_secs: u64,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl Default for AssessmentCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL_SECS)
    }
}

impl AssessmentCache {
    pub fn with_ttl(ttl_secs: u64) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl_secs,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached assessment if present and not expired
    pub fn get(&self, target: &ContractTarget) -> Option<Arc<RiskAssessment>> {
        let key = target.cache_key();

        if let Some(entry) = self.store.get(&key) {
            if entry.is_expired() {
                drop(entry); // release the shard read lock before removing
                self.store.remove(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS (expired): {}", key);
                None
            } else {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("✅ CACHE HIT: {} (TTL: {}s remaining)", key, entry.remaining_ttl());
                Some(Arc::clone(&entry.assessment))
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("📭 CACHE MISS: {}", key);
            None
        }
    }

    /// Store a complete assessment. Degraded ones are skipped so a
    /// recovering collaborator is retried on the next request.
    pub fn set(&self, target: &ContractTarget, assessment: Arc<RiskAssessment>) -> bool {
        if assessment.is_degraded() || self.ttl_secs == 0 {
            return false;
        }
        let key = target.cache_key();
        self.store.insert(
            key.clone(),
            CacheEntry {
                assessment,
                created_at: Instant::now(),
                ttl_secs: self.ttl_secs,
            },
        );
        debug!("💾 CACHE SET: {} (TTL: {}s)", key, self.ttl_secs);
        true
    }

    /// Remove expired entries, returning how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.store.len());
        if removed > 0 {
            info!("🧹 CACHE CLEANUP: {} expired entries removed", removed);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

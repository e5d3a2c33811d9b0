//! Cache statistics, tracked the way the teacher's tiered cache does:
//! plain atomics updated on the hot path, collapsed into an immutable
//! snapshot on demand.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic run-wide cache counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    restores: AtomicU64,
    restore_hits: AtomicU64,
    restore_misses: AtomicU64,
    pushes: AtomicU64,
    push_failures: AtomicU64,
    bytes_restored: AtomicU64,
    bytes_pushed: AtomicU64,
}

impl CacheStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_restore_hit(&self, bytes: u64) {
        self.restores.fetch_add(1, Ordering::Relaxed);
        self.restore_hits.fetch_add(1, Ordering::Relaxed);
        self.bytes_restored.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_restore_miss(&self) {
        self.restores.fetch_add(1, Ordering::Relaxed);
        self.restore_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_push(&self, bytes: u64) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
        self.bytes_pushed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_push_failure(&self) {
        self.push_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let restores = self.restores.load(Ordering::Relaxed);
        let restore_hits = self.restore_hits.load(Ordering::Relaxed);
        let hit_rate = if restores > 0 { restore_hits as f64 / restores as f64 } else { 0.0 };
        CacheStatsSnapshot {
            restores,
            restore_hits,
            restore_misses: self.restore_misses.load(Ordering::Relaxed),
            pushes: self.pushes.load(Ordering::Relaxed),
            push_failures: self.push_failures.load(Ordering::Relaxed),
            bytes_restored: self.bytes_restored.load(Ordering::Relaxed),
            bytes_pushed: self.bytes_pushed.load(Ordering::Relaxed),
            hit_rate,
        }
    }
}

/// A point-in-time copy of [`CacheStats`], safe to hand to a reporter
/// without holding any lock.
#[derive(Debug, Clone, Copy)]
pub struct CacheStatsSnapshot {
    pub restores: u64,
    pub restore_hits: u64,
    pub restore_misses: u64,
    pub pushes: u64,
    pub push_failures: u64,
    pub bytes_restored: u64,
    pub bytes_pushed: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_reflects_recorded_outcomes() {
        let stats = CacheStats::new();
        stats.record_restore_hit(100);
        stats.record_restore_hit(50);
        stats.record_restore_miss();

        let snap = stats.snapshot();
        assert_eq!(snap.restores, 3);
        assert!((snap.hit_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(snap.bytes_restored, 150);
    }
}

//! Deployment statistics with atomic counters.
//!
//! This module provides [`DeployStats`] for counting what the registry did
//! with change events and [`DeployStatsSnapshot`] for point-in-time views.
//!
//! # Thread Safety
//!
//! All counters use [`AtomicU64`] with [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. Statistics are informational and don't require strict ordering.
//!
//! # Examples
//!
//! ```
//! use spd_deploy::DeployStats;
//!
//! let stats = DeployStats::new();
//! stats.increment_substituted();
//! stats.increment_copied();
//!
//! let snapshot = stats.snapshot();
//! println!("Deployed {} files", snapshot.deployed());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for deployment statistics.
#[derive(Debug, Default)]
pub struct DeployStats {
    /// Files written with content tokens applied.
    substituted: AtomicU64,
    /// Files copied byte for byte.
    copied: AtomicU64,
    /// Deployments that failed.
    failed: AtomicU64,
    /// Watches removed because the file is no longer deployable.
    pruned: AtomicU64,
    /// Change events for files no open project contains.
    ignored: AtomicU64,
    /// Subscriptions the notifier refused.
    rejected: AtomicU64,
}

impl DeployStats {
    /// Creates a new [`DeployStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the substituted files counter.
    #[inline]
    pub fn increment_substituted(&self) {
        self.substituted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the copied files counter.
    #[inline]
    pub fn increment_copied(&self) {
        self.copied.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the failed deployments counter.
    #[inline]
    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the pruned watches counter.
    #[inline]
    pub fn increment_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the ignored events counter.
    #[inline]
    pub fn increment_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the rejected subscriptions counter.
    #[inline]
    pub fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all statistics.
    ///
    /// # Examples
    ///
    /// ```
    /// use spd_deploy::DeployStats;
    ///
    /// let stats = DeployStats::new();
    /// stats.increment_copied();
    /// stats.increment_failed();
    ///
    /// let snap = stats.snapshot();
    /// assert_eq!(snap.copied, 1);
    /// assert_eq!(snap.failed, 1);
    /// ```
    #[must_use]
    pub fn snapshot(&self) -> DeployStatsSnapshot {
        DeployStatsSnapshot {
            substituted: self.substituted.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.substituted.store(0, Ordering::Relaxed);
        self.copied.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.pruned.store(0, Ordering::Relaxed);
        self.ignored.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of deployment statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeployStatsSnapshot {
    /// Files written with content tokens applied.
    pub substituted: u64,
    /// Files copied byte for byte.
    pub copied: u64,
    /// Deployments that failed.
    pub failed: u64,
    /// Watches removed because the file is no longer deployable.
    pub pruned: u64,
    /// Change events for files no open project contains.
    pub ignored: u64,
    /// Subscriptions the notifier refused.
    pub rejected: u64,
}

impl DeployStatsSnapshot {
    /// Returns the number of successful deployments.
    #[inline]
    #[must_use]
    pub const fn deployed(&self) -> u64 {
        self.substituted + self.copied
    }

    /// Returns the success rate of attempted deployments as a percentage.
    ///
    /// Returns 100.0 if nothing was attempted.
    ///
    /// # Examples
    ///
    /// ```
    /// use spd_deploy::DeployStatsSnapshot;
    ///
    /// let snap = DeployStatsSnapshot {
    ///     substituted: 10,
    ///     copied: 85,
    ///     failed: 5,
    ///     ..Default::default()
    /// };
    ///
    /// assert!((snap.success_rate() - 95.0).abs() < 0.1);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
    pub fn success_rate(&self) -> f64 {
        let attempted = self.deployed() + self.failed;
        if attempted == 0 {
            return 100.0;
        }

        (self.deployed() as f64 / attempted as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_stats_new() {
        let snap = DeployStats::new().snapshot();
        assert_eq!(snap, DeployStatsSnapshot::default());
    }

    #[test]
    fn test_deploy_stats_increment() {
        let stats = DeployStats::new();

        stats.increment_substituted();
        stats.increment_copied();
        stats.increment_copied();
        stats.increment_failed();
        stats.increment_pruned();
        stats.increment_ignored();
        stats.increment_rejected();

        let snap = stats.snapshot();
        assert_eq!(snap.substituted, 1);
        assert_eq!(snap.copied, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.pruned, 1);
        assert_eq!(snap.ignored, 1);
        assert_eq!(snap.rejected, 1);
        assert_eq!(snap.deployed(), 3);
    }

    #[test]
    fn test_deploy_stats_reset() {
        let stats = DeployStats::new();
        stats.increment_copied();
        stats.increment_failed();

        stats.reset();

        assert_eq!(stats.snapshot(), DeployStatsSnapshot::default());
    }

    #[test]
    fn test_snapshot_success_rate() {
        let snap = DeployStatsSnapshot::default();
        assert!((snap.success_rate() - 100.0).abs() < f64::EPSILON);

        let snap = DeployStatsSnapshot {
            copied: 3,
            failed: 1,
            ..Default::default()
        };
        assert!((snap.success_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snap = DeployStatsSnapshot {
            substituted: 4,
            copied: 9,
            failed: 1,
            pruned: 2,
            ignored: 0,
            rejected: 0,
        };

        let json = serde_json::to_string(&snap).expect("Serialization failed");
        let parsed: DeployStatsSnapshot =
            serde_json::from_str(&json).expect("Deserialization failed");
        assert_eq!(snap, parsed);
    }
}

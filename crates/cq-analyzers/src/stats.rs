//! Analysis statistics with atomic counters.
//!
//! [`AnalysisStats`] is updated from rayon worker threads while files are
//! loaded and detectors report; [`StatsSnapshot`] is the copyable view that
//! ends up in the [`AnalysisReport`](crate::AnalysisReport).
//!
//! All counters use [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. They are informational and need no cross-counter consistency.
//!
//! # Examples
//!
//! ```
//! use cq_analyzers::{AnalysisStats, DetectorKind};
//!
//! let stats = AnalysisStats::new();
//! stats.increment_files_read();
//! stats.add_findings(DetectorKind::Secrets, 2);
//!
//! let snap = stats.snapshot();
//! assert_eq!(snap.files_read, 1);
//! assert_eq!(snap.secrets, 2);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::detector::DetectorKind;

/// Atomic counters for one analysis run.
#[derive(Debug, Default)]
pub struct AnalysisStats {
    files_read: AtomicU64,
    read_errors: AtomicU64,
    clones: AtomicU64,
    secrets: AtomicU64,
    rule_violations: AtomicU64,
    unused_imports: AtomicU64,
    test_suggestions: AtomicU64,
}

impl AnalysisStats {
    /// Creates a new [`AnalysisStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the files-read counter.
    #[inline]
    pub fn increment_files_read(&self) {
        self.files_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the read-error counter.
    #[inline]
    pub fn increment_read_errors(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `count` findings for `kind`.
    pub fn add_findings(&self, kind: DetectorKind, count: usize) {
        let counter = match kind {
            DetectorKind::Clones => &self.clones,
            DetectorKind::Secrets => &self.secrets,
            DetectorKind::Rules => &self.rule_violations,
            DetectorKind::UnusedImports => &self.unused_imports,
            DetectorKind::Coverage => &self.test_suggestions,
        };
        counter.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            files_read: self.files_read.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            clones: self.clones.load(Ordering::Relaxed),
            secrets: self.secrets.load(Ordering::Relaxed),
            rule_violations: self.rule_violations.load(Ordering::Relaxed),
            unused_imports: self.unused_imports.load(Ordering::Relaxed),
            test_suggestions: self.test_suggestions.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`AnalysisStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Files successfully read.
    pub files_read: u64,
    /// Files skipped because they could not be read.
    pub read_errors: u64,
    /// Clone findings.
    pub clones: u64,
    /// Secret findings.
    pub secrets: u64,
    /// Rule-violation findings.
    pub rule_violations: u64,
    /// Unused-import findings.
    pub unused_imports: u64,
    /// Missing-test suggestions.
    pub test_suggestions: u64,
}

impl StatsSnapshot {
    /// Total findings across all detectors, before suppression.
    #[inline]
    #[must_use]
    pub const fn total_findings(&self) -> u64 {
        self.clones + self.secrets + self.rule_violations + self.unused_imports + self.test_suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let stats = AnalysisStats::new();
        stats.increment_files_read();
        stats.increment_files_read();
        stats.increment_read_errors();
        stats.add_findings(DetectorKind::Clones, 3);
        stats.add_findings(DetectorKind::UnusedImports, 1);
        stats.add_findings(DetectorKind::Coverage, 1);

        let snap = stats.snapshot();
        assert_eq!(snap.files_read, 2);
        assert_eq!(snap.read_errors, 1);
        assert_eq!(snap.clones, 3);
        assert_eq!(snap.secrets, 0);
        assert_eq!(snap.total_findings(), 5);
    }

    #[test]
    fn test_parallel_increments() {
        use rayon::prelude::*;

        let stats = AnalysisStats::new();
        (0..1000).into_par_iter().for_each(|_| stats.increment_files_read());
        assert_eq!(stats.snapshot().files_read, 1000);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snap = StatsSnapshot {
            files_read: 4,
            secrets: 1,
            ..StatsSnapshot::default()
        };
        insta::assert_json_snapshot!(snap, @r#"
        {
          "files_read": 4,
          "read_errors": 0,
          "clones": 0,
          "secrets": 1,
          "rule_violations": 0,
          "unused_imports": 0,
          "test_suggestions": 0
        }
        "#);
    }
}

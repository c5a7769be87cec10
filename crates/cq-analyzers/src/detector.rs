//! The detector seam.
//!
//! Every analyzer implements [`Detector`]. A detector reads the shared
//! [`DetectionContext`], never mutates shared state, and returns its own
//! [`DetectorOutput`]. The pipeline merges outputs afterwards and records
//! any `Err` as a degraded detector for the run.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use cq_core::{AnalysisConfig, Criticism, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;
use crate::source::SourceFile;

/// Identifies a detector in stats, logs and degraded reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    /// Duplicated code blocks.
    Clones,
    /// Hardcoded credentials.
    Secrets,
    /// Legacy libraries and project-rule violations.
    Rules,
    /// Imported identifiers that are never used.
    UnusedImports,
    /// New source files without tests.
    Coverage,
}

impl DetectorKind {
    /// Returns the kebab-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clones => "clones",
            Self::Secrets => "secrets",
            Self::Rules => "rules",
            Self::UnusedImports => "unused-imports",
            Self::Coverage => "coverage",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a detector may look at during one run.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    /// Absolute project root.
    pub root: &'a Utf8Path,

    /// Every analyzable file in the project.
    pub project: &'a [SourceFile],

    /// Files changed in this run, or `None` for a full analysis.
    pub changed: Option<&'a FxHashSet<Utf8PathBuf>>,

    /// Detector settings.
    pub config: &'a AnalysisConfig,
}

impl<'a> DetectionContext<'a> {
    /// Creates a context for a full-project run.
    #[must_use]
    pub const fn full(root: &'a Utf8Path, project: &'a [SourceFile], config: &'a AnalysisConfig) -> Self {
        Self {
            root,
            project,
            changed: None,
            config,
        }
    }

    /// Returns `true` if `path` is in scope for per-file detectors.
    #[must_use]
    pub fn in_scope(&self, path: &Utf8Path) -> bool {
        self.changed.is_none_or(|changed| changed.contains(path))
    }

    /// Returns the files per-file detectors should examine.
    pub fn targets(&self) -> impl Iterator<Item = &'a SourceFile> + '_ {
        self.project.iter().filter(|file| self.in_scope(&file.path))
    }
}

/// Per-detector counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorStats {
    /// Files the detector examined.
    pub files_examined: usize,
    /// Findings produced, before suppression.
    pub findings: usize,
}

/// What one detector produced.
#[derive(Debug, Clone, Default)]
pub struct DetectorOutput {
    /// Proposed criticisms, not yet filtered or stored.
    pub criticisms: Vec<Criticism>,
    /// Counters for this run.
    pub stats: DetectorStats,
}

impl DetectorOutput {
    /// Builds an output, deriving `findings` from the criticisms.
    #[must_use]
    pub fn new(criticisms: Vec<Criticism>, files_examined: usize) -> Self {
        let findings = criticisms.len();
        Self {
            criticisms,
            stats: DetectorStats {
                files_examined,
                findings,
            },
        }
    }
}

/// A pluggable analyzer.
///
/// Detectors must be [`Send`] and [`Sync`] because the pipeline runs them
/// in parallel on rayon's pool.
pub trait Detector: Send + Sync {
    /// Which detector this is.
    fn kind(&self) -> DetectorKind;

    /// Examines the project and proposes criticisms.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector cannot run at all; the pipeline
    /// reports it as degraded and continues with the other detectors.
    fn run(&self, ctx: &DetectionContext<'_>) -> Result<DetectorOutput, AnalyzerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_respect_changed_set() {
        let files = vec![SourceFile::new("a.ts", ""), SourceFile::new("b.ts", "")];
        let config = AnalysisConfig::default();
        let root = Utf8Path::new("/p");

        let full = DetectionContext::full(root, &files, &config);
        assert_eq!(full.targets().count(), 2);

        let mut changed = FxHashSet::default();
        changed.insert(Utf8PathBuf::from("b.ts"));
        let incremental = DetectionContext {
            changed: Some(&changed),
            ..full
        };
        let targets: Vec<_> = incremental.targets().map(SourceFile::path_str).collect();
        assert_eq!(targets, vec!["b.ts"]);
    }

    #[test]
    fn test_output_counts_findings() {
        let output = DetectorOutput::new(Vec::new(), 7);
        assert_eq!(output.stats.files_examined, 7);
        assert_eq!(output.stats.findings, 0);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(DetectorKind::UnusedImports.to_string(), "unused-imports");
        assert_eq!(
            serde_json::to_string(&DetectorKind::Clones).unwrap(),
            r#""clones""#
        );
    }
}

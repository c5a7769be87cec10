//! Text-based detectors and the analysis pipeline for critique.
//!
//! This crate turns a project tree into criticisms. It walks the project,
//! reads every analyzable file once, runs the detectors in parallel, and
//! persists what survives the preference filter.
//!
//! # Overview
//!
//! The main entry point is [`Analyzer`], which combines:
//!
//! - [`FileWalker`]: Directory traversal respecting `.gitignore` patterns
//! - [`load_sources`]: Parallel file loading with rayon
//! - [`Detector`]s: [`CloneDetector`], [`SecretScanner`], [`RuleChecker`],
//!   [`UnusedImportDetector`] and, for newly added files, [`CoverageDetector`]
//! - [`CriticismStore`] and [`PreferenceLog`] from `cq-store`
//! - [`AnalysisStats`]: Atomic statistics for the run
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use cq_core::Config;
//!
//! # fn example() -> Result<(), cq_analyzers::AnalyzerError> {
//! let root = Utf8Path::new(".");
//! let report = cq_analyzers::analyze_project(root, &Config::default())?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Analyzer (main entry point)
//!     │
//!     ├── FileWalker (collect paths)
//!     │       │
//!     │       └── WalkBuilder (ignore crate)
//!     │
//!     ├── load_sources (rayon, read once)
//!     │
//!     ├── Detectors (rayon, no shared mutable state)
//!     │
//!     ├── dedupe by id ─► PreferenceLog::was_rejected ─► CriticismStore
//!     │
//!     └── AnalysisStats (atomic counters)
//! ```
//!
//! # Failure model
//!
//! A detector that fails is recorded in [`AnalysisReport::degraded`] and
//! contributes nothing; the others still run. Only a missing project root
//! or a failed store write aborts a run.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod clones;
pub mod coverage;
pub mod detector;
mod error;
pub mod imports;
pub mod rules;
pub mod secrets;
mod source;
mod stats;
mod walker;

pub use clones::CloneDetector;
pub use coverage::CoverageDetector;
pub use detector::{DetectionContext, Detector, DetectorKind, DetectorOutput, DetectorStats};
pub use error::AnalyzerError;
pub use imports::UnusedImportDetector;
pub use rules::{MinedRule, RuleChecker, RuleKind, RuleSet};
pub use secrets::SecretScanner;
pub use source::{SourceFile, load_sources};
pub use stats::{AnalysisStats, StatsSnapshot};
pub use walker::{FileWalker, is_analyzable};

use std::fmt::{self, Write as _};

use camino::{Utf8Path, Utf8PathBuf};
use cq_core::{AnalysisConfig, Config, Criticism, FxHashSet};
use cq_store::{CriticismStore, PreferenceLog};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// A detector that failed during a run.
#[derive(Debug)]
pub struct DegradedDetector {
    /// Which detector failed.
    pub kind: DetectorKind,
    /// Why it failed.
    pub error: AnalyzerError,
}

impl fmt::Display for DegradedDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}

/// Result of one analysis run.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// Unique findings the detectors proposed.
    pub proposed: usize,
    /// Findings dropped because the user rejected the same pattern before.
    pub suppressed: usize,
    /// Findings whose id was new to the store.
    pub stored: usize,
    /// Detectors that failed and contributed nothing.
    pub degraded: Vec<DegradedDetector>,
    /// Counters for the run.
    pub stats: StatsSnapshot,
}

impl AnalysisReport {
    /// Returns `true` if every detector ran.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.degraded.is_empty()
    }

    /// One-line human summary.
    ///
    /// # Examples
    ///
    /// ```
    /// use cq_analyzers::AnalysisReport;
    ///
    /// let report = AnalysisReport { proposed: 3, suppressed: 1, stored: 2, ..Default::default() };
    /// assert_eq!(report.summary(), "0 files analyzed, 3 findings (2 new, 1 suppressed)");
    /// ```
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} files analyzed, {} findings ({} new, {} suppressed)",
            self.stats.files_read, self.proposed, self.stored, self.suppressed
        );
        match self.degraded.len() {
            0 => {}
            1 => line.push_str(", 1 analyzer degraded"),
            n => {
                let _ = write!(line, ", {n} analyzers degraded");
            }
        }
        line
    }
}

/// Runs the detectors over a project and maintains its worklist.
///
/// # Examples
///
/// ```no_run
/// use camino::{Utf8Path, Utf8PathBuf};
/// use cq_analyzers::Analyzer;
/// use cq_core::Config;
///
/// # fn example() -> Result<(), cq_analyzers::AnalyzerError> {
/// let analyzer = Analyzer::new(Utf8Path::new("."), &Config::default())?;
/// analyzer.analyze_project()?;
/// analyzer.analyze_changed_files(&[Utf8PathBuf::from("src/app.ts")])?;
/// for criticism in analyzer.store().pending() {
///     println!("{} {}", criticism.id, criticism.subject);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Analyzer {
    /// Absolute project root.
    root: Utf8PathBuf,
    /// Detector settings.
    config: AnalysisConfig,
    /// The persisted worklist.
    store: CriticismStore,
    /// The persisted review decisions.
    preferences: PreferenceLog,
    /// Detectors run on every analysis.
    detectors: Vec<Box<dyn Detector>>,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("root", &self.root)
            .field("store", &self.store)
            .field(
                "detectors",
                &self.detectors.iter().map(|d| d.kind()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    /// Creates an analyzer for the project at `root` with the default
    /// detector set.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::RootNotFound`] if `root` is not a directory.
    pub fn new(root: &Utf8Path, config: &Config) -> Result<Self, AnalyzerError> {
        if !root.is_dir() {
            return Err(AnalyzerError::RootNotFound(root.to_owned()));
        }
        let (store, preferences) = cq_store::open_state(root, &config.state);
        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(CloneDetector::new()),
            Box::new(SecretScanner::new()),
            Box::new(RuleChecker::new()),
            Box::new(UnusedImportDetector::new()),
        ];

        Ok(Self {
            root: root.to_owned(),
            config: config.analysis.clone(),
            store,
            preferences,
            detectors,
        })
    }

    /// Adds a detector to the set run on every analysis.
    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The criticism store this analyzer writes to.
    #[must_use]
    pub const fn store(&self) -> &CriticismStore {
        &self.store
    }

    /// The preference log this analyzer filters against.
    #[must_use]
    pub const fn preferences(&self) -> &PreferenceLog {
        &self.preferences
    }

    /// Analyzes every file in the project.
    pub fn analyze_project(&self) -> Result<AnalysisReport, AnalyzerError> {
        info!(root = %self.root, "Analyzing project");
        let detectors: Vec<&dyn Detector> = self.detectors.iter().map(AsRef::as_ref).collect();
        let report = self.run(None, &detectors)?;
        self.store.record_analysis()?;
        Ok(report)
    }

    /// Analyzes the given files.
    ///
    /// Per-file detectors only look at `files`. Clone detection still sees
    /// the whole project but only reports duplicates that involve one of
    /// `files`. Paths may be absolute (under the root) or project-relative.
    pub fn analyze_changed_files(&self, files: &[Utf8PathBuf]) -> Result<AnalysisReport, AnalyzerError> {
        let changed = self.relative_set(files);
        if changed.is_empty() {
            debug!("No changed files to analyze");
            return Ok(AnalysisReport::default());
        }
        info!(files = changed.len(), "Analyzing changed files");
        let detectors: Vec<&dyn Detector> = self.detectors.iter().map(AsRef::as_ref).collect();
        let report = self.run(Some(&changed), &detectors)?;
        self.store.record_analysis()?;
        Ok(report)
    }

    /// Proposes `TEST` criticisms for newly added files that have no tests.
    pub fn suggest_tests(&self, files: &[Utf8PathBuf]) -> Result<AnalysisReport, AnalyzerError> {
        let changed = self.relative_set(files);
        if changed.is_empty() {
            return Ok(AnalysisReport::default());
        }
        let coverage = CoverageDetector::new();
        let ctx = DetectionContext {
            root: &self.root,
            project: &[],
            changed: Some(&changed),
            config: &self.config,
        };
        let stats = AnalysisStats::new();
        let outputs = vec![(coverage.kind(), coverage.run(&ctx))];
        self.commit(outputs, &stats)
    }

    /// Normalizes caller paths to project-relative ones.
    fn relative_set(&self, files: &[Utf8PathBuf]) -> FxHashSet<Utf8PathBuf> {
        files
            .iter()
            .map(|path| {
                path.strip_prefix(&self.root)
                    .map_or_else(|_| path.clone(), Utf8Path::to_path_buf)
            })
            .collect()
    }

    /// Walks, loads, detects and commits.
    fn run(
        &self,
        changed: Option<&FxHashSet<Utf8PathBuf>>,
        detectors: &[&dyn Detector],
    ) -> Result<AnalysisReport, AnalyzerError> {
        let paths = FileWalker::new(&self.root)?
            .with_skip_dirs(&self.config.skip_dirs)
            .collect_paths();
        debug!(count = paths.len(), "Discovered analyzable files");

        let stats = AnalysisStats::new();
        let project = load_sources(&self.root, &paths, &stats);

        let ctx = DetectionContext {
            root: &self.root,
            project: &project,
            changed,
            config: &self.config,
        };
        let outputs: Vec<_> = detectors
            .par_iter()
            .map(|detector| (detector.kind(), detector.run(&ctx)))
            .collect();

        self.commit(outputs, &stats)
    }

    /// Merges detector outputs, filters them, and upserts the survivors.
    fn commit(
        &self,
        outputs: Vec<(DetectorKind, Result<DetectorOutput, AnalyzerError>)>,
        stats: &AnalysisStats,
    ) -> Result<AnalysisReport, AnalyzerError> {
        let mut report = AnalysisReport::default();
        let mut seen = FxHashSet::default();
        let mut proposed: Vec<Criticism> = Vec::new();

        for (kind, result) in outputs {
            match result {
                Ok(output) => {
                    stats.add_findings(kind, output.stats.findings);
                    debug!(
                        detector = %kind,
                        files = output.stats.files_examined,
                        findings = output.stats.findings,
                        "Detector finished"
                    );
                    proposed.extend(
                        output
                            .criticisms
                            .into_iter()
                            .filter(|c| seen.insert(c.id.clone())),
                    );
                }
                Err(error) => {
                    warn!(detector = %kind, error = %error, "Detector degraded");
                    report.degraded.push(DegradedDetector { kind, error });
                }
            }
        }

        report.proposed = proposed.len();
        let kept: Vec<Criticism> = proposed
            .into_iter()
            .filter(|c| {
                let rejected = self.preferences.was_rejected(c.category, &c.subject);
                if rejected {
                    debug!(category = %c.category, subject = %c.subject, "Suppressed by preference");
                }
                !rejected
            })
            .collect();
        report.suppressed = report.proposed - kept.len();
        report.stored = self.store.add_criticisms(kept)?;
        report.stats = stats.snapshot();

        info!(
            proposed = report.proposed,
            suppressed = report.suppressed,
            stored = report.stored,
            degraded = report.degraded.len(),
            "Analysis complete"
        );
        Ok(report)
    }
}

/// Analyzes the whole project at `root`.
///
/// Convenience wrapper around [`Analyzer::analyze_project`].
pub fn analyze_project(root: &Utf8Path, config: &Config) -> Result<AnalysisReport, AnalyzerError> {
    Analyzer::new(root, config)?.analyze_project()
}

/// Analyzes `files` within the project at `root`.
///
/// Convenience wrapper around [`Analyzer::analyze_changed_files`].
pub fn analyze_changed_files(
    root: &Utf8Path,
    files: &[Utf8PathBuf],
    config: &Config,
) -> Result<AnalysisReport, AnalyzerError> {
    Analyzer::new(root, config)?.analyze_changed_files(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use cq_core::{Category, Decision, PreferenceEntry, Severity};
    use tempfile::TempDir;

    use super::*;

    const BLOCK_LINE: &str = "function sum(xs){return xs.reduce((a,b)=>a+b,0);}";

    fn project() -> (TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        (dir, root)
    }

    fn write(root: &Utf8Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Always fails, to exercise degraded reporting.
    struct BrokenDetector;

    impl Detector for BrokenDetector {
        fn kind(&self) -> DetectorKind {
            DetectorKind::Rules
        }

        fn run(&self, _ctx: &DetectionContext<'_>) -> Result<DetectorOutput, AnalyzerError> {
            let source = regex::Regex::new("(").unwrap_err();
            Err(AnalyzerError::pattern("broken", source))
        }
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let result = Analyzer::new(Utf8Path::new("/nonexistent/critique"), &Config::default());
        assert!(matches!(result, Err(AnalyzerError::RootNotFound(_))));
    }

    #[test]
    fn test_project_run_stores_and_stamps() {
        let (_dir, root) = project();
        write(&root, "src/a.ts", &vec![BLOCK_LINE; 6].join("\n"));
        write(&root, "src/b.ts", &vec![BLOCK_LINE; 6].join("\n"));

        let analyzer = Analyzer::new(&root, &Config::default()).unwrap();
        let report = analyzer.analyze_project().unwrap();

        assert_eq!(report.stats.files_read, 2);
        assert_eq!(report.stats.clones, 1);
        assert_eq!(report.stored, 1);
        assert!(report.is_complete());
        assert!(analyzer.store().last_analysis().is_some());

        // A second run finds the same id and stores nothing new.
        let again = analyzer.analyze_project().unwrap();
        assert_eq!(again.proposed, 1);
        assert_eq!(again.stored, 0);
        assert_eq!(analyzer.store().all().len(), 1);
    }

    #[test]
    fn test_rejected_pattern_is_suppressed() {
        let (_dir, root) = project();
        write(&root, "src/a.ts", &vec![BLOCK_LINE; 6].join("\n"));
        write(&root, "src/b.ts", &vec![BLOCK_LINE; 6].join("\n"));

        let analyzer = Analyzer::new(&root, &Config::default()).unwrap();
        analyzer
            .preferences()
            .log_decision(&PreferenceEntry {
                date: chrono_date(),
                category: Category::Simplify,
                subject: "duplicated code block (6+ lines)".to_owned(),
                location: "src/a.ts:1".to_owned(),
                reasoning: None,
                decision: Decision::Rejected,
            })
            .unwrap();

        let report = analyzer.analyze_project().unwrap();
        assert_eq!(report.proposed, 1);
        assert_eq!(report.suppressed, 1);
        assert!(analyzer.store().pending().is_empty());
    }

    #[test]
    fn test_degraded_detector_does_not_stop_others() {
        let (_dir, root) = project();
        write(&root, "src/a.ts", "import { unused } from './x';\n");

        let analyzer = Analyzer::new(&root, &Config::default())
            .unwrap()
            .with_detector(Box::new(BrokenDetector));
        let report = analyzer.analyze_project().unwrap();

        assert_eq!(report.degraded.len(), 1);
        assert_eq!(report.stats.unused_imports, 1);
        assert_eq!(report.stored, 1);
        assert!(report.summary().ends_with("1 analyzer degraded"));
    }

    #[test]
    fn test_changed_files_limit_per_file_detectors() {
        let (_dir, root) = project();
        write(&root, "src/a.ts", "import { one } from './one';\n");
        write(&root, "src/b.ts", "import { two } from './two';\n");

        let analyzer = Analyzer::new(&root, &Config::default()).unwrap();
        let report = analyzer
            .analyze_changed_files(&[root.join("src/b.ts")])
            .unwrap();

        assert_eq!(report.stored, 1);
        let pending = analyzer.store().pending();
        assert_eq!(pending[0].files[0], "src/b.ts");
        assert_eq!(pending[0].severity, Severity::Low);
    }

    #[test]
    fn test_suggest_tests_for_new_file() {
        let (_dir, root) = project();
        write(&root, "src/new.ts", "export const x = 1;\n");
        write(&root, "src/old.ts", "export const y = 1;\n");
        write(&root, "src/old.test.ts", "");

        let analyzer = Analyzer::new(&root, &Config::default()).unwrap();
        let report = analyzer
            .suggest_tests(&[Utf8PathBuf::from("src/new.ts"), Utf8PathBuf::from("src/old.ts")])
            .unwrap();

        assert_eq!(report.stored, 1);
        assert_eq!(report.stats.test_suggestions, 1);
        let tests = analyzer.store().by_category(Category::Test);
        assert_eq!(tests[0].subject, "add tests for src/new.ts");
    }

    fn chrono_date() -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }
}

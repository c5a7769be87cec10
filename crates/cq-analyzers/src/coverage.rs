//! Missing-test suggestions for newly added source files.
//!
//! A source file counts as covered when a sibling `<stem>.test.<ext>`,
//! `<stem>.spec.<ext>` or `__tests__/<stem>.test.<ext>` exists. Only files
//! the caller names are checked; this detector is driven by the watcher's
//! "file added" classification rather than by full scans.

use camino::{Utf8Path, Utf8PathBuf};
use cq_core::{Category, Criticism, Severity};

use crate::detector::{DetectionContext, Detector, DetectorKind, DetectorOutput};
use crate::error::AnalyzerError;

/// Returns the conventional test locations for `path`, most common first.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use cq_analyzers::coverage::test_candidates;
///
/// let candidates = test_candidates(Utf8Path::new("src/user.ts"));
/// assert_eq!(candidates[0], "src/user.test.ts");
/// assert_eq!(candidates[2], "src/__tests__/user.test.ts");
/// ```
#[must_use]
pub fn test_candidates(path: &Utf8Path) -> Vec<Utf8PathBuf> {
    let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) else {
        return Vec::new();
    };
    let dir = path.parent().unwrap_or_else(|| Utf8Path::new(""));
    vec![
        dir.join(format!("{stem}.test.{ext}")),
        dir.join(format!("{stem}.spec.{ext}")),
        dir.join("__tests__").join(format!("{stem}.test.{ext}")),
    ]
}

/// Returns `true` if `path` is a file that should have tests.
#[must_use]
pub fn needs_tests(path: &Utf8Path) -> bool {
    let is_source = path
        .extension()
        .is_some_and(cq_core::config::is_source_extension);
    let name = path.file_name().unwrap_or_default();
    is_source && !cq_core::config::is_test_path(path) && !name.ends_with(".d.ts")
}

/// Proposes a `TEST` criticism for `path` unless a test already exists
/// under `root`.
#[must_use]
pub fn suggest_test(root: &Utf8Path, path: &Utf8Path) -> Option<Criticism> {
    if !needs_tests(path) {
        return None;
    }
    let candidates = test_candidates(path);
    if candidates.iter().any(|candidate| root.join(candidate).is_file()) {
        return None;
    }

    let expected = candidates.first()?;
    Some(
        Criticism::new(
            Category::Test,
            format!("add tests for {path}"),
            format!("{path} was added without tests. Consider adding {expected}."),
            [path],
            Severity::Low,
        )
        .with_location(path),
    )
}

/// Suggests tests for the changed files of an incremental run.
///
/// Full runs examine nothing; suggesting tests for every existing file
/// would flood the worklist.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageDetector;

impl CoverageDetector {
    /// Creates the detector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Detector for CoverageDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Coverage
    }

    fn run(&self, ctx: &DetectionContext<'_>) -> Result<DetectorOutput, AnalyzerError> {
        let Some(changed) = ctx.changed else {
            return Ok(DetectorOutput::default());
        };

        let mut paths: Vec<&Utf8PathBuf> = changed.iter().collect();
        paths.sort();
        let criticisms: Vec<Criticism> = paths
            .iter()
            .filter_map(|path| suggest_test(ctx.root, path))
            .collect();
        Ok(DetectorOutput::new(criticisms, paths.len()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use cq_core::{AnalysisConfig, FxHashSet};

    use super::*;

    #[test]
    fn test_needs_tests() {
        assert!(needs_tests(Utf8Path::new("src/user.ts")));
        assert!(!needs_tests(Utf8Path::new("src/user.test.ts")));
        assert!(!needs_tests(Utf8Path::new("src/types.d.ts")));
        assert!(!needs_tests(Utf8Path::new("README.md")));
    }

    #[test]
    fn test_suggests_when_no_test_exists() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let c = suggest_test(root, Utf8Path::new("src/user.ts")).unwrap();
        assert_eq!(c.category, Category::Test);
        assert_eq!(c.subject, "add tests for src/user.ts");
        assert!(c.description.contains("src/user.test.ts"));
    }

    #[test]
    fn test_existing_test_suppresses_suggestion() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::create_dir_all(root.join("src/__tests__")).unwrap();
        fs::write(root.join("src/__tests__/user.test.ts"), "").unwrap();

        assert!(suggest_test(root, Utf8Path::new("src/user.ts")).is_none());
    }

    #[test]
    fn test_full_runs_examine_nothing() {
        let config = AnalysisConfig::default();
        let ctx = DetectionContext::full(Utf8Path::new("/p"), &[], &config);
        let output = CoverageDetector::new().run(&ctx).unwrap();
        assert_eq!(output.stats, Default::default());

        let mut changed = FxHashSet::default();
        changed.insert(Utf8PathBuf::from("src/new.ts"));
        let ctx = DetectionContext {
            changed: Some(&changed),
            ..ctx
        };
        assert_eq!(CoverageDetector::new().run(&ctx).unwrap().criticisms.len(), 1);
    }
}

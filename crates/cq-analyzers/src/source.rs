//! In-memory project files shared by every detector.
//!
//! Files are read once per analysis run, in parallel with rayon, and handed
//! to the detectors as a shared slice. Unreadable files are skipped and
//! counted in [`AnalysisStats`].

use camino::{Utf8Path, Utf8PathBuf};
use cq_core::config::{is_source_extension, is_test_path};
use rayon::prelude::*;

use crate::error::AnalyzerError;
use crate::stats::AnalysisStats;

/// JS/TS-family extensions, the only files with ES import syntax.
const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];

/// One project file and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Project-relative path.
    pub path: Utf8PathBuf,
    /// Full UTF-8 contents.
    pub content: String,
}

impl SourceFile {
    /// Creates a file from already-loaded text.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Reads `relative` under `root`.
    pub fn read(root: &Utf8Path, relative: &Utf8Path) -> Result<Self, AnalyzerError> {
        let absolute = root.join(relative);
        let content = std::fs::read_to_string(&absolute)
            .map_err(|source| AnalyzerError::read(relative, source))?;
        Ok(Self::new(relative, content))
    }

    /// Returns `true` for source code (as opposed to config-like files).
    #[must_use]
    pub fn is_source(&self) -> bool {
        self.path.extension().is_some_and(is_source_extension)
    }

    /// Returns `true` for JS/TS-family files.
    #[must_use]
    pub fn is_script(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
    }

    /// Returns `true` if the file follows a test naming convention.
    #[must_use]
    pub fn is_test(&self) -> bool {
        is_test_path(&self.path)
    }

    /// Returns the path as a string slice.
    #[inline]
    #[must_use]
    pub fn path_str(&self) -> &str {
        self.path.as_str()
    }
}

/// Reads `paths` under `root` in parallel.
///
/// The result keeps the input order. Files that cannot be read (deleted
/// mid-run, permission denied, not UTF-8) are logged and skipped.
#[must_use]
pub fn load_sources(root: &Utf8Path, paths: &[Utf8PathBuf], stats: &AnalysisStats) -> Vec<SourceFile> {
    paths
        .par_iter()
        .filter_map(|path| match SourceFile::read(root, path) {
            Ok(file) => {
                stats.increment_files_read();
                Some(file)
            }
            Err(error) => {
                tracing::debug!(path = %path, error = %error, "Skipping unreadable file");
                stats.increment_read_errors();
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_classification_helpers() {
        let ts = SourceFile::new("src/a.ts", "");
        assert!(ts.is_source());
        assert!(ts.is_script());
        assert!(!ts.is_test());

        let py = SourceFile::new("app/main.py", "");
        assert!(py.is_source());
        assert!(!py.is_script());

        let env = SourceFile::new(".env", "");
        assert!(!env.is_source());

        assert!(SourceFile::new("src/a.test.tsx", "").is_test());
    }

    #[test]
    fn test_load_sources_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("a.ts"), "export const a = 1;").unwrap();
        fs::write(root.join("b.ts"), [0xff_u8, 0xfe, 0x00]).unwrap();

        let stats = AnalysisStats::new();
        let paths = vec![
            Utf8PathBuf::from("a.ts"),
            Utf8PathBuf::from("b.ts"),
            Utf8PathBuf::from("missing.ts"),
        ];
        let files = load_sources(root, &paths, &stats);

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path_str(), "a.ts");
        let snap = stats.snapshot();
        assert_eq!(snap.files_read, 1);
        assert_eq!(snap.read_errors, 2);
    }
}

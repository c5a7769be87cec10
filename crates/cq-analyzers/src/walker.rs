//! Directory traversal for analyzable project files.
//!
//! [`FileWalker`] uses the `ignore` crate to walk the project while
//! respecting `.gitignore`, and returns project-relative UTF-8 paths.
//!
//! Two kinds of files are collected:
//!
//! - source files (see [`cq_core::config::SOURCE_EXTENSIONS`]), which every
//!   detector reads;
//! - configuration-like text files (`.json`, `.yaml`, `.env`, ...), which
//!   only the secret scanner reads.
//!
//! Hidden files are included so that `.env` files are scanned.

use camino::{Utf8Path, Utf8PathBuf};
use cq_core::config::is_source_extension;
use ignore::WalkBuilder;

use crate::error::AnalyzerError;

/// Extensions of non-source text files that can carry credentials.
const CONFIG_EXTENSIONS: &[&str] = &[
    "json",
    "yaml",
    "yml",
    "toml",
    "ini",
    "env",
    "properties",
    "sh",
    "tf",
];

/// Returns `true` if `path` is worth reading for at least one detector.
#[must_use]
pub fn is_analyzable(path: &Utf8Path) -> bool {
    let name = path.file_name().unwrap_or_default();
    if name == ".env" || name.starts_with(".env.") {
        return true;
    }
    path.extension()
        .is_some_and(|ext| is_source_extension(ext) || CONFIG_EXTENSIONS.contains(&ext))
}

/// A file walker that discovers analyzable files in a project.
///
/// # Examples
///
/// ```no_run
/// use cq_analyzers::FileWalker;
/// use camino::Utf8Path;
///
/// # fn example() -> Result<(), cq_analyzers::AnalyzerError> {
/// let walker = FileWalker::new(Utf8Path::new("."))?
///     .with_skip_dirs(&["node_modules", "dist"]);
/// for path in walker.collect_paths() {
///     println!("{path}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileWalker {
    /// The root directory to walk.
    root: Utf8PathBuf,
    /// Directory names skipped anywhere in the tree.
    skip_dirs: Vec<String>,
    /// Whether to follow symbolic links.
    follow_links: bool,
}

impl FileWalker {
    /// Creates a walker rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::RootNotFound`] if `root` is not a directory.
    pub fn new(root: &Utf8Path) -> Result<Self, AnalyzerError> {
        if !root.is_dir() {
            return Err(AnalyzerError::RootNotFound(root.to_owned()));
        }
        Ok(Self {
            root: root.to_owned(),
            skip_dirs: Vec::new(),
            follow_links: false,
        })
    }

    /// Adds directory names to skip during traversal.
    #[must_use]
    pub fn with_skip_dirs<S: AsRef<str>>(mut self, dirs: &[S]) -> Self {
        self.skip_dirs
            .extend(dirs.iter().map(|d| d.as_ref().to_owned()));
        self
    }

    /// Configures whether to follow symbolic links.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Collects every analyzable file, relative to the root, sorted.
    ///
    /// Unreadable directories and non-UTF-8 paths are skipped with a debug
    /// log; one bad subdirectory does not abort the walk.
    #[must_use]
    pub fn collect_paths(&self) -> Vec<Utf8PathBuf> {
        let mut paths = Vec::new();

        for result in self.build_walker() {
            let entry = match result {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::debug!(error = %error, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::debug!(path = %entry.path().display(), "Skipping non-UTF-8 path");
                continue;
            };
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            if !is_analyzable(relative) || self.should_skip_path(relative) {
                continue;
            }
            paths.push(relative.to_owned());
        }

        paths.sort();
        paths
    }

    /// Builds the ignore walker with configured settings.
    fn build_walker(&self) -> ignore::Walk {
        let skip = self.skip_dirs.clone();
        WalkBuilder::new(&self.root)
            .standard_filters(true)
            // .env files are hidden but must be scanned for secrets
            .hidden(false)
            .follow_links(self.follow_links)
            .require_git(false)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| skip.iter().any(|d| d == name)))
            })
            .build()
    }

    /// Checks if any component of a path is a skipped directory.
    fn should_skip_path(&self, path: &Utf8Path) -> bool {
        path.components()
            .any(|component| self.skip_dirs.iter().any(|d| d == component.as_str()))
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

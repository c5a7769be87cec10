//! Path filtering for watch events.
//!
//! Filtering happens on the notify thread before a path is stat'ed, so
//! ignored trees such as `node_modules` never reach the seen set.
//!
//! # Examples
//!
//! ```
//! use cq_watcher::{FileFilter, ProjectFilter};
//! use camino::Utf8Path;
//!
//! let filter = ProjectFilter::default();
//!
//! assert!(filter.should_process(Utf8Path::new("src/app.ts")));
//! assert!(filter.should_process(Utf8Path::new("README.md")));
//! assert!(!filter.should_process(Utf8Path::new("styles.css")));
//! assert!(!filter.should_process(Utf8Path::new("packages/ui/node_modules/x/index.js")));
//! ```

use camino::Utf8Path;
use cq_core::WatchConfig;

/// A predicate deciding which paths the watcher reports.
///
/// Filters must be [`Send`] and [`Sync`] because they run on the notify
/// thread, and `'static` because they are moved into its callback.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if events for `path` should be reported.
    ///
    /// `path` is relative to the watched root.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// The standard project filter: monitored extensions outside ignored directories.
///
/// An ignored directory name matches anywhere in the component chain, not
/// only at the root.
#[derive(Debug, Clone)]
pub struct ProjectFilter {
    /// Accepted extensions (without the leading dot).
    extensions: Vec<String>,

    /// Directory names to ignore.
    ignored_dirs: Vec<String>,
}

impl ProjectFilter {
    /// Creates a filter from the watcher configuration.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            ignored_dirs: config.ignored_dirs.clone(),
        }
    }

    /// Adds another directory name to ignore.
    #[must_use]
    pub fn ignore_dir(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.ignored_dirs.contains(&name) {
            self.ignored_dirs.push(name);
        }
        self
    }

    /// Returns `true` if any component of `path` is an ignored directory.
    #[must_use]
    pub fn is_ignored_dir(&self, path: &Utf8Path) -> bool {
        path.components()
            .any(|component| self.ignored_dirs.iter().any(|d| d == component.as_str()))
    }

    /// Returns `true` if the file extension is monitored.
    #[must_use]
    pub fn has_monitored_extension(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

impl Default for ProjectFilter {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

impl FileFilter for ProjectFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.has_monitored_extension(path) && !self.is_ignored_dir(path)
    }
}

impl<F: Fn(&Utf8Path) -> bool + Send + Sync + 'static> FileFilter for F {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_all() {
        assert!(AcceptAllFilter.should_process(Utf8Path::new("anything.bin")));
    }

    #[test]
    fn test_monitored_extensions() {
        let filter = ProjectFilter::default();
        assert!(filter.should_process(Utf8Path::new("a.ts")));
        assert!(filter.should_process(Utf8Path::new("src/lib.rs")));
        assert!(filter.should_process(Utf8Path::new("package.json")));
        assert!(filter.should_process(Utf8Path::new("docs/guide.md")));
        assert!(!filter.should_process(Utf8Path::new("image.png")));
        assert!(!filter.should_process(Utf8Path::new("Makefile")));
    }

    #[test]
    fn test_ignored_dirs_anywhere_in_chain() {
        let filter = ProjectFilter::default();
        assert!(filter.is_ignored_dir(Utf8Path::new("node_modules/a.ts")));
        assert!(filter.is_ignored_dir(Utf8Path::new("packages/web/node_modules/a.ts")));
        assert!(filter.is_ignored_dir(Utf8Path::new(".git/config.json")));
        assert!(!filter.is_ignored_dir(Utf8Path::new("src/node_modules_helper.ts")));
    }

    #[test]
    fn test_ignore_dir_builder() {
        let filter = ProjectFilter::default().ignore_dir("generated");
        assert!(!filter.should_process(Utf8Path::new("src/generated/api.ts")));
        assert!(filter.should_process(Utf8Path::new("src/api.ts")));
    }

    #[test]
    fn test_closure_filter() {
        let filter = |path: &Utf8Path| path.as_str().starts_with("src/");
        assert!(filter.should_process(Utf8Path::new("src/a.ts")));
        assert!(!filter.should_process(Utf8Path::new("lib/a.ts")));
    }
}

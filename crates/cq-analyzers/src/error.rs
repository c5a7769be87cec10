//! Error types for the cq-analyzers crate.
//!
//! This module provides the [`AnalyzerError`] type for errors that can occur
//! while enumerating project files, running detectors, or persisting their
//! findings.

use camino::Utf8PathBuf;
use cq_store::StoreError;

/// Errors that can occur during analysis.
///
/// # Error Recovery Strategy
///
/// - **Root errors** ([`AnalyzerError::RootNotFound`]): Fatal - nothing to analyze
/// - **Read errors** ([`AnalyzerError::Read`]): Skip the file, continue
/// - **Pattern errors** ([`AnalyzerError::Pattern`]): The detector is degraded
///   for this run; other detectors are unaffected
/// - **Store errors** ([`AnalyzerError::Store`]): Fatal for the run - findings
///   could not be persisted
///
/// # Examples
///
/// ```
/// use cq_analyzers::AnalyzerError;
///
/// fn report(err: &AnalyzerError) {
///     if err.is_recoverable() {
///         eprintln!("warning: {err}");
///     } else {
///         eprintln!("error: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// The project root does not exist or is not a directory.
    #[error("project root is not a directory: {0}")]
    RootNotFound(Utf8PathBuf),

    /// Failed to read a file.
    #[error("failed to read file {path}: {source}")]
    Read {
        /// The path of the file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A detector pattern failed to compile.
    #[error("invalid pattern for {name}: {source}")]
    Pattern {
        /// Which pattern failed.
        name: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// Findings could not be written to the store or preference log.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AnalyzerError {
    /// Creates a new [`AnalyzerError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`AnalyzerError::Pattern`] error.
    #[inline]
    pub fn pattern(name: impl Into<String>, source: regex::Error) -> Self {
        Self::Pattern {
            name: name.into(),
            source,
        }
    }

    /// Returns `true` if the pipeline can continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Pattern { .. })
    }

    /// Returns `true` if this error is fatal (the run should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::RootNotFound(path) | Self::Read { path, .. } => Some(path),
            Self::Store(err) => err.path(),
            Self::Pattern { .. } => None,
        }
    }
}

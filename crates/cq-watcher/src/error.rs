//! Error types for the cq-watcher crate.

use camino::{Utf8Path, Utf8PathBuf};

/// Errors raised while starting the project watcher.
///
/// Once [`ProjectWatcher::start`](crate::ProjectWatcher::start) returns, the
/// watcher reports nothing through this type: platform failures degrade it
/// to a cold-scan-only watcher and are logged instead.
///
/// # Examples
///
/// ```
/// use cq_watcher::WatchError;
///
/// let err = WatchError::root_not_found("does/not/exist");
/// assert!(err.is_fatal());
/// assert_eq!(err.path().map(|p| p.as_str()), Some("does/not/exist"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The project root does not exist.
    #[error("project root does not exist: {0}")]
    RootNotFound(Utf8PathBuf),

    /// The project root exists but could not be resolved to an absolute path.
    #[error("failed to resolve project root {path}: {source}")]
    Canonicalize {
        /// The root as given by the caller.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The platform watcher could not be created or attached.
    #[error("file notifications unavailable: {0}")]
    Notify(#[from] notify::Error),
}

impl WatchError {
    /// Creates a [`WatchError::RootNotFound`] error.
    #[inline]
    pub fn root_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::RootNotFound(path.into())
    }

    /// Creates a [`WatchError::Canonicalize`] error.
    #[inline]
    pub fn canonicalize(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Canonicalize {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the caller can keep going without live events.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Notify(_))
    }

    /// Returns `true` if no watcher can be built for this root.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the root this error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Self::RootNotFound(path) | Self::Canonicalize { path, .. } => Some(path),
            Self::Notify(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_root_not_found_is_fatal() {
        let err = WatchError::root_not_found("src/missing");
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "project root does not exist: src/missing");
    }

    #[test]
    fn test_canonicalize_keeps_path_and_source() {
        let err = WatchError::canonicalize(
            "proj",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_fatal());
        assert_eq!(err.path(), Some(Utf8Path::new("proj")));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_notify_is_recoverable() {
        let err = WatchError::Notify(notify::Error::generic("inotify limit reached"));
        assert!(err.is_recoverable());
        assert!(err.path().is_none());
    }
}

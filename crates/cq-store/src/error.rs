//! Error types for the cq-store crate.

use camino::Utf8PathBuf;

/// Errors raised while persisting criticisms or preferences.
///
/// Reads never fail: a missing or malformed state file loads as empty.
/// Only writes surface errors.
///
/// # Examples
///
/// ```
/// use cq_store::StoreError;
/// use camino::Utf8PathBuf;
///
/// let err = StoreError::io(
///     "/project/.critique/criticisms.json",
///     std::io::Error::other("disk full"),
/// );
/// assert!(err.to_string().contains("criticisms.json"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A state file could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The file being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store document could not be serialized.
    #[error("failed to serialize criticisms: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a new [`StoreError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Serialize(_) => None,
        }
    }

    /// Returns `true` if retrying the write could succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_carries_path() {
        let err = StoreError::io(
            "state/criticisms.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.path().map(|p| p.as_str()), Some("state/criticisms.json"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_serialize_error_has_no_path() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = StoreError::from(json_err);
        assert!(err.path().is_none());
        assert!(!err.is_recoverable());
    }
}

//! Source location type for pointing a criticism at a line.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// A line within a project file.
///
/// Criticisms store their location as display text (`src/app.ts:12`), so
/// this type exists mostly to render that text consistently.
///
/// # Examples
///
/// ```
/// use cq_core::SourceLocation;
///
/// let loc = SourceLocation::new("src/app.ts", 12);
/// assert_eq!(loc.to_string(), "src/app.ts:12");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Project-relative file path.
    pub path: Utf8PathBuf,

    /// Line number (1-indexed).
    pub line: usize,
}

impl SourceLocation {
    /// Creates a new source location.
    #[inline]
    #[must_use]
    pub fn new(path: impl AsRef<Utf8Path>, line: usize) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new(Utf8Path::new("lib/util.py"), 3);
        assert_eq!(loc.to_string(), "lib/util.py:3");
    }

    #[test]
    fn test_source_location_equality() {
        assert_eq!(
            SourceLocation::new("a.ts", 1),
            SourceLocation::new(Utf8PathBuf::from("a.ts"), 1)
        );
        assert_ne!(SourceLocation::new("a.ts", 1), SourceLocation::new("a.ts", 2));
    }
}

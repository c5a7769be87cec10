//! Event types for file change notifications.
//!
//! # Event Flow
//!
//! ```text
//! notify notification
//!        │
//!        ▼
//!   ProjectWatcher: filter + stat + seen-set  ──►  WatchEvent (add/change/unlink)
//!        │
//!        ▼
//!   DebouncedBatcher (100ms, last write per path wins)
//!        │
//!        ▼
//!   Vec<WatchEvent> delivered to the batch handler
//! ```

use std::fmt;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchEventKind {
    /// The path exists and had not been seen before.
    Add,

    /// The path exists and had been seen before.
    Change,

    /// The path no longer exists.
    Unlink,
}

impl WatchEventKind {
    /// Returns the lower-case label of this kind.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Unlink => "unlink",
        }
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified change to one project file.
///
/// The path is relative to the watched root.
///
/// # Examples
///
/// ```
/// use cq_watcher::{WatchEvent, WatchEventKind};
///
/// let event = WatchEvent::new(WatchEventKind::Add, "src/app.ts");
/// assert_eq!(event.path.as_str(), "src/app.ts");
/// assert_eq!(event.extension(), Some("ts"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub kind: WatchEventKind,

    /// Project-relative path of the file.
    pub path: Utf8PathBuf,

    /// When the event was classified.
    ///
    /// Uses [`Instant`] for monotonic ordering inside a batch.
    pub timestamp: Instant,
}

impl WatchEvent {
    /// Creates an event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(kind: WatchEventKind, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Instant::now(),
        }
    }

    /// Returns the file extension, if any.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }

    /// Returns `true` if the file was removed.
    #[inline]
    #[must_use]
    pub fn is_unlink(&self) -> bool {
        self.kind == WatchEventKind::Unlink
    }
}

/// A batch of events flushed from one debounce window.
///
/// Holds at most one event per path. Uses [`SmallVec`] with inline storage
/// for the common case of a handful of saved files.
#[derive(Debug, Clone, Default)]
pub struct WatchBatch {
    /// The events in this batch.
    pub events: SmallVec<[WatchEvent; 8]>,
}

impl WatchBatch {
    /// Returns the number of events in this batch.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the batch contains no events.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns an iterator over the events.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &WatchEvent> {
        self.events.iter()
    }

    /// Returns the paths of files that still exist after this batch.
    ///
    /// These are the inputs for incremental analysis.
    #[must_use]
    pub fn live_paths(&self) -> Vec<&Utf8Path> {
        self.events
            .iter()
            .filter(|e| !e.is_unlink())
            .map(|e| e.path.as_path())
            .collect()
    }
}

impl From<Vec<WatchEvent>> for WatchBatch {
    fn from(events: Vec<WatchEvent>) -> Self {
        Self {
            events: SmallVec::from_vec(events),
        }
    }
}

impl IntoIterator for WatchBatch {
    type Item = WatchEvent;
    type IntoIter = smallvec::IntoIter<[WatchEvent; 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a WatchBatch {
    type Item = &'a WatchEvent;
    type IntoIter = std::slice::Iter<'a, WatchEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Per-kind counts for one batch, used in log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Newly created files.
    pub added: usize,
    /// Modified files.
    pub changed: usize,
    /// Removed files.
    pub removed: usize,
}

impl BatchStats {
    /// Computes statistics for a batch of events.
    #[must_use]
    pub fn from_batch(batch: &WatchBatch) -> Self {
        batch.iter().fold(Self::default(), |mut stats, event| {
            match event.kind {
                WatchEventKind::Add => stats.added += 1,
                WatchEventKind::Change => stats.changed += 1,
                WatchEventKind::Unlink => stats.removed += 1,
            }
            stats
        })
    }

    /// Total number of events counted.
    #[inline]
    #[must_use]
    pub const fn total(&self) -> usize {
        self.added + self.changed + self.removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_event_accessors() {
        let event = WatchEvent::new(WatchEventKind::Change, "src/components/Button.tsx");
        assert_eq!(event.extension(), Some("tsx"));
        assert_eq!(event.file_name(), Some("Button.tsx"));
        assert!(!event.is_unlink());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(WatchEventKind::Add.to_string(), "add");
        assert_eq!(WatchEventKind::Unlink.as_str(), "unlink");
        assert_eq!(
            serde_json::to_string(&WatchEventKind::Change).unwrap(),
            r#""change""#
        );
    }

    #[test]
    fn test_live_paths_skip_unlinked() {
        let batch = WatchBatch::from(vec![
            WatchEvent::new(WatchEventKind::Add, "a.ts"),
            WatchEvent::new(WatchEventKind::Unlink, "b.ts"),
            WatchEvent::new(WatchEventKind::Change, "c.ts"),
        ]);
        let live: Vec<&str> = batch.live_paths().iter().map(|p| p.as_str()).collect();
        assert_eq!(live, vec!["a.ts", "c.ts"]);
    }

    #[test]
    fn test_batch_stats() {
        let batch = WatchBatch::from(vec![
            WatchEvent::new(WatchEventKind::Add, "a.ts"),
            WatchEvent::new(WatchEventKind::Add, "b.md"),
            WatchEvent::new(WatchEventKind::Unlink, "c.ts"),
        ]);
        let stats = BatchStats::from_batch(&batch);
        assert_eq!(stats.added, 2);
        assert_eq!(stats.changed, 0);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.total(), 3);
    }
}

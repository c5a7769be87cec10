//! Project watcher: cold scan plus live notify events.
//!
//! [`ProjectWatcher::start`] enumerates the matching files under the root to
//! seed a "seen" set, then installs a recursive `notify` watcher. Each native
//! notification path is filtered, stat'ed and turned into one
//! [`WatchEvent`]:
//!
//! - exists and unseen: `add` (and the path becomes seen)
//! - exists and seen: `change`
//! - missing: `unlink` (and the path is forgotten)
//!
//! Events are delivered synchronously to the [`EventSink`] on the notify
//! thread, under the same lock that guards the stopped flag. Once
//! [`stop`](ProjectWatcher::stop) returns the sink is never called again.
//!
//! # Usage
//!
//! ```no_run
//! use cq_core::WatchConfig;
//! use cq_watcher::{ProjectFilter, ProjectWatcher, WatchEvent};
//! use camino::Utf8Path;
//!
//! # fn example() -> Result<(), cq_watcher::WatchError> {
//! let config = WatchConfig::default();
//! let mut watcher = ProjectWatcher::start(
//!     Utf8Path::new("."),
//!     &config,
//!     ProjectFilter::from_config(&config),
//!     |event: WatchEvent| println!("{} {}", event.kind, event.path),
//! )?;
//!
//! // ... later
//! watcher.stop();
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cq_core::{FxHashSet, WatchConfig};
use ignore::WalkBuilder;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use crate::error::WatchError;
use crate::events::{WatchEvent, WatchEventKind};
use crate::filter::FileFilter;

/// Receives classified watch events, one per call.
///
/// Called on the notify thread while the watcher lock is held, so
/// implementations should hand the event off quickly (for example to
/// [`DebouncedBatcher::enqueue`](crate::DebouncedBatcher::enqueue)).
pub trait EventSink: Send + 'static {
    /// Handles one event.
    fn deliver(&mut self, event: WatchEvent);
}

impl<F: FnMut(WatchEvent) + Send + 'static> EventSink for F {
    fn deliver(&mut self, event: WatchEvent) {
        self(event);
    }
}

/// Mutable watcher state, guarded by one lock.
struct WatchState {
    seen: FxHashSet<Utf8PathBuf>,
    stopped: bool,
    sink: Box<dyn EventSink>,
}

impl WatchState {
    /// Updates the seen set for `path` and returns the resulting event.
    fn observe(&mut self, path: Utf8PathBuf, exists: bool) -> WatchEvent {
        if !exists {
            self.seen.remove(&path);
            return WatchEvent::new(WatchEventKind::Unlink, path);
        }
        if self.seen.insert(path.clone()) {
            WatchEvent::new(WatchEventKind::Add, path)
        } else {
            WatchEvent::new(WatchEventKind::Change, path)
        }
    }
}

/// State shared with the notify callback.
struct Shared {
    root: Utf8PathBuf,
    filter: Box<dyn FileFilter>,
    state: Mutex<WatchState>,
}

impl Shared {
    /// Classifies one native notification path and delivers the event.
    fn handle_path(&self, path: &Path) {
        let Some(path) = Utf8Path::from_path(path) else {
            tracing::debug!(path = %path.display(), "Skipping non-UTF-8 path in watch event");
            return;
        };
        let Ok(relative) = path.strip_prefix(&self.root) else {
            tracing::trace!(path = %path, "Event outside the watched root");
            return;
        };
        if relative.as_str().is_empty() || !self.filter.should_process(relative) {
            return;
        }

        let exists = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => return,
            Ok(_) => true,
            Err(_) => false,
        };

        let mut state = self.state.lock();
        if state.stopped {
            return;
        }
        let event = state.observe(relative.to_owned(), exists);
        tracing::trace!(path = %event.path, kind = %event.kind, "Watch event");
        state.sink.deliver(event);
    }
}

/// Watches a project tree and reports add/change/unlink events.
pub struct ProjectWatcher {
    shared: Arc<Shared>,
    /// `None` when live watching is unavailable or after [`stop`](Self::stop).
    watcher: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for ProjectWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectWatcher")
            .field("root", &self.shared.root)
            .field("is_live", &self.is_live())
            .finish_non_exhaustive()
    }
}

impl ProjectWatcher {
    /// Scans `root` and starts watching it.
    ///
    /// The cold scan does not emit events; it only seeds the seen set so that
    /// the first save of an existing file is reported as `change`.
    ///
    /// If the platform watcher cannot be installed, a warning is logged and
    /// the returned watcher runs without live events.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::RootNotFound`] if `root` does not exist and
    /// [`WatchError::Canonicalize`] if it cannot be resolved.
    pub fn start<F, S>(
        root: &Utf8Path,
        config: &WatchConfig,
        filter: F,
        sink: S,
    ) -> Result<Self, WatchError>
    where
        F: FileFilter,
        S: EventSink,
    {
        if !root.exists() {
            return Err(WatchError::root_not_found(root));
        }
        let root = root
            .canonicalize_utf8()
            .map_err(|source| WatchError::canonicalize(root, source))?;

        let seen = cold_scan(&root, config, &filter);
        tracing::debug!(root = %root, files = seen.len(), "Cold scan complete");

        let shared = Arc::new(Shared {
            root,
            filter: Box::new(filter),
            state: Mutex::new(WatchState {
                seen,
                stopped: false,
                sink: Box::new(sink),
            }),
        });

        let watcher = match install(&shared, config.recursive) {
            Ok(watcher) => {
                tracing::info!(root = %shared.root, recursive = config.recursive, "Watching project");
                Some(watcher)
            }
            Err(error) => {
                tracing::warn!(
                    root = %shared.root,
                    error = %error,
                    "Live watching unavailable, continuing without file events"
                );
                None
            }
        };

        Ok(Self { shared, watcher })
    }

    /// Stops delivering events. Idempotent.
    ///
    /// After this returns the sink is never invoked again, even for
    /// notifications already in flight on the notify thread.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
        }
        // In-flight callbacks see the stopped flag; the backend shuts down on drop.
        self.watcher = None;
        tracing::info!(root = %self.shared.root, "Watcher stopped");
    }

    /// Returns the canonical root being watched.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.shared.root
    }

    /// Returns `true` if live events are being received.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.watcher.is_some()
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.state.lock().stopped
    }

    /// Returns the number of files currently considered present.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.shared.state.lock().seen.len()
    }

    /// Returns `true` if `path` (relative to the root) is in the seen set.
    #[must_use]
    pub fn has_seen(&self, path: &Utf8Path) -> bool {
        self.shared.state.lock().seen.contains(path)
    }
}

impl Drop for ProjectWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Installs the platform watcher, forwarding every path to `shared`.
fn install(shared: &Arc<Shared>, recursive: bool) -> Result<RecommendedWatcher, WatchError> {
    let callback_shared = Arc::clone(shared);
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        match result {
            // Opening or reading a file is not a change.
            Ok(event) if matches!(event.kind, EventKind::Access(_)) => {}
            Ok(event) => {
                for path in &event.paths {
                    callback_shared.handle_path(path);
                }
            }
            Err(error) => tracing::warn!(error = %error, "Watch backend error"),
        }
    })?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher.watch(shared.root.as_std_path(), mode)?;
    Ok(watcher)
}

/// Enumerates the files under `root` that pass `filter`.
///
/// Ignored directories are pruned during the walk. Unreadable directories
/// are skipped.
fn cold_scan(root: &Utf8Path, config: &WatchConfig, filter: &dyn FileFilter) -> FxHashSet<Utf8PathBuf> {
    let ignored = config.ignored_dirs.clone();
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && entry.file_name().to_str().is_some_and(|n| ignored.iter().any(|d| d == n)))
        });
    if !config.recursive {
        builder.max_depth(Some(1));
    }

    let mut seen = FxHashSet::default();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(error) => {
                tracing::debug!(error = %error, "Skipping unreadable entry during cold scan");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Some(path) = Utf8Path::from_path(entry.path()) else {
            continue;
        };
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if filter.should_process(relative) {
            seen.insert(relative.to_owned());
        }
    }
    seen
}

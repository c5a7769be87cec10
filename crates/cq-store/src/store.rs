//! The persisted criticism worklist.
//!
//! [`CriticismStore`] owns one JSON document:
//!
//! ```json
//! { "criticisms": [ ... ], "lastAnalysis": "2026-10-17T09:30:00Z" }
//! ```
//!
//! Every operation loads the whole document, applies its change, and writes
//! it back. There is no file locking; a single process owns the project.
//! A missing or malformed document loads as empty.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use cq_core::{Category, Criticism, CriticismStatus};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The on-disk shape of the criticism store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    /// All known criticisms, in insertion order.
    #[serde(default)]
    pub criticisms: Vec<Criticism>,

    /// When the last analysis finished.
    #[serde(default)]
    pub last_analysis: Option<DateTime<Utc>>,
}

impl StoreDocument {
    /// Inserts `criticism`, replacing an existing record with the same id.
    ///
    /// A replaced record keeps its review state (`status`, `reasoning`) and
    /// creation time, so re-detecting a reviewed finding never returns it to
    /// pending. Returns `true` if the id was new.
    pub fn upsert(&mut self, mut criticism: Criticism) -> bool {
        if let Some(existing) = self.criticisms.iter_mut().find(|c| c.id == criticism.id) {
            criticism.status = existing.status;
            criticism.reasoning = existing.reasoning.take();
            criticism.created_at = existing.created_at;
            *existing = criticism;
            false
        } else {
            self.criticisms.push(criticism);
            true
        }
    }
}

/// File-backed criticism store.
///
/// # Examples
///
/// ```no_run
/// use cq_core::{Category, Criticism, Severity};
/// use cq_store::CriticismStore;
///
/// # fn example() -> Result<(), cq_store::StoreError> {
/// let store = CriticismStore::open("/project/.critique/criticisms.json");
/// store.add_criticism(Criticism::new(
///     Category::Elim,
///     "unused imports: useMemo",
///     "useMemo is imported but never used",
///     ["src/App.tsx"],
///     Severity::Low,
/// ))?;
/// assert_eq!(store.pending().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CriticismStore {
    path: Utf8PathBuf,
}

impl CriticismStore {
    /// Opens the store at `path`. Nothing is read until the first call.
    #[must_use]
    pub fn open(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Loads the document, falling back to an empty one.
    #[must_use]
    pub fn load(&self) -> StoreDocument {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %self.path, error = %error, "Unreadable store, starting empty");
                }
                return StoreDocument::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|error| {
            tracing::debug!(path = %self.path, error = %error, "Malformed store, starting empty");
            StoreDocument::default()
        })
    }

    /// Writes `document`, creating the state directory if needed.
    pub fn save(&self, document: &StoreDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let mut json = serde_json::to_string_pretty(document)?;
        json.push('\n');
        std::fs::write(&self.path, json).map_err(|e| StoreError::io(&self.path, e))
    }

    /// Returns every stored criticism.
    #[must_use]
    pub fn all(&self) -> Vec<Criticism> {
        self.load().criticisms
    }

    /// Upserts one criticism by id.
    pub fn add_criticism(&self, criticism: Criticism) -> Result<(), StoreError> {
        self.add_criticisms(std::iter::once(criticism)).map(|_| ())
    }

    /// Upserts many criticisms with a single load and save.
    ///
    /// Returns the number of ids that were new to the store.
    pub fn add_criticisms(
        &self,
        criticisms: impl IntoIterator<Item = Criticism>,
    ) -> Result<usize, StoreError> {
        let mut document = self.load();
        let mut inserted = 0;
        let mut touched = false;
        for criticism in criticisms {
            touched = true;
            if document.upsert(criticism) {
                inserted += 1;
            }
        }
        if touched {
            self.save(&document)?;
        }
        Ok(inserted)
    }

    /// Returns the criticisms still awaiting review.
    #[must_use]
    pub fn pending(&self) -> Vec<Criticism> {
        self.load()
            .criticisms
            .into_iter()
            .filter(|c| c.status.is_pending())
            .collect()
    }

    /// Returns the criticisms in `category`, in any status.
    #[must_use]
    pub fn by_category(&self, category: Category) -> Vec<Criticism> {
        self.load()
            .criticisms
            .into_iter()
            .filter(|c| c.category == category)
            .collect()
    }

    /// Looks up one criticism.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Criticism> {
        self.load().criticisms.into_iter().find(|c| c.id == id)
    }

    /// Moves criticism `id` to `status`.
    ///
    /// Returns `Ok(false)` if no criticism has that id or the transition is
    /// not allowed (nothing moves back to pending). A miss is not an error.
    pub fn update_status(
        &self,
        id: &str,
        status: CriticismStatus,
        reasoning: Option<String>,
    ) -> Result<bool, StoreError> {
        let mut document = self.load();
        let Some(criticism) = document.criticisms.iter_mut().find(|c| c.id == id) else {
            tracing::debug!(id, "No criticism with this id");
            return Ok(false);
        };
        if !criticism.set_status(status, reasoning) {
            return Ok(false);
        }
        self.save(&document)?;
        Ok(true)
    }

    /// Stamps the time of the last completed analysis.
    pub fn record_analysis(&self) -> Result<DateTime<Utc>, StoreError> {
        let mut document = self.load();
        let now = Utc::now();
        document.last_analysis = Some(now);
        self.save(&document)?;
        Ok(now)
    }

    /// Returns when the last analysis finished, if ever.
    #[must_use]
    pub fn last_analysis(&self) -> Option<DateTime<Utc>> {
        self.load().last_analysis
    }
}

#[cfg(test)]
mod tests {
    use cq_core::Severity;
    use tempfile::TempDir;

    use super::*;

    fn temp_store() -> (TempDir, CriticismStore) {
        let dir = TempDir::new().unwrap();
        let path = Utf8Path::from_path(dir.path())
            .unwrap()
            .join(".critique/criticisms.json");
        (dir, CriticismStore::open(path))
    }

    fn dup(files: [&str; 2]) -> Criticism {
        Criticism::new(
            Category::Simplify,
            "duplicated code block (6+ lines)",
            "same block",
            files,
            Severity::Medium,
        )
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load(), StoreDocument::default());
        assert!(store.all().is_empty());
        assert!(store.last_analysis().is_none());
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let (_dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ definitely not json").unwrap();
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_upsert_is_idempotent_by_id() {
        let (_dir, store) = temp_store();
        store.add_criticism(dup(["a.ts", "b.ts"])).unwrap();
        store.add_criticism(dup(["b.ts", "a.ts"])).unwrap();

        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].files.len(), 2);
    }

    #[test]
    fn test_upsert_keeps_review_state() {
        let (_dir, store) = temp_store();
        let first = dup(["a.ts", "b.ts"]);
        let id = first.id.clone();
        let created = first.created_at;
        store.add_criticism(first).unwrap();
        store
            .update_status(&id, CriticismStatus::Rejected, Some("noise".to_owned()))
            .unwrap();

        let mut again = dup(["a.ts", "b.ts"]);
        again.description = "refreshed".to_owned();
        store.add_criticism(again).unwrap();

        let stored = store.get(&id).unwrap();
        assert_eq!(stored.status, CriticismStatus::Rejected);
        assert_eq!(stored.reasoning.as_deref(), Some("noise"));
        assert_eq!(stored.created_at, created);
        assert_eq!(stored.description, "refreshed");
    }

    #[test]
    fn test_add_criticisms_counts_new_ids() {
        let (_dir, store) = temp_store();
        let inserted = store
            .add_criticisms([dup(["a.ts", "b.ts"]), dup(["a.ts", "c.ts"]), dup(["b.ts", "a.ts"])])
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn test_pending_and_by_category() {
        let (_dir, store) = temp_store();
        let elim = Criticism::new(Category::Elim, "unused imports: x", "d", ["a.ts"], Severity::Low);
        let elim_id = elim.id.clone();
        store.add_criticisms([elim, dup(["a.ts", "b.ts"])]).unwrap();

        assert!(store.update_status(&elim_id, CriticismStatus::Accepted, None).unwrap());

        assert_eq!(store.pending().len(), 1);
        assert_eq!(store.by_category(Category::Elim).len(), 1);
        assert_eq!(store.by_category(Category::Test).len(), 0);
        assert_eq!(store.get(&elim_id).unwrap().status, CriticismStatus::Accepted);
    }

    #[test]
    fn test_update_status_miss_is_not_an_error() {
        let (_dir, store) = temp_store();
        assert!(!store.update_status("0000000000000000", CriticismStatus::Rejected, None).unwrap());
        assert!(!store.path().exists(), "a miss must not write the store");
    }

    #[test]
    fn test_update_status_never_returns_to_pending() {
        let (_dir, store) = temp_store();
        let c = dup(["a.ts", "b.ts"]);
        let id = c.id.clone();
        store.add_criticism(c).unwrap();

        assert!(store.update_status(&id, CriticismStatus::Skipped, None).unwrap());
        assert!(!store.update_status(&id, CriticismStatus::Pending, None).unwrap());
        assert_eq!(store.get(&id).unwrap().status, CriticismStatus::Skipped);
    }

    #[test]
    fn test_record_analysis_and_camel_case_document() {
        let (_dir, store) = temp_store();
        store.add_criticism(dup(["a.ts", "b.ts"])).unwrap();
        let stamped = store.record_analysis().unwrap();

        assert_eq!(store.last_analysis(), Some(stamped));
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"lastAnalysis\""));
        assert!(text.contains("\"createdAt\""));
        assert!(text.contains("\"category\": \"SIMPLIFY\""));
        assert!(text.contains("\"status\": \"pending\""));
    }
}

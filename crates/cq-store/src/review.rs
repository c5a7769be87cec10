//! Review operations shared by every surface (CLI, TUI, tool server).
//!
//! Accepting or rejecting a criticism updates its status in the store and
//! appends a dated entry to the preference log. Skipping only updates the
//! status. An unknown id is a miss, reported as [`ReviewOutcome::NotFound`].

use chrono::Local;
use cq_core::{Criticism, CriticismStatus, Decision, PreferenceEntry};

use crate::error::StoreError;
use crate::preferences::PreferenceLog;
use crate::store::CriticismStore;

/// Result of one review operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// The criticism was updated.
    Updated(Box<Criticism>),

    /// No criticism has the given id.
    NotFound,

    /// The criticism exists but cannot move to the requested status.
    Unchanged,
}

impl ReviewOutcome {
    /// Returns `true` if the store was changed.
    #[must_use]
    pub const fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }
}

fn review(
    store: &CriticismStore,
    log: Option<&PreferenceLog>,
    id: &str,
    status: CriticismStatus,
    reasoning: Option<String>,
) -> Result<ReviewOutcome, StoreError> {
    let reasoning = reasoning.filter(|r| !r.trim().is_empty());
    if !store.update_status(id, status, reasoning.clone())? {
        return Ok(if store.get(id).is_some() {
            ReviewOutcome::Unchanged
        } else {
            ReviewOutcome::NotFound
        });
    }
    let Some(criticism) = store.get(id) else {
        return Ok(ReviewOutcome::NotFound);
    };

    if let Some(log) = log {
        let decision = match status {
            CriticismStatus::Rejected => Decision::Rejected,
            _ => Decision::Accepted,
        };
        log.log_decision(&PreferenceEntry {
            date: Local::now().date_naive(),
            category: criticism.category,
            subject: criticism.subject.clone(),
            location: criticism.display_location(),
            reasoning,
            decision,
        })?;
    }

    tracing::info!(id, status = %status, subject = %criticism.subject, "Reviewed criticism");
    Ok(ReviewOutcome::Updated(Box::new(criticism)))
}

/// Accepts criticism `id` and records the decision.
pub fn accept(
    store: &CriticismStore,
    log: &PreferenceLog,
    id: &str,
    reasoning: Option<String>,
) -> Result<ReviewOutcome, StoreError> {
    review(store, Some(log), id, CriticismStatus::Accepted, reasoning)
}

/// Rejects criticism `id` and records the decision.
///
/// Future findings with the same category and subject are suppressed.
pub fn reject(
    store: &CriticismStore,
    log: &PreferenceLog,
    id: &str,
    reasoning: Option<String>,
) -> Result<ReviewOutcome, StoreError> {
    review(store, Some(log), id, CriticismStatus::Rejected, reasoning)
}

/// Defers criticism `id`. Nothing is written to the preference log.
pub fn skip(store: &CriticismStore, id: &str) -> Result<ReviewOutcome, StoreError> {
    review(store, None, id, CriticismStatus::Skipped, None)
}

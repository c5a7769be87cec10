//! Criticism types: the durable unit of work in the review worklist.
//!
//! A [`Criticism`] is created by a detector, filtered against the preference
//! log, and upserted into the store as [`CriticismStatus::Pending`]. Its
//! identity comes from [`generate_criticism_id`], so the same logical
//! finding always lands on the same record.

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smallvec::SmallVec;

/// Number of hex characters kept from the SHA-256 digest.
const ID_LENGTH: usize = 16;

/// The kind of improvement a criticism proposes.
///
/// # Examples
///
/// ```
/// use cq_core::Category;
///
/// assert_eq!(Category::Simplify.to_string(), "SIMPLIFY");
/// assert_eq!("elim".parse::<Category>().unwrap(), Category::Elim);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    /// Dead or unnecessary code that should be removed.
    Elim,

    /// A better pattern exists for this code.
    Simplify,

    /// Test coverage is missing.
    Test,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 3] = [Self::Elim, Self::Simplify, Self::Test];

    /// Returns the canonical upper-case label used in persisted formats.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Elim => "ELIM",
            Self::Simplify => "SIMPLIFY",
            Self::Test => "TEST",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ELIM" => Ok(Self::Elim),
            "SIMPLIFY" => Ok(Self::Simplify),
            "TEST" => Ok(Self::Test),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// How urgent a criticism is.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth doing when convenient.
    #[default]
    Low,

    /// Should be addressed soon.
    Medium,

    /// Should be addressed before the next commit.
    High,
}

impl Severity {
    /// Returns the lower-case label used in persisted formats.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The review state of a criticism.
///
/// Criticisms start as [`Pending`](Self::Pending) and move to one of the
/// other states exactly once; they never return to pending.
///
/// # Examples
///
/// ```
/// use cq_core::CriticismStatus;
///
/// assert!(CriticismStatus::Pending.can_transition_to(CriticismStatus::Rejected));
/// assert!(!CriticismStatus::Accepted.can_transition_to(CriticismStatus::Pending));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriticismStatus {
    /// Awaiting review.
    #[default]
    Pending,

    /// The user agreed with the criticism.
    Accepted,

    /// The user disagreed; the pattern should not be suggested again.
    Rejected,

    /// The user deferred the decision.
    Skipped,
}

impl CriticismStatus {
    /// Returns `true` if the criticism still awaits review.
    #[inline]
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` if moving to `next` is allowed.
    ///
    /// Any status may move to a non-pending status; nothing moves back to
    /// pending.
    #[inline]
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        !matches!(next, Self::Pending)
    }

    /// Returns the lower-case label used in persisted formats.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for CriticismStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the identity of a criticism from its category, subject and files.
///
/// The files are sorted before hashing, so the argument order does not
/// matter. Two findings with the same inputs are the same finding.
///
/// # Examples
///
/// ```
/// use cq_core::{generate_criticism_id, Category};
///
/// let a = generate_criticism_id(Category::Simplify, "dup", &["b.ts", "a.ts"]);
/// let b = generate_criticism_id(Category::Simplify, "dup", &["a.ts", "b.ts"]);
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 16);
/// ```
#[must_use]
pub fn generate_criticism_id<S: AsRef<str>>(category: Category, subject: &str, files: &[S]) -> String {
    let mut sorted: Vec<&str> = files.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(category.as_str().as_bytes());
    hasher.update(subject.as_bytes());
    hasher.update(sorted.join(",").as_bytes());
    let digest = hasher.finalize();

    let mut id: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    id.truncate(ID_LENGTH);
    id
}

/// One reported code-quality finding awaiting user disposition.
///
/// Serialized with camelCase keys as part of the criticism store document.
///
/// # Examples
///
/// ```
/// use cq_core::{Category, Criticism, Severity};
///
/// let c = Criticism::new(
///     Category::Elim,
///     "unused imports: useMemo",
///     "useMemo is imported but never used",
///     ["src/App.tsx"],
///     Severity::Low,
/// )
/// .with_location("src/App.tsx:1");
///
/// assert!(c.status.is_pending());
/// assert_eq!(c.location.as_deref(), Some("src/App.tsx:1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criticism {
    /// Deterministic identity, see [`generate_criticism_id`].
    pub id: String,

    /// Kind of improvement proposed.
    pub category: Category,

    /// Short human label; part of the identity and the suppression key.
    pub subject: String,

    /// Longer explanation shown to the reviewer.
    pub description: String,

    /// Project-relative files the finding refers to.
    pub files: SmallVec<[Utf8PathBuf; 2]>,

    /// Optional `path:line` pointer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// How urgent the finding is.
    pub severity: Severity,

    /// Review state.
    #[serde(default)]
    pub status: CriticismStatus,

    /// When the finding was first produced.
    pub created_at: DateTime<Utc>,

    /// Free text supplied by the reviewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Criticism {
    /// Creates a pending criticism and derives its id.
    #[must_use]
    pub fn new<I, P>(
        category: Category,
        subject: impl Into<String>,
        description: impl Into<String>,
        files: I,
        severity: Severity,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        let subject = subject.into();
        let files: SmallVec<[Utf8PathBuf; 2]> = files.into_iter().map(Into::into).collect();
        let id = generate_criticism_id(
            category,
            &subject,
            &files.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        );

        Self {
            id,
            category,
            subject,
            description: description.into(),
            files,
            location: None,
            severity,
            status: CriticismStatus::Pending,
            created_at: Utc::now(),
            reasoning: None,
        }
    }

    /// Sets the `path:line` location.
    #[must_use]
    pub fn with_location(mut self, location: impl ToString) -> Self {
        self.location = Some(location.to_string());
        self
    }

    /// Moves the criticism to `status`, recording the reviewer's reasoning.
    ///
    /// Returns `false` and leaves the record untouched if the transition is
    /// not allowed.
    pub fn set_status(&mut self, status: CriticismStatus, reasoning: Option<String>) -> bool {
        if !self.status.can_transition_to(status) {
            return false;
        }
        self.status = status;
        if reasoning.is_some() {
            self.reasoning = reasoning;
        }
        true
    }

    /// Returns the text used as `location` in preference entries.
    ///
    /// Falls back to the first file, then to `project`.
    #[must_use]
    pub fn display_location(&self) -> String {
        self.location
            .clone()
            .or_else(|| self.files.first().map(ToString::to_string))
            .unwrap_or_else(|| "project".to_owned())
    }
}

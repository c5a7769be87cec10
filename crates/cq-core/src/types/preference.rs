//! Preference entries: the reviewer's accept/reject history.
//!
//! Entries are rendered as markdown bullets under `## Accepted` or
//! `## Rejected` in the preference log. The bullet format is also the parse
//! target, so [`PreferenceEntry::to_markdown_line`] is the only writer.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::criticism::Category;

/// The outcome of a review that is worth remembering.
///
/// Skipped criticisms are not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// The reviewer agreed with the criticism.
    Accepted,

    /// The reviewer rejected the criticism.
    Rejected,
}

impl Decision {
    /// Returns the markdown section header for this decision.
    #[inline]
    #[must_use]
    pub const fn section_header(self) -> &'static str {
        match self {
            Self::Accepted => "## Accepted",
            Self::Rejected => "## Rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        })
    }
}

/// One recorded decision.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use cq_core::{Category, Decision, PreferenceEntry};
///
/// let entry = PreferenceEntry {
///     date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
///     category: Category::Simplify,
///     subject: "duplicated code block (6+ lines)".to_owned(),
///     location: "src/a.ts:4".to_owned(),
///     reasoning: Some("generated code".to_owned()),
///     decision: Decision::Rejected,
/// };
///
/// assert_eq!(
///     entry.to_markdown_line(),
///     "- 2026-03-01: SIMPLIFY `duplicated code block (6+ lines)` in src/a.ts:4 - \"generated code\""
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    /// Day the decision was made.
    pub date: NaiveDate,

    /// Category of the reviewed criticism.
    pub category: Category,

    /// Subject of the reviewed criticism.
    pub subject: String,

    /// Where the criticism pointed.
    pub location: String,

    /// Optional reviewer explanation.
    pub reasoning: Option<String>,

    /// Accepted or rejected.
    pub decision: Decision,
}

impl PreferenceEntry {
    /// Makes a subject safe to embed between backticks on one line.
    ///
    /// Apply the same function when comparing subjects against parsed
    /// entries.
    #[must_use]
    pub fn sanitize_subject(subject: &str) -> String {
        subject
            .chars()
            .map(|c| match c {
                '`' => '\'',
                '\n' | '\r' => ' ',
                other => other,
            })
            .collect()
    }

    /// Renders the entry as one markdown bullet.
    #[must_use]
    pub fn to_markdown_line(&self) -> String {
        let subject = Self::sanitize_subject(&self.subject);
        let location = self.location.replace(['\n', '\r'], " ");
        let mut line = format!(
            "- {}: {} `{}` in {}",
            self.date.format("%Y-%m-%d"),
            self.category,
            subject,
            location
        );
        if let Some(reasoning) = self.reasoning.as_deref().filter(|r| !r.trim().is_empty()) {
            line.push_str(" - \"");
            line.push_str(&reasoning.replace(['\n', '\r'], " "));
            line.push('"');
        }
        line
    }

    /// Returns `true` if this entry records a rejection of `(category, subject)`.
    #[must_use]
    pub fn rejects(&self, category: Category, subject: &str) -> bool {
        self.decision == Decision::Rejected
            && self.category == category
            && self.subject == Self::sanitize_subject(subject)
    }
}

//! The preference log: accepted and rejected findings in markdown.
//!
//! The log is a flat, append-only markdown file:
//!
//! ```markdown
//! # Preferences
//!
//! ## Accepted
//! - 2026-10-01: ELIM `unused imports: useMemo` in src/App.tsx
//!
//! ## Rejected
//! - 2026-10-02: SIMPLIFY `duplicated code block (6+ lines)` in src/a.ts - "generated"
//! ```
//!
//! Before a new criticism is stored, the pipeline asks
//! [`PreferenceLog::was_rejected`] whether its `(category, subject)` pair was
//! ever rejected. The file is re-read on every call so that edits made by
//! hand take effect immediately.

use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use cq_core::{Category, Decision, PreferenceEntry};
use regex::Regex;

use crate::error::StoreError;

/// Template written when the log does not exist yet.
const TEMPLATE: &str = "# Preferences\n\n## Accepted\n\n## Rejected\n";

static ENTRY_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^- (\d{4}-\d{2}-\d{2}): (ELIM|SIMPLIFY|TEST) `([^`]*)` in (.+?)(?: - "(.*)")?$"#)
        .ok()
});

/// Parses every decision bullet in `text`.
///
/// Bullets are attributed to the most recent `## Accepted` or `## Rejected`
/// header. Lines outside those sections, and lines that do not match the
/// bullet format, are ignored.
///
/// # Examples
///
/// ```
/// use cq_core::{Category, Decision};
/// use cq_store::parse_preferences;
///
/// let text = "## Rejected\n- 2026-10-02: ELIM `x` in a.ts - \"noise\"\n";
/// let entries = parse_preferences(text);
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].decision, Decision::Rejected);
/// assert_eq!(entries[0].reasoning.as_deref(), Some("noise"));
/// ```
#[must_use]
pub fn parse_preferences(text: &str) -> Vec<PreferenceEntry> {
    let Some(re) = ENTRY_RE.as_ref() else {
        return Vec::new();
    };

    let mut section: Option<Decision> = None;
    let mut entries = Vec::new();

    for line in text.lines() {
        let line = line.trim_end();
        if line.starts_with("## ") {
            section = match line {
                l if l == Decision::Accepted.section_header() => Some(Decision::Accepted),
                l if l == Decision::Rejected.section_header() => Some(Decision::Rejected),
                _ => None,
            };
            continue;
        }
        let Some(decision) = section else {
            continue;
        };
        let Some(caps) = re.captures(line) else {
            continue;
        };

        let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") else {
            continue;
        };
        let Ok(category) = caps[2].parse::<Category>() else {
            continue;
        };
        entries.push(PreferenceEntry {
            date,
            category,
            subject: caps[3].to_owned(),
            location: caps[4].to_owned(),
            reasoning: caps.get(5).map(|m| m.as_str().to_owned()),
            decision,
        });
    }

    entries
}

/// Inserts `line` at the end of the section for `decision`.
///
/// Creates the section at the end of the text if it is missing.
fn insert_into_section(text: &str, decision: Decision, line: &str) -> String {
    let header = decision.section_header();
    let lines: Vec<&str> = text.lines().collect();

    let Some(start) = lines.iter().position(|l| l.trim_end() == header) else {
        let mut out = text.trim_end().to_owned();
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(header);
        out.push('\n');
        out.push_str(line);
        out.push('\n');
        return out;
    };

    // End of the section: the next header of any level, or end of file.
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.starts_with('#'))
        .map_or(lines.len(), |offset| start + 1 + offset);

    // Insert after the last non-blank line of the section.
    let insert_at = (start + 1..end)
        .rev()
        .find(|&i| !lines[i].trim().is_empty())
        .map_or(start + 1, |i| i + 1);

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 2);
    out.extend_from_slice(&lines[..insert_at]);
    out.push(line);
    if insert_at == end && end < lines.len() {
        out.push("");
    }
    out.extend_from_slice(&lines[insert_at..]);

    let mut joined = out.join("\n");
    joined.push('\n');
    joined
}

/// File-backed preference log.
#[derive(Debug, Clone)]
pub struct PreferenceLog {
    path: Utf8PathBuf,
}

impl PreferenceLog {
    /// Opens the log at `path`. Nothing is read until the first call.
    #[must_use]
    pub fn open(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn read(&self) -> String {
        std::fs::read_to_string(&self.path).unwrap_or_else(|error| {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %self.path, error = %error, "Unreadable preference log");
            }
            String::new()
        })
    }

    /// Returns every recorded decision.
    #[must_use]
    pub fn entries(&self) -> Vec<PreferenceEntry> {
        parse_preferences(&self.read())
    }

    /// Returns `true` if `(category, subject)` was ever rejected.
    #[must_use]
    pub fn was_rejected(&self, category: Category, subject: &str) -> bool {
        self.entries().iter().any(|e| e.rejects(category, subject))
    }

    /// Appends `entry` under its decision's section.
    pub fn log_decision(&self, entry: &PreferenceEntry) -> Result<(), StoreError> {
        let mut text = self.read();
        if text.trim().is_empty() {
            TEMPLATE.clone_into(&mut text);
        }
        let updated = insert_into_section(&text, entry.decision, &entry.to_markdown_line());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        std::fs::write(&self.path, updated).map_err(|e| StoreError::io(&self.path, e))?;
        tracing::debug!(
            path = %self.path,
            decision = %entry.decision,
            category = %entry.category,
            "Recorded preference"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn entry(decision: Decision, subject: &str, reasoning: Option<&str>) -> PreferenceEntry {
        PreferenceEntry {
            date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            category: Category::Simplify,
            subject: subject.to_owned(),
            location: "src/a.ts:4".to_owned(),
            reasoning: reasoning.map(ToOwned::to_owned),
            decision,
        }
    }

    fn temp_log() -> (TempDir, PreferenceLog) {
        let dir = TempDir::new().unwrap();
        let path = Utf8Path::from_path(dir.path())
            .unwrap()
            .join(".critique/preferences.md");
        (dir, PreferenceLog::open(path))
    }

    #[test]
    fn test_parse_sections_and_optional_reasoning() {
        let text = "\
# Preferences

## Accepted
- 2026-10-01: ELIM `unused imports: useMemo` in src/App.tsx

## Rejected
- 2026-10-02: SIMPLIFY `duplicated code block (6+ lines)` in src/a.ts:3 - \"generated code\"
- not a bullet
- 2026-13-45: ELIM `bad date` in x.ts
";
        let entries = parse_preferences(text);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].decision, Decision::Accepted);
        assert_eq!(entries[0].category, Category::Elim);
        assert_eq!(entries[0].location, "src/App.tsx");
        assert!(entries[0].reasoning.is_none());

        assert_eq!(entries[1].decision, Decision::Rejected);
        assert_eq!(entries[1].subject, "duplicated code block (6+ lines)");
        assert_eq!(entries[1].location, "src/a.ts:3");
        assert_eq!(entries[1].reasoning.as_deref(), Some("generated code"));
    }

    #[test]
    fn test_bullets_outside_sections_are_ignored() {
        let text = "- 2026-10-01: ELIM `x` in a.ts\n## Notes\n- 2026-10-01: ELIM `y` in b.ts\n";
        assert!(parse_preferences(text).is_empty());
    }

    #[test]
    fn test_rendered_line_parses_back() {
        let original = entry(Decision::Rejected, "weird `subject`", Some("because"));
        let text = format!("## Rejected\n{}\n", original.to_markdown_line());
        let parsed = parse_preferences(&text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].subject, "weird 'subject'");
        assert!(parsed[0].rejects(Category::Simplify, "weird `subject`"));
    }

    #[test]
    fn test_log_decision_creates_template() {
        let (_dir, log) = temp_log();
        log.log_decision(&entry(Decision::Rejected, "dup", Some("noise"))).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        insta::assert_snapshot!(text, @r#"
        # Preferences

        ## Accepted

        ## Rejected
        - 2026-10-17: SIMPLIFY `dup` in src/a.ts:4 - "noise"
        "#);
    }

    #[test]
    fn test_log_decision_keeps_sections_apart() {
        let (_dir, log) = temp_log();
        log.log_decision(&entry(Decision::Rejected, "first", None)).unwrap();
        log.log_decision(&entry(Decision::Accepted, "second", None)).unwrap();
        log.log_decision(&entry(Decision::Rejected, "third", None)).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        insta::assert_snapshot!(text, @r"
        # Preferences

        ## Accepted
        - 2026-10-17: SIMPLIFY `second` in src/a.ts:4

        ## Rejected
        - 2026-10-17: SIMPLIFY `first` in src/a.ts:4
        - 2026-10-17: SIMPLIFY `third` in src/a.ts:4
        ");

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert!(log.was_rejected(Category::Simplify, "first"));
        assert!(!log.was_rejected(Category::Simplify, "second"));
        assert!(!log.was_rejected(Category::Elim, "first"));
    }

    #[test]
    fn test_missing_section_is_appended() {
        let text = "# Preferences\n\n## Accepted\n- 2026-10-01: ELIM `x` in a.ts\n";
        let out = insert_into_section(text, Decision::Rejected, "- new");
        assert_eq!(
            out,
            "# Preferences\n\n## Accepted\n- 2026-10-01: ELIM `x` in a.ts\n\n## Rejected\n- new\n"
        );
    }

    #[test]
    fn test_was_rejected_sees_hand_edits() {
        let (_dir, log) = temp_log();
        assert!(!log.was_rejected(Category::Elim, "x"));

        std::fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        std::fs::write(log.path(), "## Rejected\n- 2026-10-01: ELIM `x` in a.ts\n").unwrap();
        assert!(log.was_rejected(Category::Elim, "x"));
    }
}

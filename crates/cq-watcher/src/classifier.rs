//! Change classification for settled watch events.
//!
//! [`classify`] maps one [`WatchEvent`] to the action the pipeline should
//! take. Rules are ordered and the first match wins:
//!
//! | # | Condition | Action |
//! |---|-----------|--------|
//! | 1 | `unlink` | [`ChangeAction::Removed`] |
//! | 2 | build or lock file name | [`ChangeAction::ConfigChanged`] |
//! | 3 | `.md` | [`ChangeAction::DocsChanged`] |
//! | 4 | test file (`.test.`, `.spec.`, `__tests__/`) | [`ChangeAction::CheckRules`] |
//! | 5 | source file, `add` | [`ChangeAction::SuggestTest`] |
//! | 6 | source file, `change` | [`ChangeAction::CheckRules`] |
//! | 7 | anything else | [`ChangeAction::Nothing`] |
//!
//! The classifier is pure: it never touches the filesystem.

use std::fmt;

use camino::Utf8Path;
use cq_core::config::{is_source_extension, is_test_path};

use crate::events::{WatchEvent, WatchEventKind};

/// Build manifests and lockfiles whose change affects the whole project.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "tsconfig.json",
    "Cargo.toml",
    "Cargo.lock",
    "go.mod",
    "go.sum",
    "requirements.txt",
    "pyproject.toml",
    "poetry.lock",
    "Gemfile",
    "Gemfile.lock",
    "composer.json",
    "composer.lock",
];

/// What the pipeline should do about a settled change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// The file was deleted.
    Removed,
    /// A build manifest or lockfile changed.
    ConfigChanged,
    /// Documentation was added or edited.
    DocsChanged,
    /// The file should be checked against project rules.
    CheckRules,
    /// A new source file appeared; check whether it has tests.
    SuggestTest,
    /// No action.
    Nothing,
}

impl ChangeAction {
    /// Returns a short label for log lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::ConfigChanged => "config-changed",
            Self::DocsChanged => "docs-changed",
            Self::CheckRules => "check-rules",
            Self::SuggestTest => "suggest-test",
            Self::Nothing => "nothing",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The result of classifying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// What to do.
    pub action: ChangeAction,
    /// Human-readable detail for logging.
    pub details: String,
}

impl Classification {
    fn new(action: ChangeAction, details: impl Into<String>) -> Self {
        Self {
            action,
            details: details.into(),
        }
    }
}

/// Returns `true` if the file name is a recognized build or lock file.
#[must_use]
pub fn is_config_file(path: &Utf8Path) -> bool {
    path.file_name()
        .is_some_and(|name| CONFIG_FILE_NAMES.contains(&name))
}

/// Classifies a settled event.
///
/// # Examples
///
/// ```
/// use cq_watcher::{classify, ChangeAction, WatchEvent, WatchEventKind};
///
/// let c = classify(&WatchEvent::new(WatchEventKind::Add, "src/new.ts"));
/// assert_eq!(c.action, ChangeAction::SuggestTest);
/// ```
#[must_use]
pub fn classify(event: &WatchEvent) -> Classification {
    let path = event.path.as_path();

    if event.kind == WatchEventKind::Unlink {
        return Classification::new(ChangeAction::Removed, format!("{path} removed"));
    }

    if is_config_file(path) {
        return Classification::new(
            ChangeAction::ConfigChanged,
            format!("{} changed, dependencies may differ", path.file_name().unwrap_or_default()),
        );
    }

    let extension = path.extension().unwrap_or_default();

    if extension == "md" {
        let details = match event.kind {
            WatchEventKind::Add => "documentation added",
            _ => "documentation changed",
        };
        return Classification::new(ChangeAction::DocsChanged, details);
    }

    if is_test_path(path) {
        return Classification::new(ChangeAction::CheckRules, format!("test file {path} updated"));
    }

    if is_source_extension(extension) {
        return match event.kind {
            WatchEventKind::Add => {
                Classification::new(ChangeAction::SuggestTest, format!("new source file {path}"))
            }
            _ => Classification::new(ChangeAction::CheckRules, format!("{path} modified")),
        };
    }

    Classification::new(ChangeAction::Nothing, String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(kind: WatchEventKind, path: &str) -> ChangeAction {
        classify(&WatchEvent::new(kind, path)).action
    }

    #[test]
    fn test_unlink_wins_over_everything() {
        assert_eq!(action(WatchEventKind::Unlink, "package.json"), ChangeAction::Removed);
        assert_eq!(action(WatchEventKind::Unlink, "README.md"), ChangeAction::Removed);
        assert_eq!(action(WatchEventKind::Unlink, "src/a.ts"), ChangeAction::Removed);
    }

    #[test]
    fn test_config_files() {
        assert_eq!(action(WatchEventKind::Change, "package.json"), ChangeAction::ConfigChanged);
        assert_eq!(
            action(WatchEventKind::Add, "packages/web/tsconfig.json"),
            ChangeAction::ConfigChanged
        );
        assert_eq!(action(WatchEventKind::Change, "Cargo.toml"), ChangeAction::ConfigChanged);
        assert_eq!(action(WatchEventKind::Change, "src/data.json"), ChangeAction::Nothing);
    }

    #[test]
    fn test_docs_details() {
        let added = classify(&WatchEvent::new(WatchEventKind::Add, "docs/guide.md"));
        assert_eq!(added.action, ChangeAction::DocsChanged);
        assert_eq!(added.details, "documentation added");

        let changed = classify(&WatchEvent::new(WatchEventKind::Change, "CLAUDE.md"));
        assert_eq!(changed.details, "documentation changed");
    }

    #[test]
    fn test_test_files_check_rules_even_when_added() {
        assert_eq!(action(WatchEventKind::Add, "src/a.test.ts"), ChangeAction::CheckRules);
        assert_eq!(action(WatchEventKind::Add, "src/a.spec.tsx"), ChangeAction::CheckRules);
        assert_eq!(action(WatchEventKind::Add, "src/__tests__/a.ts"), ChangeAction::CheckRules);
    }

    #[test]
    fn test_source_files() {
        assert_eq!(action(WatchEventKind::Add, "src/a.ts"), ChangeAction::SuggestTest);
        assert_eq!(action(WatchEventKind::Change, "src/a.ts"), ChangeAction::CheckRules);
        assert_eq!(action(WatchEventKind::Add, "main.py"), ChangeAction::SuggestTest);
    }

    #[test]
    fn test_everything_else_is_nothing() {
        assert_eq!(action(WatchEventKind::Add, "logo.svg"), ChangeAction::Nothing);
        assert_eq!(action(WatchEventKind::Change, "Makefile"), ChangeAction::Nothing);
    }

    #[test]
    fn test_is_config_file() {
        assert!(is_config_file(Utf8Path::new("apps/web/package.json")));
        assert!(!is_config_file(Utf8Path::new("src/package.ts")));
    }

    #[test]
    fn test_action_labels() {
        assert_eq!(ChangeAction::SuggestTest.to_string(), "suggest-test");
        assert_eq!(ChangeAction::Nothing.label(), "nothing");
    }
}

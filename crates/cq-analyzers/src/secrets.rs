//! Hardcoded credential detection.
//!
//! Lines are matched against an ordered table of named patterns; the first
//! pattern that matches a line wins. Files that legitimately hold fake
//! credentials (lockfiles, env templates, tests, fixtures, mocks) are
//! skipped entirely, and lines that look like placeholders or environment
//! lookups are ignored.
//!
//! Findings carry a short preview of the match. The full secret is never
//! copied into a criticism.

use std::fmt::Write as _;
use std::sync::LazyLock;

use camino::Utf8Path;
use cq_core::{Category, Criticism, Severity, SourceLocation};
use regex::Regex;

use crate::detector::{DetectionContext, Detector, DetectorKind, DetectorOutput};
use crate::error::AnalyzerError;
use crate::source::SourceFile;

/// Number of matched characters shown in a preview.
const PREVIEW_CHARS: usize = 20;

/// `(name, pattern, severity)`, checked in order.
const PATTERN_TABLE: &[(&str, &str, Severity)] = &[
    ("Anthropic API key", r"sk-ant-[A-Za-z0-9_-]{20,}", Severity::High),
    ("OpenAI API key", r"\bsk-(?:proj-)?[A-Za-z0-9]{32,}", Severity::High),
    ("AWS access key", r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b", Severity::High),
    (
        "GitHub token",
        r"\b(?:gh[pousr]_[A-Za-z0-9]{36,}|github_pat_[A-Za-z0-9_]{22,})",
        Severity::High,
    ),
    ("Stripe live key", r"\b[sr]k_live_[A-Za-z0-9]{24,}", Severity::High),
    ("Slack token", r"\bxox[baprs]-[A-Za-z0-9-]{10,}", Severity::High),
    ("Google API key", r"\bAIza[0-9A-Za-z_-]{35}", Severity::High),
    ("private key", r"-----BEGIN (?:[A-Z]+ )?PRIVATE KEY-----", Severity::High),
    (
        "JWT",
        r"\beyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}",
        Severity::Medium,
    ),
    ("bearer token", r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]{20,}=*", Severity::Medium),
    (
        "database URL with credentials",
        r#"\b(?:postgres(?:ql)?|mysql|mariadb|mongodb(?:\+srv)?|redis|amqps?)://[^\s:/@'"]+:[^\s@'"]+@[^\s'"]+"#,
        Severity::High,
    ),
    (
        "API key",
        r#"(?i)\b(?:api[_-]?key|secret[_-]?key|access[_-]?token|auth[_-]?token|client[_-]?secret)\b["']?\s*[:=]\s*["'][A-Za-z0-9_\-./+=]{16,}["']"#,
        Severity::Medium,
    ),
    (
        "password",
        r#"(?i)\b(?:password|passwd|pwd)\b["']?\s*[:=]\s*["'][^"'\s]{8,}["']"#,
        Severity::Medium,
    ),
];

/// Substrings (lowercase) that mark a line as a placeholder or an
/// environment lookup.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "xxx",
    "your-",
    "your_",
    "example",
    "placeholder",
    "${",
    "{{",
    "process.env",
    "import.meta.env",
    "os.environ",
    "getenv",
    "env::var",
];

/// Lockfiles and other generated files that embed hashes.
const LOCKFILES: &[&str] = &[
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "Cargo.lock",
    "poetry.lock",
    "Pipfile.lock",
    "Gemfile.lock",
    "composer.lock",
    "go.sum",
];

/// Directories whose contents are fake by convention.
const FIXTURE_DIRS: &[&str] = &["fixtures", "__fixtures__", "__mocks__", "mocks", "testdata"];

/// A compiled named pattern.
#[derive(Debug)]
struct SecretPattern {
    name: &'static str,
    regex: Regex,
    severity: Severity,
}

type PatternTable = Result<Vec<SecretPattern>, (&'static str, regex::Error)>;

static PATTERNS: LazyLock<PatternTable> = LazyLock::new(|| {
    PATTERN_TABLE
        .iter()
        .map(|&(name, pattern, severity)| {
            Regex::new(pattern)
                .map(|regex| SecretPattern { name, regex, severity })
                .map_err(|error| (name, error))
        })
        .collect()
});

/// `<API_KEY>`, `<user>`, `<your-token>` style placeholders: any angle
/// bracket span without whitespace inside.
static ANGLE_PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<[^<>\s]+>").ok());

/// Returns `true` if `path` should never be scanned.
#[must_use]
pub fn is_denylisted(path: &Utf8Path) -> bool {
    let name = path.file_name().unwrap_or_default();

    if LOCKFILES.contains(&name) {
        return true;
    }
    if name.starts_with(".env.")
        && [".example", ".sample", ".template"]
            .iter()
            .any(|suffix| name.ends_with(suffix))
    {
        return true;
    }
    if name.ends_with(".example") || name.contains(".mock.") {
        return true;
    }
    if cq_core::config::is_test_path(path) {
        return true;
    }
    if path
        .components()
        .any(|component| FIXTURE_DIRS.contains(&component.as_str()))
    {
        return true;
    }
    path.ends_with("cq-analyzers/src/secrets.rs")
}

/// Returns `true` if the line carries a placeholder marker.
#[must_use]
pub fn is_placeholder_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|marker| lower.contains(marker))
        || ANGLE_PLACEHOLDER
            .as_ref()
            .is_some_and(|regex| regex.is_match(line))
}

/// Returns the first [`PREVIEW_CHARS`] characters of `matched` plus `...`.
fn preview(matched: &str) -> String {
    let mut shown: String = matched.chars().take(PREVIEW_CHARS).collect();
    shown.push_str("...");
    shown
}

/// One pattern's hits in one file.
#[derive(Debug)]
struct FileHit {
    pattern: usize,
    first_line: usize,
    preview: String,
    other_lines: Vec<usize>,
}

/// Scans files for hardcoded credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretScanner;

impl SecretScanner {
    /// Creates the scanner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Scans one file.
    ///
    /// Each pattern produces at most one finding per file; repeat hits are
    /// listed in the description of the first. Separate findings for the
    /// repeats would carry the same category, subject and file, and so the
    /// same id, and the store would collapse them anyway.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Pattern`] if the pattern table failed to
    /// compile.
    pub fn scan_file(&self, file: &SourceFile) -> Result<Vec<Criticism>, AnalyzerError> {
        let patterns = PATTERNS
            .as_ref()
            .map_err(|(name, error)| AnalyzerError::pattern(*name, error.clone()))?;

        if is_denylisted(&file.path) {
            return Ok(Vec::new());
        }

        let mut hits: Vec<FileHit> = Vec::new();
        for (index, line) in file.content.lines().enumerate() {
            if is_placeholder_line(line) {
                continue;
            }
            let Some((pattern, matched)) = patterns
                .iter()
                .enumerate()
                .find_map(|(i, p)| p.regex.find(line).map(|m| (i, m.as_str())))
            else {
                continue;
            };

            let line_number = index + 1;
            if let Some(hit) = hits.iter_mut().find(|hit| hit.pattern == pattern) {
                hit.other_lines.push(line_number);
            } else {
                hits.push(FileHit {
                    pattern,
                    first_line: line_number,
                    preview: preview(matched),
                    other_lines: Vec::new(),
                });
            }
        }

        Ok(hits
            .into_iter()
            .map(|hit| {
                let pattern = &patterns[hit.pattern];
                let mut description = format!(
                    "Possible {} hardcoded at {}:{} ({}). Move it to an environment variable or a secret manager and rotate it.",
                    pattern.name, file.path, hit.first_line, hit.preview
                );
                if !hit.other_lines.is_empty() {
                    let lines: Vec<String> = hit.other_lines.iter().map(ToString::to_string).collect();
                    let _ = write!(description, " Also on lines {}.", lines.join(", "));
                }
                Criticism::new(
                    Category::Elim,
                    format!("hardcoded {}", pattern.name),
                    description,
                    [file.path.clone()],
                    pattern.severity,
                )
                .with_location(SourceLocation::new(&file.path, hit.first_line))
            })
            .collect())
    }
}

impl Detector for SecretScanner {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Secrets
    }

    fn run(&self, ctx: &DetectionContext<'_>) -> Result<DetectorOutput, AnalyzerError> {
        let mut criticisms = Vec::new();
        let mut examined = 0;
        for file in ctx.targets() {
            examined += 1;
            criticisms.extend(self.scan_file(file)?);
        }
        Ok(DetectorOutput::new(criticisms, examined))
    }
}

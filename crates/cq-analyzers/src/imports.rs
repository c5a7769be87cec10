//! Unused-import detection for JS/TS-family files.
//!
//! [`extract_imports`] is the only place import syntax is recognized. It
//! handles default, named (`a as b`), namespace (`* as ns`), combined and
//! `import type` forms, including statements spread over several lines.
//! An imported name counts as used if it appears as a whole word on any
//! line outside the import statements.

use std::sync::LazyLock;

use cq_core::{Category, Criticism, Severity, SourceLocation};
use regex::Regex;

use crate::detector::{DetectionContext, Detector, DetectorKind, DetectorOutput};
use crate::error::AnalyzerError;
use crate::source::SourceFile;

/// At this many unused names a finding becomes medium severity.
const MEDIUM_THRESHOLD: usize = 5;

/// Longest statement, in lines, before an unterminated import is abandoned.
const MAX_STATEMENT_LINES: usize = 64;

/// `import [type] <clause> from '<source>'`
static FROM_IMPORT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\s*import\s+(type\s+)?(.+?)\s*\bfrom\s*['"]([^'"]+)['"]"#).ok()
});

/// `import '<source>'`
static SIDE_EFFECT_IMPORT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"^\s*import\s*['"]([^'"]+)['"]"#).ok());

/// One identifier bound by an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    /// The local binding (`b` in `a as b`).
    pub local: String,
    /// `true` for `import type` or an inline `type` modifier.
    pub type_only: bool,
}

/// One import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// 1-based first line.
    pub line: usize,
    /// 1-based last line.
    pub end_line: usize,
    /// Module specifier.
    pub source: String,
    /// Bound identifiers; empty for side-effect imports.
    pub names: Vec<ImportedName>,
}

/// Returns `true` for identifier characters, including `$` and `_`.
#[inline]
fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Returns `true` if `word` occurs in `haystack` with identifier
/// boundaries on both sides.
///
/// # Examples
///
/// ```
/// use cq_analyzers::imports::contains_word;
///
/// assert!(contains_word("return useState(0);", "useState"));
/// assert!(!contains_word("const $state = 1;", "state"));
/// ```
#[must_use]
pub fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// Returns `true` if `text` is a plain identifier.
fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(is_ident_char)
}

/// Returns `true` if a trimmed line opens a static import.
fn opens_import(trimmed: &str) -> bool {
    trimmed.strip_prefix("import").is_some_and(|rest| {
        rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '*' || c == '\'' || c == '"')
    })
}

/// Parses the clause between `import [type]` and `from`.
fn parse_clause(clause: &str, statement_type_only: bool) -> Vec<ImportedName> {
    let mut names = Vec::new();
    let mut outside = clause.to_owned();

    let braces = clause
        .find('{')
        .zip(clause.rfind('}'))
        .filter(|(open, close)| open < close);
    if let Some((open, close)) = braces {
        for item in clause[open + 1..close].split(',') {
            let item = item.trim();
            let (item, inline_type) = match item.strip_prefix("type ") {
                Some(rest) => (rest.trim(), true),
                None => (item, false),
            };
            let local = item.rsplit_once(" as ").map_or(item, |(_, alias)| alias).trim();
            if is_identifier(local) {
                names.push(ImportedName {
                    local: local.to_owned(),
                    type_only: statement_type_only || inline_type,
                });
            }
        }
        outside = format!("{}{}", &clause[..open], &clause[close + 1..]);
    }

    for part in outside.split(',') {
        let part = part.trim();
        let local = part
            .strip_prefix('*')
            .and_then(|rest| rest.trim().strip_prefix("as"))
            .map_or(part, str::trim);
        if is_identifier(local) {
            names.push(ImportedName {
                local: local.to_owned(),
                type_only: statement_type_only,
            });
        }
    }
    names
}

/// Parses one complete statement, or returns `None` if `text` is not one yet.
fn parse_statement(text: &str) -> Option<(String, Vec<ImportedName>)> {
    if let Some(caps) = FROM_IMPORT.as_ref().and_then(|re| re.captures(text)) {
        let type_only = caps.get(1).is_some();
        return Some((caps[3].to_owned(), parse_clause(&caps[2], type_only)));
    }
    SIDE_EFFECT_IMPORT
        .as_ref()
        .and_then(|re| re.captures(text))
        .map(|caps| (caps[1].to_owned(), Vec::new()))
}

/// Extracts every static import statement from `content`.
///
/// # Examples
///
/// ```
/// use cq_analyzers::imports::extract_imports;
///
/// let imports = extract_imports("import React, { useState as useLocal } from 'react';");
/// let names: Vec<_> = imports[0].names.iter().map(|n| n.local.as_str()).collect();
/// assert_eq!(names, ["useLocal", "React"]);
/// ```
#[must_use]
pub fn extract_imports(content: &str) -> Vec<ImportStatement> {
    let lines: Vec<&str> = content.lines().collect();
    let mut statements = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        if !opens_import(lines[index].trim_start()) {
            index += 1;
            continue;
        }

        let mut text = String::new();
        let mut parsed = None;
        let last = (index + MAX_STATEMENT_LINES).min(lines.len());
        for (end, line) in lines.iter().enumerate().take(last).skip(index) {
            if end > index {
                if opens_import(line.trim_start()) {
                    break;
                }
                text.push('\n');
            }
            text.push_str(line);
            if let Some((source, names)) = parse_statement(&text) {
                parsed = Some((end, source, names));
                break;
            }
            // `import x = require(...)` and other forms end here unparsed.
            if line.contains(';') {
                break;
            }
        }

        match parsed {
            Some((end, source, names)) => {
                statements.push(ImportStatement {
                    line: index + 1,
                    end_line: end + 1,
                    source,
                    names,
                });
                index = end + 1;
            }
            None => index += 1,
        }
    }
    statements
}

/// Returns the imported names in `content` that are never referenced,
/// paired with the line of their import statement.
#[must_use]
pub fn find_unused(content: &str) -> Vec<(String, usize)> {
    let statements = extract_imports(content);
    if statements.is_empty() {
        return Vec::new();
    }

    let body: Vec<&str> = content
        .lines()
        .enumerate()
        .filter(|(index, _)| {
            let line = index + 1;
            !statements
                .iter()
                .any(|stmt| (stmt.line..=stmt.end_line).contains(&line))
        })
        .map(|(_, line)| line)
        .collect();

    let mut unused: Vec<(String, usize)> = statements
        .iter()
        .flat_map(|stmt| stmt.names.iter().map(move |name| (name, stmt.line)))
        .filter(|(name, _)| !body.iter().any(|line| contains_word(line, &name.local)))
        .map(|(name, line)| (name.local.clone(), line))
        .collect();
    unused.dedup_by(|a, b| a.0 == b.0);
    unused
}

/// Reports unused imports, one finding per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnusedImportDetector;

impl UnusedImportDetector {
    /// Creates the detector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks one file.
    #[must_use]
    pub fn check_file(&self, file: &SourceFile) -> Option<Criticism> {
        let unused = find_unused(&file.content);
        let first_line = unused.iter().map(|(_, line)| *line).min()?;

        let mut names: Vec<&str> = unused.iter().map(|(name, _)| name.as_str()).collect();
        names.sort_unstable();
        names.dedup();

        let severity = if names.len() >= MEDIUM_THRESHOLD {
            Severity::Medium
        } else {
            Severity::Low
        };
        let list = names.join(", ");
        let noun = if names.len() == 1 { "import is" } else { "imports are" };

        Some(
            Criticism::new(
                Category::Elim,
                format!("unused imports: {list}"),
                format!("{} {noun} never used in {}: {list}.", names.len(), file.path),
                [file.path.clone()],
                severity,
            )
            .with_location(SourceLocation::new(&file.path, first_line)),
        )
    }
}

impl Detector for UnusedImportDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::UnusedImports
    }

    fn run(&self, ctx: &DetectionContext<'_>) -> Result<DetectorOutput, AnalyzerError> {
        let mut criticisms = Vec::new();
        let mut examined = 0;
        for file in ctx.targets().filter(|file| file.is_script()) {
            examined += 1;
            criticisms.extend(self.check_file(file));
        }
        Ok(DetectorOutput::new(criticisms, examined))
    }
}

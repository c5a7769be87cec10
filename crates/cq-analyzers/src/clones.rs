//! Duplicated-code detection over sliding line windows.
//!
//! Every non-test source file is cut into overlapping windows of
//! [`AnalysisConfig::clone_window`](cq_core::AnalysisConfig) lines. Each
//! window is normalized (comments stripped, literals blanked, whitespace
//! collapsed) and fingerprinted with [`polynomial_hash`]. Windows that share
//! a fingerprint anywhere in the project are clones.
//!
//! For each fingerprint bucket only the first two occurrences are reported,
//! and a given pair of files is reported at most once per run. A long
//! duplicated block therefore yields one finding, not one per window.

use camino::Utf8Path;
use cq_core::{
    Category, Criticism, FxHashMap, FxHashSet, Severity, SourceLocation, polynomial_hash, to_base36,
};
use rayon::prelude::*;

use crate::detector::{DetectionContext, Detector, DetectorKind, DetectorOutput};
use crate::error::AnalyzerError;
use crate::source::SourceFile;

/// One fingerprinted window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Occurrence {
    /// Index into the eligible file list.
    file: usize,
    /// 1-based first line of the window.
    line: usize,
}

/// Returns `true` for characters that continue an identifier or a number.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Normalizes a block of code for clone comparison.
///
/// Line and block comments are dropped, string contents become empty
/// quotes, numeric literals become `0`, and runs of whitespace collapse to
/// a single space. Digits inside identifiers (`item2`, `h1`) are kept.
///
/// # Examples
///
/// ```
/// use cq_analyzers::clones::normalize_window;
///
/// let text = "const  retries = 3; // limit\nlog(\"retrying\", item2);";
/// assert_eq!(normalize_window(text), r#"const retries = 0; log("", item2);"#);
/// ```
#[must_use]
pub fn normalize_window(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut prev: Option<char> = None;

    let push_space = |out: &mut String| {
        if !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&n| n != '\n').is_some() {}
                push_space(&mut out);
                prev = None;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut last = '\0';
                for n in chars.by_ref() {
                    if last == '*' && n == '/' {
                        break;
                    }
                    last = n;
                }
                push_space(&mut out);
                prev = None;
            }
            '"' | '\'' | '`' => {
                // Plain quotes end at a newline even when unterminated.
                let multiline = c == '`';
                while let Some(n) = chars.next() {
                    if n == '\\' {
                        chars.next();
                    } else if n == c || (n == '\n' && !multiline) {
                        break;
                    }
                }
                out.push(c);
                out.push(c);
                prev = Some(c);
            }
            _ if c.is_ascii_digit() && !prev.is_some_and(is_word_char) => {
                while chars
                    .next_if(|&n| n.is_ascii_alphanumeric() || n == '.' || n == '_')
                    .is_some()
                {}
                out.push('0');
                prev = Some('0');
            }
            _ if c.is_whitespace() => {
                push_space(&mut out);
                prev = Some(' ');
            }
            _ => {
                out.push(c);
                prev = Some(c);
            }
        }
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out
}

/// Fingerprints every qualifying window of one file.
fn fingerprint_file(file: &SourceFile, window: usize, min_chars: usize) -> Vec<(i32, usize)> {
    let lines: Vec<&str> = file.content.lines().collect();
    if window == 0 || lines.len() < window {
        return Vec::new();
    }

    lines
        .windows(window)
        .enumerate()
        .filter_map(|(start, block)| {
            let normalized = normalize_window(&block.join("\n"));
            (normalized.len() >= min_chars).then(|| (polynomial_hash(&normalized), start + 1))
        })
        .collect()
}

/// Detects duplicated blocks across the project.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneDetector;

impl CloneDetector {
    /// Creates the detector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Renders one finding for an occurrence pair.
    fn criticism(window: usize, hash: i32, first: (&Utf8Path, usize), second: (&Utf8Path, usize)) -> Criticism {
        let (path_a, line_a) = first;
        let (path_b, line_b) = second;
        let subject = format!("duplicated code block ({window}+ lines)");
        let fingerprint = to_base36(hash);

        if path_a == path_b {
            let description = format!(
                "Lines {line_a}-{} and {line_b}-{} of {path_a} are duplicated within the same file \
                 (fingerprint {fingerprint}). Extract the shared logic into a helper.",
                line_a + window - 1,
                line_b + window - 1,
            );
            Criticism::new(Category::Simplify, subject, description, [path_a], Severity::Medium)
                .with_location(SourceLocation::new(path_a, line_a))
        } else {
            let description = format!(
                "Lines {line_a}-{} of {path_a} are duplicated in {path_b} at line {line_b} \
                 (fingerprint {fingerprint}). Extract the shared logic into one module.",
                line_a + window - 1,
            );
            Criticism::new(Category::Simplify, subject, description, [path_a, path_b], Severity::Medium)
                .with_location(SourceLocation::new(path_a, line_a))
        }
    }
}

impl Detector for CloneDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Clones
    }

    fn run(&self, ctx: &DetectionContext<'_>) -> Result<DetectorOutput, AnalyzerError> {
        let window = ctx.config.clone_window;
        let min_chars = ctx.config.min_clone_chars;

        let mut eligible: Vec<&SourceFile> = ctx
            .project
            .iter()
            .filter(|file| file.is_source() && !file.is_test())
            .collect();
        eligible.sort_by(|a, b| a.path.cmp(&b.path));

        let fingerprints: Vec<Vec<(i32, usize)>> = eligible
            .par_iter()
            .map(|file| fingerprint_file(file, window, min_chars))
            .collect();

        // Buckets keep first-seen order so results are stable across runs.
        let mut index: FxHashMap<i32, usize> = FxHashMap::default();
        let mut buckets: Vec<(i32, Vec<Occurrence>)> = Vec::new();
        for (file, windows) in fingerprints.into_iter().enumerate() {
            for (hash, line) in windows {
                let slot = *index.entry(hash).or_insert_with(|| {
                    buckets.push((hash, Vec::new()));
                    buckets.len() - 1
                });
                buckets[slot].1.push(Occurrence { file, line });
            }
        }

        let touches_changed = |occurrences: &[Occurrence]| {
            ctx.changed.is_none_or(|changed| {
                occurrences
                    .iter()
                    .any(|occ| changed.contains(&eligible[occ.file].path))
            })
        };

        let mut reported_pairs: FxHashSet<(usize, usize)> = FxHashSet::default();
        let mut criticisms = Vec::new();
        for (hash, occurrences) in &buckets {
            let [first, second, ..] = occurrences.as_slice() else {
                continue;
            };
            if !touches_changed(occurrences) {
                continue;
            }
            let pair = (first.file.min(second.file), first.file.max(second.file));
            if !reported_pairs.insert(pair) {
                continue;
            }
            criticisms.push(Self::criticism(
                window,
                *hash,
                (&eligible[first.file].path, first.line),
                (&eligible[second.file].path, second.line),
            ));
        }

        tracing::debug!(
            files = eligible.len(),
            buckets = buckets.len(),
            findings = criticisms.len(),
            "Clone detection complete"
        );
        Ok(DetectorOutput::new(criticisms, eligible.len()))
    }
}

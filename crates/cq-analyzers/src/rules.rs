//! Legacy-library reminders and project-rule enforcement.
//!
//! Two rule sources feed the checker:
//!
//! - a built-in table of legacy packages and their modern replacements;
//! - rules mined from the project's rule documents (`CLAUDE.md`,
//!   `AGENTS.md`, ...) with a handful of sentence patterns.
//!
//! Only "avoid" rules are enforced, by matching import statements (`import`,
//! `export ... from`, `require()`, dynamic `import()`) for the named
//! package. Prefer and require rules are kept for display.

use std::fmt::{self, Write as _};
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use cq_core::{AnalysisConfig, Category, Criticism, FxHashSet, Severity, SourceLocation};
use regex::Regex;

use crate::detector::{DetectionContext, Detector, DetectorKind, DetectorOutput};
use crate::error::AnalyzerError;
use crate::source::SourceFile;

/// Legacy package → preferred alternative.
pub const BUILTIN_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("moment", "Intl.DateTimeFormat / date-fns"),
    ("lodash", "native array and object methods"),
    ("underscore", "native array and object methods"),
    ("request", "fetch"),
    ("node-fetch", "the built-in fetch"),
    ("jquery", "native DOM APIs"),
    ("bluebird", "native Promise"),
    ("left-pad", "String.prototype.padStart"),
    ("uuid", "crypto.randomUUID()"),
    ("querystring", "URLSearchParams"),
];

/// A backticked span or a bare package-like token.
const TOKEN: &str = r"(`[^`]+`|[\w@./-]+)";

/// Sentence patterns, compiled once.
struct SentencePatterns {
    instead_of: Regex,
    avoid: Regex,
    prefer: Regex,
    always: Regex,
}

static SENTENCES: LazyLock<Option<SentencePatterns>> = LazyLock::new(|| {
    Some(SentencePatterns {
        instead_of: Regex::new(&format!(r"(?i)\buse\s+{TOKEN}\s+instead\s+of\s+{TOKEN}")).ok()?,
        avoid: Regex::new(&format!(r"(?i)\b(?:don[’']?t|do\s+not|never)\s+use\s+{TOKEN}")).ok()?,
        prefer: Regex::new(&format!(r"(?i)\bprefer\s+{TOKEN}\s+over\s+{TOKEN}")).ok()?,
        always: Regex::new(&format!(r"(?i)\balways\s+use\s+{TOKEN}")).ok()?,
    })
});

/// What a mined rule asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Do not use the pattern.
    Avoid {
        /// Suggested replacement, if the sentence named one.
        alternative: Option<String>,
    },
    /// Prefer the pattern over another.
    Prefer {
        /// The less preferred option.
        over: String,
    },
    /// Always use the pattern.
    Require,
}

/// A rule extracted from a project document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedRule {
    /// What the rule asks for.
    pub kind: RuleKind,
    /// The package or construct the rule names.
    pub pattern: String,
    /// Document the rule came from.
    pub source: Utf8PathBuf,
    /// 1-based line in the document.
    pub line: usize,
}

impl MinedRule {
    /// Returns `true` for enforced rules.
    #[must_use]
    pub const fn is_avoid(&self) -> bool {
        matches!(self.kind, RuleKind::Avoid { .. })
    }
}

impl fmt::Display for MinedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RuleKind::Avoid { alternative: Some(alt) } => {
                write!(f, "avoid {} (use {alt})", self.pattern)?;
            }
            RuleKind::Avoid { alternative: None } => write!(f, "avoid {}", self.pattern)?,
            RuleKind::Prefer { over } => write!(f, "prefer {} over {over}", self.pattern)?,
            RuleKind::Require => write!(f, "always use {}", self.pattern)?,
        }
        write!(f, " [{}:{}]", self.source, self.line)
    }
}

/// Strips backticks and trailing punctuation from a captured token.
fn clean_token(raw: &str) -> String {
    raw.trim_matches('`')
        .trim_end_matches(['.', ',', ';', ':', '!', '?', ')'])
        .to_owned()
}

/// Extracts rules from one document.
///
/// Recognized sentences (case-insensitive, anywhere on a line):
///
/// - "use X instead of Y" → avoid Y, alternative X
/// - "don't use X", "do not use X", "never use X" → avoid X
/// - "prefer X over Y" → prefer X over Y
/// - "always use X" → require X
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use cq_analyzers::rules::mine_rules;
///
/// let rules = mine_rules("- Use `dayjs` instead of `moment`.", Utf8Path::new("CLAUDE.md"));
/// assert_eq!(rules.len(), 1);
/// assert_eq!(rules[0].pattern, "moment");
/// ```
#[must_use]
pub fn mine_rules(text: &str, source: &Utf8Path) -> Vec<MinedRule> {
    let Some(patterns) = SENTENCES.as_ref() else {
        return Vec::new();
    };

    let mut rules = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let mut push = |kind: RuleKind, pattern: &str| {
            let pattern = clean_token(pattern);
            if !pattern.is_empty() {
                rules.push(MinedRule {
                    kind,
                    pattern,
                    source: source.to_owned(),
                    line: line_number,
                });
            }
        };

        for caps in patterns.instead_of.captures_iter(line) {
            push(
                RuleKind::Avoid {
                    alternative: Some(clean_token(&caps[1])),
                },
                &caps[2],
            );
        }
        for caps in patterns.avoid.captures_iter(line) {
            push(RuleKind::Avoid { alternative: None }, &caps[1]);
        }
        for caps in patterns.prefer.captures_iter(line) {
            push(
                RuleKind::Prefer {
                    over: clean_token(&caps[2]),
                },
                &caps[1],
            );
        }
        for caps in patterns.always.captures_iter(line) {
            push(RuleKind::Require, &caps[1]);
        }
    }
    rules
}

/// Builds the import-statement regex for one package name.
///
/// Matches the package itself and its subpaths (`lodash/debounce`,
/// `lodash.debounce`).
pub fn import_pattern(package: &str) -> Result<Regex, regex::Error> {
    let name = regex::escape(package);
    Regex::new(&format!(
        r#"(?:\bimport\s+(?:[^'";]*?\s+from\s+)?|\bexport\s+[^'";]*?\s+from\s+|\brequire\s*\(\s*|\bimport\s*\(\s*)['"]{name}(?:[/.][^'"]*)?['"]"#
    ))
}

/// Returns the 1-based line of the first match of `regex` in `content`.
fn first_match_line(regex: &Regex, content: &str) -> Option<usize> {
    regex
        .find(content)
        .map(|m| content[..m.start()].matches('\n').count() + 1)
}

/// The rules in force for one analysis run.
#[derive(Debug)]
pub struct RuleSet {
    builtins: Vec<(&'static str, &'static str, Regex)>,
    mined: Vec<MinedRule>,
    enforced: Vec<(usize, Regex)>,
}

impl RuleSet {
    /// Builds a rule set from already-read documents.
    ///
    /// Avoid rules are deduplicated by pattern; the first document wins.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Pattern`] if an import regex fails to build.
    pub fn from_documents(documents: &[(Utf8PathBuf, String)]) -> Result<Self, AnalyzerError> {
        let builtins = BUILTIN_SUBSTITUTIONS
            .iter()
            .map(|&(legacy, alternative)| {
                import_pattern(legacy)
                    .map(|regex| (legacy, alternative, regex))
                    .map_err(|error| AnalyzerError::pattern(legacy, error))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mined: Vec<MinedRule> = documents
            .iter()
            .flat_map(|(path, text)| mine_rules(text, path))
            .collect();

        let enforced = {
            let mut seen = FxHashSet::default();
            let mut enforced = Vec::new();
            for (index, rule) in mined.iter().enumerate() {
                if !rule.is_avoid() || !seen.insert(rule.pattern.as_str()) {
                    continue;
                }
                let regex = import_pattern(&rule.pattern).map_err(|error| {
                    AnalyzerError::pattern(format!("avoid rule '{}'", rule.pattern), error)
                })?;
                enforced.push((index, regex));
            }
            enforced
        };

        Ok(Self {
            builtins,
            mined,
            enforced,
        })
    }

    /// Reads the configured rule documents under `root` and builds the set.
    ///
    /// Missing documents are skipped.
    pub fn load(root: &Utf8Path, config: &AnalysisConfig) -> Result<Self, AnalyzerError> {
        let documents: Vec<(Utf8PathBuf, String)> = config
            .rule_documents
            .iter()
            .filter_map(|relative| match std::fs::read_to_string(root.join(relative)) {
                Ok(text) => Some((relative.clone(), text)),
                Err(error) => {
                    tracing::debug!(document = %relative, error = %error, "Rule document not read");
                    None
                }
            })
            .collect();
        Self::from_documents(&documents)
    }

    /// Every mined rule, in document order.
    #[must_use]
    pub fn mined(&self) -> &[MinedRule] {
        &self.mined
    }

    /// The enforced avoid rules.
    pub fn avoid_rules(&self) -> impl Iterator<Item = &MinedRule> {
        self.enforced.iter().map(|(index, _)| &self.mined[*index])
    }

    /// Prefer and require rules, which are listed but never enforced.
    pub fn informational(&self) -> impl Iterator<Item = &MinedRule> {
        self.mined.iter().filter(|rule| !rule.is_avoid())
    }

    /// Checks one file against the built-in table and the avoid rules.
    #[must_use]
    pub fn check_file(&self, file: &SourceFile) -> Vec<Criticism> {
        let mut found = Vec::new();

        if let Some((legacy, alternative, line)) = self
            .builtins
            .iter()
            .find_map(|(legacy, alt, regex)| first_match_line(regex, &file.content).map(|line| (legacy, alt, line)))
        {
            found.push(
                Criticism::new(
                    Category::Simplify,
                    format!("replace {legacy} with {alternative}"),
                    format!("{} imports {legacy}. Prefer {alternative}.", file.path),
                    [file.path.clone()],
                    Severity::Low,
                )
                .with_location(SourceLocation::new(&file.path, line)),
            );
        }

        for (index, regex) in &self.enforced {
            let Some(line) = first_match_line(regex, &file.content) else {
                continue;
            };
            let rule = &self.mined[*index];
            let mut description = format!(
                "{} imports {}, which {}:{} says to avoid.",
                file.path, rule.pattern, rule.source, rule.line
            );
            if let RuleKind::Avoid {
                alternative: Some(alt),
            } = &rule.kind
            {
                let _ = write!(description, " Use {alt} instead.");
            }
            found.push(
                Criticism::new(
                    Category::Simplify,
                    format!("avoid {} (per {})", rule.pattern, rule.source),
                    description,
                    [file.path.clone()],
                    Severity::Medium,
                )
                .with_location(SourceLocation::new(&file.path, line)),
            );
        }

        found
    }
}

/// Detector wrapper that reloads the rule documents on every run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleChecker;

impl RuleChecker {
    /// Creates the checker.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Detector for RuleChecker {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Rules
    }

    fn run(&self, ctx: &DetectionContext<'_>) -> Result<DetectorOutput, AnalyzerError> {
        let rules = RuleSet::load(ctx.root, ctx.config)?;
        let mut criticisms = Vec::new();
        let mut examined = 0;
        for file in ctx.targets().filter(|file| file.is_source()) {
            examined += 1;
            criticisms.extend(rules.check_file(file));
        }
        Ok(DetectorOutput::new(criticisms, examined))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const DOC: &str = "\
# Conventions

- Use `dayjs` instead of `moment`.
- Don't use axios; we standardize on fetch.
- Never use enzyme
- Prefer pnpm over npm.
- Always use strict mode.
";

    fn rule_set() -> RuleSet {
        RuleSet::from_documents(&[(Utf8PathBuf::from("CLAUDE.md"), DOC.to_owned())]).unwrap()
    }

    #[test]
    fn test_mine_rules_recognizes_each_form() {
        let rules = mine_rules(DOC, Utf8Path::new("CLAUDE.md"));
        let rendered: Vec<String> = rules.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "avoid moment (use dayjs) [CLAUDE.md:3]",
                "avoid axios [CLAUDE.md:4]",
                "avoid enzyme [CLAUDE.md:5]",
                "prefer pnpm over npm [CLAUDE.md:6]",
                "always use strict [CLAUDE.md:7]",
            ]
        );
    }

    #[test]
    fn test_informational_rules_are_not_enforced() {
        let set = rule_set();
        assert_eq!(set.avoid_rules().count(), 3);
        assert_eq!(set.informational().count(), 2);

        let file = SourceFile::new("src/a.ts", "import npm from 'npm';\nimport strict from 'strict';");
        assert!(set.check_file(&file).is_empty());
    }

    #[test]
    fn test_builtin_stops_at_first_match() {
        let file = SourceFile::new(
            "src/dates.ts",
            "import _ from 'lodash';\nimport moment from \"moment\";\n",
        );
        let found = RuleSet::from_documents(&[]).unwrap().check_file(&file);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject, "replace moment with Intl.DateTimeFormat / date-fns");
        assert_eq!(found[0].location.as_deref(), Some("src/dates.ts:2"));
        assert_eq!(found[0].severity, Severity::Low);
    }

    #[test]
    fn test_mined_violation_names_document() {
        let file = SourceFile::new(
            "src/http.ts",
            "// axios is great\nconst { get } = require( 'axios' );\n",
        );
        let found = rule_set().check_file(&file);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject, "avoid axios (per CLAUDE.md)");
        assert_eq!(found[0].location.as_deref(), Some("src/http.ts:2"));
        assert_eq!(found[0].severity, Severity::Medium);
    }

    #[test]
    fn test_import_pattern_forms() {
        let regex = import_pattern("moment").unwrap();
        assert!(regex.is_match("import moment from 'moment'"));
        assert!(regex.is_match("import 'moment/locale/fr'"));
        assert!(regex.is_match("import {\n  duration,\n} from \"moment\""));
        assert!(regex.is_match("export { default } from 'moment'"));
        assert!(regex.is_match("const m = await import('moment')"));
        assert!(!regex.is_match("import tz from 'moment-timezone'"));
        assert!(!regex.is_match("const moment = 'moment';"));
    }

    #[test]
    fn test_load_skips_missing_documents() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("AGENTS.md"), "Never use `left-pad`.").unwrap();

        let set = RuleSet::load(root, &AnalysisConfig::default()).unwrap();
        let avoid: Vec<_> = set.avoid_rules().collect();
        assert_eq!(avoid.len(), 1);
        assert_eq!(avoid[0].pattern, "left-pad");
        assert_eq!(avoid[0].source, "AGENTS.md");
    }
}

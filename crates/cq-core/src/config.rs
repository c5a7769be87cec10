//! Configuration structures for the critique pipeline.
//!
//! - [`WatchConfig`] - File watcher settings (debouncing, extensions, ignored directories)
//! - [`AnalysisConfig`] - Detector settings (clone window, rule documents)
//! - [`StateConfig`] - Where the criticism store and preference log live
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`]. A project may override any
//! subset of fields in `.critique/config.json`; missing fields keep their
//! defaults.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the configuration file inside the state directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Source code extensions understood by the detectors and the classifier.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "rs", "java", "kt", "rb", "php", "swift",
    "c", "cc", "cpp", "h", "hpp", "cs", "vue", "svelte",
];

/// Directory names that are never watched or analyzed.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "coverage",
    "target",
    ".next",
    ".nuxt",
    ".turbo",
    "__pycache__",
    "vendor",
    ".critique",
];

/// Returns `true` if `ext` (without the leading dot) is a source code extension.
#[inline]
#[must_use]
pub fn is_source_extension(ext: &str) -> bool {
    SOURCE_EXTENSIONS.contains(&ext)
}

/// Returns `true` if `path` follows a test-file naming convention.
///
/// A file is a test when its name contains `.test.` or `.spec.`, or when any
/// directory component is `__tests__`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use cq_core::config::is_test_path;
///
/// assert!(is_test_path(Utf8Path::new("src/app.test.ts")));
/// assert!(is_test_path(Utf8Path::new("src/__tests__/app.ts")));
/// assert!(!is_test_path(Utf8Path::new("src/contest.ts")));
/// ```
#[must_use]
pub fn is_test_path(path: &Utf8Path) -> bool {
    let name = path.file_name().unwrap_or_default();
    name.contains(".test.")
        || name.contains(".spec.")
        || path.components().any(|c| c.as_str() == "__tests__")
}

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use cq_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// assert!(config.extensions.iter().any(|e| e == "md"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    ///
    /// Events on the same path within this window collapse into one.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,

    /// Monitored file extensions (without the leading dot).
    pub extensions: Vec<String>,

    /// Directory names ignored anywhere in a path's component chain.
    pub ignored_dirs: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let mut extensions: Vec<String> = SOURCE_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect();
        extensions.push("json".to_owned());
        extensions.push("md".to_owned());

        Self {
            debounce_ms: 100,
            recursive: true,
            extensions,
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|d| (*d).to_owned()).collect(),
        }
    }
}

/// Configuration for the detectors.
///
/// # Examples
///
/// ```
/// use cq_core::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.clone_window, 6);
/// assert_eq!(config.min_clone_chars, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of lines in one clone-detection window.
    pub clone_window: usize,

    /// Minimum normalized length of a window before it counts as a clone.
    pub min_clone_chars: usize,

    /// Project-relative documents that rules are mined from.
    pub rule_documents: Vec<Utf8PathBuf>,

    /// Directory names skipped when enumerating project files.
    pub skip_dirs: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            clone_window: 6,
            min_clone_chars: 50,
            rule_documents: vec![
                Utf8PathBuf::from("CLAUDE.md"),
                Utf8PathBuf::from("AGENTS.md"),
                Utf8PathBuf::from(".critique/rules.md"),
            ],
            skip_dirs: DEFAULT_IGNORED_DIRS.iter().map(|d| (*d).to_owned()).collect(),
        }
    }
}

/// Location of the persisted pipeline state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// State directory, relative to the project root.
    pub dir: Utf8PathBuf,

    /// File name of the criticism store inside [`dir`](Self::dir).
    pub criticisms_file: String,

    /// File name of the preference log inside [`dir`](Self::dir).
    pub preferences_file: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: Utf8PathBuf::from(".critique"),
            criticisms_file: "criticisms.json".to_owned(),
            preferences_file: "preferences.md".to_owned(),
        }
    }
}

impl StateConfig {
    /// Returns the absolute path of the criticism store for `root`.
    #[must_use]
    pub fn criticisms_path(&self, root: &Utf8Path) -> Utf8PathBuf {
        root.join(&self.dir).join(&self.criticisms_file)
    }

    /// Returns the absolute path of the preference log for `root`.
    #[must_use]
    pub fn preferences_path(&self, root: &Utf8Path) -> Utf8PathBuf {
        root.join(&self.dir).join(&self.preferences_file)
    }
}

/// Root configuration for the critique pipeline.
///
/// # Examples
///
/// ```
/// use cq_core::Config;
///
/// let config = Config::default();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File watcher configuration.
    pub watch: WatchConfig,

    /// Detector configuration.
    pub analysis: AnalysisConfig,

    /// Persisted state locations.
    pub state: StateConfig,
}

impl Config {
    /// Loads the configuration for the project at `root`.
    ///
    /// Reads `<root>/.critique/config.json` when it exists and falls back to
    /// [`Config::default`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`] if the file
    /// exists but cannot be read or parsed, and any error from
    /// [`validate`](Self::validate).
    pub fn load(root: &Utf8Path) -> Result<Self, ConfigError> {
        if !root.is_dir() {
            return Err(ConfigError::MissingDirectory(root.to_owned()));
        }

        let path = root.join(StateConfig::default().dir).join(CONFIG_FILE_NAME);
        if !path.is_file() {
            tracing::debug!(path = %path, "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks option values that serde cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a zero debounce window or
    /// a clone window shorter than two lines.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::invalid_option(
                "watch.debounce_ms",
                "must be greater than zero",
            ));
        }
        if self.analysis.clone_window < 2 {
            return Err(ConfigError::invalid_option(
                "analysis.clone_window",
                "must be at least 2 lines",
            ));
        }
        Ok(())
    }
}

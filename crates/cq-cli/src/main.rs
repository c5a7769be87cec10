//! CLI entry point for critique.
//!
//! This binary wires the watcher, batcher, classifier and analyzers into a
//! command-line tool, and exposes the review operations on the stored
//! worklist.
//!
//! # Usage
//!
//! ```bash
//! critique [OPTIONS] <COMMAND>
//!
//! # Analyze the whole project once
//! critique analyze --path ./my-app
//!
//! # Watch and analyze changes as they settle
//! critique watch
//!
//! # Review the worklist
//! critique list --category simplify
//! critique reject 3f9a0c1d2b4e5f60 --reason "generated code"
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use cq_analyzers::{AnalysisReport, Analyzer, RuleSet, rules::BUILTIN_SUBSTITUTIONS};
use cq_core::{Category, Config, Criticism, generate_criticism_id};
use cq_store::{ReviewOutcome, open_state, review};
use cq_watcher::{
    BatchStats, ChangeAction, DebouncedBatcher, ProjectFilter, ProjectWatcher, WatchBatch,
    WatchEvent, classify,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Continuous code-quality critic.
///
/// Watches a source tree, detects duplicated code, hardcoded secrets,
/// project-rule violations and unused imports, and keeps a reviewable
/// worklist that remembers what you rejected.
#[derive(Parser)]
#[command(name = "critique", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Project root directory.
    #[arg(short, long, global = true, env = "CRITIQUE_PATH", default_value = ".")]
    path: Utf8PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Analyze the whole project once and print a summary.
    Analyze,

    /// Analyze once, then watch for changes and analyze them as they settle.
    Watch,

    /// List stored criticisms.
    List {
        /// Only show this category (elim, simplify, test).
        #[arg(short, long)]
        category: Option<Category>,

        /// Include reviewed criticisms, not only pending ones.
        #[arg(short, long)]
        all: bool,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Accept a criticism and record the decision.
    Accept {
        /// Criticism id.
        id: String,

        /// Why it was accepted.
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Reject a criticism; similar findings are not suggested again.
    Reject {
        /// Criticism id.
        id: String,

        /// Why it was rejected.
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Skip a criticism without recording a preference.
    Skip {
        /// Criticism id.
        id: String,
    },

    /// List the built-in substitutions and the rules mined from project documents.
    Rules,

    /// Print the id a finding would get.
    Id {
        /// Category (elim, simplify, test).
        category: Category,

        /// Subject line.
        subject: String,

        /// Files the finding refers to.
        files: Vec<String>,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// `notify` and `ignore` are filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,globset=warn,ignore=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Resolves the project root and loads its configuration.
///
/// # Errors
///
/// Returns an error if the path is not a directory or the configuration
/// file is invalid.
fn load_project(path: &Utf8Path) -> color_eyre::Result<(Utf8PathBuf, Config)> {
    if !path.is_dir() {
        return Err(eyre!("Path is not a directory: {path}"));
    }
    let root = path
        .canonicalize_utf8()
        .wrap_err_with(|| format!("Failed to resolve {path}"))?;
    let config = Config::load(&root).wrap_err("Failed to load .critique/config.json")?;
    Ok((root, config))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs a one-shot full analysis.
fn run_analyze(root: &Utf8Path, config: &Config) -> color_eyre::Result<()> {
    let analyzer = Analyzer::new(root, config)?;
    let report = analyzer.analyze_project()?;
    print_report(&report, analyzer.store().pending().len())?;
    Ok(())
}

/// Runs the watch loop until ctrl-c or SIGTERM.
async fn run_watch(root: &Utf8Path, config: &Config) -> color_eyre::Result<()> {
    let analyzer = Arc::new(Analyzer::new(root, config)?);

    let initial = {
        let analyzer = Arc::clone(&analyzer);
        tokio::task::spawn_blocking(move || analyzer.analyze_project()).await??
    };
    info!(summary = %initial.summary(), "Initial analysis complete");

    let batcher = DebouncedBatcher::new(Duration::from_millis(config.watch.debounce_ms));
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<WatchEvent>>();
    batcher.on_batch(move |events| {
        // The receiver only goes away during shutdown.
        let _ = tx.send(events);
    });

    let sink = batcher.clone();
    let mut watcher = ProjectWatcher::start(
        root,
        &config.watch,
        ProjectFilter::from_config(&config.watch),
        move |event: WatchEvent| sink.enqueue(event),
    )?;
    if !watcher.is_live() {
        warn!("No live file events; only the initial analysis will run");
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(events) = received else { break };
                handle_batch(&analyzer, config, events).await;
            }
            result = &mut shutdown => {
                result?;
                break;
            }
        }
    }

    watcher.stop();
    batcher.clear();
    info!("Stopped watching");
    Ok(())
}

/// Waits for ctrl-c, or SIGTERM on Unix.
async fn shutdown_signal() -> color_eyre::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

/// Classifies one settled batch and runs the matching analyses.
async fn handle_batch(analyzer: &Arc<Analyzer>, config: &Config, events: Vec<WatchEvent>) {
    let batch = WatchBatch::from(events);
    let stats = BatchStats::from_batch(&batch);
    info!(
        added = stats.added,
        changed = stats.changed,
        removed = stats.removed,
        "Changes settled"
    );

    let mut suggest = Vec::new();
    let mut rules_changed = false;
    for event in &batch {
        let classification = classify(event);
        info!(
            action = %classification.action,
            path = %event.path,
            "{}",
            classification.details
        );
        match classification.action {
            ChangeAction::SuggestTest => suggest.push(event.path.clone()),
            ChangeAction::DocsChanged
                if config.analysis.rule_documents.contains(&event.path) =>
            {
                rules_changed = true;
            }
            _ => {}
        }
    }

    let changed: Vec<Utf8PathBuf> = batch
        .live_paths()
        .into_iter()
        .map(Utf8Path::to_path_buf)
        .collect();
    let worker = Arc::clone(analyzer);
    let result = tokio::task::spawn_blocking(move || {
        let analyzed = if rules_changed {
            worker.analyze_project()?
        } else {
            worker.analyze_changed_files(&changed)?
        };
        let suggested = worker.suggest_tests(&suggest)?;
        Ok::<_, cq_analyzers::AnalyzerError>((analyzed, suggested))
    })
    .await;

    match result {
        Ok(Ok((analyzed, suggested))) => {
            for degraded in &analyzed.degraded {
                warn!(detector = %degraded.kind, error = %degraded.error, "Detector degraded");
            }
            info!(
                summary = %analyzed.summary(),
                test_suggestions = suggested.stored,
                "Incremental analysis complete"
            );
        }
        Ok(Err(err)) => error!(error = %err, "Incremental analysis failed"),
        Err(err) => error!(error = %err, "Analysis task panicked"),
    }
}

/// Lists stored criticisms.
fn run_list(
    root: &Utf8Path,
    config: &Config,
    category: Option<Category>,
    all: bool,
    json: bool,
) -> color_eyre::Result<()> {
    let (store, _) = open_state(root, &config.state);
    let criticisms: Vec<Criticism> = store
        .all()
        .into_iter()
        .filter(|c| all || c.status.is_pending())
        .filter(|c| category.is_none_or(|cat| c.category == cat))
        .collect();

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    if json {
        writeln!(handle, "{}", serde_json::to_string_pretty(&criticisms)?)?;
        return Ok(());
    }

    if criticisms.is_empty() {
        writeln!(handle, "No criticisms.")?;
        return Ok(());
    }
    for c in &criticisms {
        writeln!(
            handle,
            "{}  {:<8} {:<6} {:<8} {}",
            c.id,
            c.category.as_str(),
            c.severity.as_str(),
            c.status.as_str(),
            c.subject
        )?;
        writeln!(handle, "    {}", c.display_location())?;
    }
    if let Some(last) = store.last_analysis() {
        writeln!(handle)?;
        writeln!(handle, "Last analysis: {}", last.to_rfc3339())?;
    }
    Ok(())
}

/// Which review operation to apply.
#[derive(Clone, Copy)]
enum ReviewAction {
    Accept,
    Reject,
    Skip,
}

/// Applies a review operation and prints the outcome.
fn run_review(
    root: &Utf8Path,
    config: &Config,
    action: ReviewAction,
    id: &str,
    reason: Option<String>,
) -> color_eyre::Result<()> {
    let (store, log) = open_state(root, &config.state);
    let (outcome, verb) = match action {
        ReviewAction::Accept => (review::accept(&store, &log, id, reason)?, "Accepted"),
        ReviewAction::Reject => (review::reject(&store, &log, id, reason)?, "Rejected"),
        ReviewAction::Skip => (review::skip(&store, id)?, "Skipped"),
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    match outcome {
        ReviewOutcome::Updated(criticism) => {
            writeln!(handle, "{verb} {}: {}", criticism.id, criticism.subject)?;
            Ok(())
        }
        ReviewOutcome::Unchanged => {
            writeln!(handle, "{id} cannot be moved to that status")?;
            Ok(())
        }
        ReviewOutcome::NotFound => Err(eyre!("No criticism with id {id}")),
    }
}

/// Prints the rule tables.
fn run_rules(root: &Utf8Path, config: &Config) -> color_eyre::Result<()> {
    let rules = RuleSet::load(root, &config.analysis)?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle, "Built-in substitutions")?;
    writeln!(handle, "======================")?;
    for (legacy, alternative) in BUILTIN_SUBSTITUTIONS {
        writeln!(handle, "  {legacy:<12} -> {alternative}")?;
    }

    writeln!(handle)?;
    writeln!(handle, "Enforced project rules")?;
    writeln!(handle, "======================")?;
    let mut any = false;
    for rule in rules.avoid_rules() {
        writeln!(handle, "  {rule}")?;
        any = true;
    }
    if !any {
        writeln!(handle, "  (none)")?;
    }

    writeln!(handle)?;
    writeln!(handle, "Informational rules")?;
    writeln!(handle, "===================")?;
    let mut any = false;
    for rule in rules.informational() {
        writeln!(handle, "  {rule}")?;
        any = true;
    }
    if !any {
        writeln!(handle, "  (none)")?;
    }
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints an analysis summary.
fn print_report(report: &AnalysisReport, pending: usize) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle)?;
    writeln!(handle, "Analysis Summary")?;
    writeln!(handle, "================")?;
    writeln!(handle)?;
    writeln!(handle, "Files read:          {}", report.stats.files_read)?;
    writeln!(handle, "  Unreadable:        {}", report.stats.read_errors)?;
    writeln!(handle, "Duplicated blocks:   {}", report.stats.clones)?;
    writeln!(handle, "Hardcoded secrets:   {}", report.stats.secrets)?;
    writeln!(handle, "Rule violations:     {}", report.stats.rule_violations)?;
    writeln!(handle, "Unused imports:      {}", report.stats.unused_imports)?;
    writeln!(handle)?;
    writeln!(handle, "{}", report.summary())?;
    writeln!(handle, "Pending criticisms:  {pending}")?;

    if !report.degraded.is_empty() {
        let stderr = std::io::stderr();
        let mut err = stderr.lock();
        writeln!(err)?;
        writeln!(err, "Degraded analyzers ({}):", report.degraded.len())?;
        for degraded in &report.degraded {
            writeln!(err, "  {degraded}")?;
        }
    }
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Commands that do not touch the project
    if let Commands::Id {
        category,
        subject,
        files,
    } = &cli.command
    {
        let id = generate_criticism_id(*category, subject, files);
        writeln!(std::io::stdout().lock(), "{id}")?;
        return Ok(());
    }

    // 5. Resolve the project and route to the command
    let (root, config) = load_project(&cli.path)?;
    match cli.command {
        Commands::Analyze => run_analyze(&root, &config),
        Commands::Watch => run_watch(&root, &config).await,
        Commands::List {
            category,
            all,
            json,
        } => run_list(&root, &config, category, all, json),
        Commands::Accept { id, reason } => {
            run_review(&root, &config, ReviewAction::Accept, &id, reason)
        }
        Commands::Reject { id, reason } => {
            run_review(&root, &config, ReviewAction::Reject, &id, reason)
        }
        Commands::Skip { id } => run_review(&root, &config, ReviewAction::Skip, &id, None),
        Commands::Rules => run_rules(&root, &config),
        Commands::Id { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_review_commands() {
        let cli = Cli::try_parse_from(["critique", "reject", "abc123", "--reason", "generated"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Reject { ref id, reason: Some(ref r) } if id == "abc123" && r == "generated"
        ));
        assert_eq!(cli.path, ".");
    }

    #[test]
    fn test_parses_category_filter() {
        let cli = Cli::try_parse_from(["critique", "list", "--category", "simplify", "--all"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List {
                category: Some(Category::Simplify),
                all: true,
                json: false
            }
        ));
        assert!(Cli::try_parse_from(["critique", "list", "--category", "bogus"]).is_err());
    }
}

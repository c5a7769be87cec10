//! Full pipeline runs against a temporary project.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use cq_analyzers::{analyze_changed_files, analyze_project};
use cq_core::{Category, Config, CriticismStatus};
use cq_store::{open_state, review};
use tempfile::TempDir;

const BLOCK: &str = "function sum(xs){return xs.reduce((a,b)=>a+b,0);}";

fn project(files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    (dir, root)
}

fn duplicated_block() -> String {
    vec![BLOCK; 6].join("\n")
}

#[test]
fn duplicate_block_becomes_one_pending_criticism() {
    let block = duplicated_block();
    let (_dir, root) = project(&[("a.ts", &block), ("b.ts", &block)]);
    let config = Config::default();

    let report = analyze_project(&root, &config).unwrap();
    assert!(report.is_complete());

    let (store, _) = open_state(&root, &config.state);
    let pending = store.pending();
    assert_eq!(pending.len(), 1);

    let criticism = &pending[0];
    assert_eq!(criticism.category, Category::Simplify);
    assert_eq!(criticism.subject, "duplicated code block (6+ lines)");
    let files: Vec<&str> = criticism.files.iter().map(|f| f.as_str()).collect();
    assert_eq!(files, ["a.ts", "b.ts"]);
}

#[test]
fn rejection_suppresses_rediscovery() {
    let block = duplicated_block();
    let (_dir, root) = project(&[("a.ts", &block), ("b.ts", &block)]);
    let config = Config::default();
    analyze_project(&root, &config).unwrap();

    let (store, log) = open_state(&root, &config.state);
    let id = store.pending()[0].id.clone();
    let outcome = review::reject(&store, &log, &id, Some("intentional fixture".to_owned())).unwrap();
    assert!(outcome.is_updated());
    assert!(log.was_rejected(Category::Simplify, "duplicated code block (6+ lines)"));

    // A new pair with the same subject is dropped instead of stored.
    fs::write(root.join("c.ts"), &block).unwrap();
    fs::remove_file(root.join("a.ts")).unwrap();
    let report = analyze_project(&root, &config).unwrap();

    assert_eq!(report.suppressed, 1);
    assert!(store.pending().is_empty());
    assert_eq!(store.get(&id).unwrap().status, CriticismStatus::Rejected);
}

#[test]
fn incremental_run_reports_only_changed_files() {
    let secret = "const apiKey = \"sk-ant-REDACTED\";\n";
    let (_dir, root) = project(&[
        ("src/config.ts", secret),
        ("src/client.ts", "import { unused } from './lib';\nexport const x = 1;\n"),
    ]);
    let config = Config::default();

    let report = analyze_changed_files(&root, &[Utf8PathBuf::from("src/config.ts")], &config).unwrap();
    assert_eq!(report.stats.secrets, 1);
    assert_eq!(report.stats.unused_imports, 0);

    let (store, _) = open_state(&root, &config.state);
    let elim = store.by_category(Category::Elim);
    assert_eq!(elim.len(), 1);
    assert_eq!(elim[0].subject, "hardcoded Anthropic API key");
    assert_eq!(elim[0].location.as_deref(), Some("src/config.ts:1"));
}

#[test]
fn rule_document_violation_names_its_source() {
    let (_dir, root) = project(&[
        ("CLAUDE.md", "# Rules\n\nUse `zod` instead of `yup`.\n"),
        ("src/form.ts", "import * as yup from 'yup';\nexport const schema = yup.object();\n"),
    ]);
    let config = Config::default();
    analyze_project(&root, &config).unwrap();

    let (store, _) = open_state(&root, &config.state);
    let subjects: Vec<String> = store.pending().into_iter().map(|c| c.subject).collect();
    assert_eq!(subjects, ["avoid yup (per CLAUDE.md)"]);
}

//! Core types, errors, and configuration for the critique pipeline.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`Criticism`] and its [`Category`], [`Severity`] and [`CriticismStatus`]
//! - [`PreferenceEntry`] and [`Decision`] for the review log
//! - [`generate_criticism_id`], the single source of criticism identities
//! - Configuration structures ([`Config`], [`WatchConfig`], [`AnalysisConfig`])
//! - Type aliases for `FxHashMap`/`FxHashSet` and the clone-detection hash
//!
//! # Crate Dependencies
//!
//! ```text
//! cq-cli ──► cq-analyzers ──► cq-store ──► cq-core
//!        └─► cq-watcher ────────────────►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{AnalysisConfig, Config, StateConfig, WatchConfig};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set, polynomial_hash, to_base36};
pub use types::{
    Category, Criticism, CriticismStatus, Decision, PreferenceEntry, Severity, SourceLocation,
    generate_criticism_id,
};

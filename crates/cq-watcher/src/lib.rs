//! Project watching, debounced batching, and change classification.
//!
//! This crate is the front half of the critique pipeline. It turns raw
//! filesystem notifications into settled, classified changes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── notify thread ────────────────────────────┐
//! │  RecommendedWatcher ──► ProjectWatcher (filter, stat, seen set)       │
//! │                              │ EventSink::deliver(WatchEvent)         │
//! └──────────────────────────────│────────────────────────────────────────┘
//!                                ▼
//! ┌──────────────────────────── tokio runtime ────────────────────────────┐
//! │  DebouncedBatcher (per-path last write wins, 100ms quiet window)      │
//! │                              │ on_batch(Vec<WatchEvent>)              │
//! │                              ▼                                        │
//! │  classify(&WatchEvent) ──► Classification { action, details }         │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! cq-cli ──► cq-analyzers ──► cq-store ──► cq-core
//!        └─► cq-watcher ────────────────►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use camino::Utf8Path;
//! use cq_core::WatchConfig;
//! use cq_watcher::{classify, DebouncedBatcher, ProjectFilter, ProjectWatcher, WatchEvent};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WatchConfig::default();
//! let batcher = DebouncedBatcher::new(Duration::from_millis(config.debounce_ms));
//! batcher.on_batch(|events| {
//!     for event in &events {
//!         let c = classify(event);
//!         println!("{} {} -> {}", event.kind, event.path, c.action);
//!     }
//! });
//!
//! let sink = batcher.clone();
//! let mut watcher = ProjectWatcher::start(
//!     Utf8Path::new("."),
//!     &config,
//!     ProjectFilter::from_config(&config),
//!     move |event: WatchEvent| sink.enqueue(event),
//! )?;
//!
//! tokio::signal::ctrl_c().await?;
//! watcher.stop();
//! batcher.clear();
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Only [`ProjectWatcher::start`] can fail, and only when the root is
//! missing or unreadable. A platform without recursive watching degrades to
//! cold-scan-only with a single warning.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod batcher;
pub mod classifier;
pub mod error;
pub mod events;
pub mod filter;
pub mod watcher;

pub use batcher::{BatchHandler, DebouncedBatcher};
pub use classifier::{ChangeAction, Classification, classify};
pub use error::WatchError;
pub use events::{BatchStats, WatchBatch, WatchEvent, WatchEventKind};
pub use filter::{AcceptAllFilter, FileFilter, ProjectFilter};
pub use watcher::{EventSink, ProjectWatcher};

//! Persisted state for the critique pipeline.
//!
//! - [`CriticismStore`] - the JSON worklist of criticisms, upserted by id
//! - [`PreferenceLog`] - the markdown log of accepted and rejected findings
//! - [`review`] - accept, reject and skip operations shared by every surface
//!
//! Both files live in the project's state directory (`.critique/` by
//! default). Reads are forgiving: a missing or malformed file is treated as
//! empty. Writes return [`StoreError`].

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod preferences;
pub mod review;
pub mod store;

pub use error::StoreError;
pub use preferences::{PreferenceLog, parse_preferences};
pub use review::ReviewOutcome;
pub use store::{CriticismStore, StoreDocument};

use camino::Utf8Path;
use cq_core::StateConfig;

/// Opens the store and preference log for the project at `root`.
#[must_use]
pub fn open_state(root: &Utf8Path, state: &StateConfig) -> (CriticismStore, PreferenceLog) {
    (
        CriticismStore::open(state.criticisms_path(root)),
        PreferenceLog::open(state.preferences_path(root)),
    )
}

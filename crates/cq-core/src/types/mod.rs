//! Domain types for the critique pipeline.
//!
//! # Module Organization
//!
//! - [`criticism`] - Criticisms, their categories, severities and review status
//! - [`location`] - Source positions rendered as `path:line`
//! - [`preference`] - Accept/reject decisions recorded in the preference log
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use cq_core::{Category, Criticism, CriticismStatus, Severity};
//! ```

mod criticism;
mod location;
mod preference;

pub use criticism::{Category, Criticism, CriticismStatus, Severity, generate_criticism_id};
pub use location::SourceLocation;
pub use preference::{Decision, PreferenceEntry};

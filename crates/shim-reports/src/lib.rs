//! Report directories and placeholder files for CI log scrapers.
//!
//! [`ArtifactWriter::ensure`] creates whatever part of a [`ReportLayout`] is
//! missing and reports a per-artifact outcome instead of failing the run.

mod discover;
pub mod layout;
pub mod render;
mod writer;

pub use discover::discover;
pub use layout::{ArtifactKind, ArtifactSpec, ReportLayout};
pub use render::{render_html, render_json, render_junit, ReportContext};
pub use writer::{
    write_failure_marker, ArtifactWriter, EnsureEntry, EnsureOutcome, EnsureReport,
    FAILURE_MARKER,
};

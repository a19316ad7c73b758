//! Parameterized path matching without a third-party router.
//!
//! ```
//! use shim_core::RouteMatcher;
//! use shim_routes::{MatchOptions, PatternMatcher};
//!
//! let matcher = PatternMatcher::new(MatchOptions::default());
//! let hit = matcher.match_path("/api/agent/:id", "/api/agent/a1").unwrap().unwrap();
//! assert_eq!(hit.params["id"], "a1");
//! ```

mod matcher;
pub mod pattern;

pub use matcher::{MatchOptions, PatternMatcher};
pub use pattern::{parameter_names, parse, Modifier, Token};

use shim_core::{Result, RouteMatch, RouteMatcher};
use std::collections::BTreeMap;

/// Match with default options (case-insensitive, non-strict, full match)
pub fn match_path(pattern: &str, path: &str) -> Result<Option<RouteMatch>> {
    PatternMatcher::default().match_path(pattern, path)
}

/// Build a path with default options
pub fn compile_path(pattern: &str, params: &BTreeMap<String, String>) -> Result<String> {
    PatternMatcher::default().compile_path(pattern, params)
}

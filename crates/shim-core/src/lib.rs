//! Core types and seams shared by every cishim crate.
//!
//! The classifier in [`detect`] never touches the process directly: it reads
//! through the [`EnvSource`] and [`FileProbe`] traits, so callers can swap in
//! [`StaticEnv`] / [`StaticFs`] (or a [`HostFixture`] loaded from TOML) without
//! changing any call site.

pub mod detect;
pub mod error;
pub mod host;
pub mod models;
pub mod traits;

pub use detect::{classify, detect};
pub use error::{Result, ShimError};
pub use host::{HostFixture, HostFs, ProcessEnv, StaticEnv, StaticFs};
pub use models::*;
pub use traits::{EnvSource, FileProbe, RouteMatcher};

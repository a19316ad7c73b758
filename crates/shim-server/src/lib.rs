//! Fallback HTTP responders and port discovery
//!
//! When the real backend of a test run is unavailable, [`ResponderApp`] answers
//! a fixed set of URL prefixes with canned JSON:
//!
//! ```text
//! GET /health      -> {"status":"ok"}
//! GET /api/status  -> {"status":"ok","mode":"fallback"}
//! GET /api/agent   -> {"status":"ok","agent":"fallback","ready":true}
//! ```
//!
//! Replies come from a [`Manifest`]; [`Manifest::builtin`] is the default set
//! and a TOML manifest can add or override entries.

mod manifest;
mod ports;
mod responder;

pub use manifest::{Manifest, ManifestError, MatchKind, ResponseMapping};
pub use ports::{
    bind_first_free, find_free_port, probe_ports, wait_until_ready, PollPolicy, ReadyReport,
    DEFAULT_CANDIDATE_PORTS,
};
pub use responder::{
    read_request_log, serve, shutdown_signal, CannedReply, RequestLogEntry, ResponderApp,
};

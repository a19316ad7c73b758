//! Structured logging for the `cishim` binary
//!
//! Logs always go to stderr so that `--format json` output on stdout stays
//! machine-readable. When `RUST_LOG` is set it wins over the configured level.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Crates whose events the configured level applies to
const OWN_TARGETS: &[&str] = &["cishim", "shim_core", "shim_routes", "shim_reports", "shim_server"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// One JSON object per line instead of human-readable output
    pub use_json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            use_json: false,
        }
    }
}

/// Parse a level name case-insensitively; unknown names fall back to WARN
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to WARN. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::WARN
        }
    }
}

fn build_filter(level: Level) -> EnvFilter {
    build_filter_from(level, std::env::var("RUST_LOG").ok().as_deref())
}

/// An explicit `RUST_LOG` replaces the configured level entirely
fn build_filter_from(level: Level, rust_log: Option<&str>) -> EnvFilter {
    if let Some(spec) = rust_log.filter(|s| !s.trim().is_empty()) {
        return EnvFilter::new(spec);
    }

    let mut filter = EnvFilter::new("");
    for target in OWN_TARGETS {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }
    for noisy in ["hyper=warn", "axum=warn", "ureq=warn", "rustls=warn"] {
        if let Ok(directive) = noisy.parse() {
            filter = filter.add_directive(directive);
        }
    }

    filter
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_ansi(colored::control::SHOULD_COLORIZE.should_colorize()),
                )
                .init();
        }
    });
}

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cishim",
    version,
    about = "CI compatibility shims: environment detection, report placeholders, fallback responders"
)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'o', value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// When to colorize output
    #[arg(long, value_enum, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a TOML config file
    #[arg(long, env = "CISHIM_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); logs go to stderr
    #[arg(long, env = "CISHIM_LOG_LEVEL", global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(
        long,
        env = "CISHIM_LOG_JSON",
        global = true,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Debug, Copy, Default)]
pub enum ColorChoice {
    /// Colorize output if stdout is a terminal or the CI forces color
    #[default]
    Auto,
    /// Always colorize output
    Always,
    /// Never colorize output
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify the execution environment (OS, CI vendor, container, cloud)
    #[command(visible_alias = "e")]
    Env {
        /// Classify a host described in a TOML fixture instead of this process
        #[arg(long, value_name = "PATH")]
        fixture: Option<PathBuf>,

        /// Show which variables and sentinel files decided each facet
        #[arg(long)]
        evidence: bool,
    },
    /// Report directories and placeholder report files
    #[command(visible_alias = "r")]
    Reports {
        #[command(subcommand)]
        action: ReportCommands,
    },
    /// Route pattern matching (`/users/:id`)
    Routes {
        #[command(subcommand)]
        action: RouteCommands,
    },
    /// Serve canned JSON replies on the first free candidate port
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Candidate port, tried in order (repeatable; 0 lets the OS choose)
        #[arg(long = "port", short = 'p', value_name = "PORT")]
        ports: Vec<u16>,

        /// TOML response manifest with extra or overriding replies
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,

        /// Do not include the built-in replies (/health, /api/status, ...)
        #[arg(long)]
        no_builtin: bool,

        /// Append one JSON line per request to this file
        #[arg(long, value_name = "PATH")]
        log_requests: Option<PathBuf>,
    },
    /// Port discovery and readiness polling
    Ports {
        #[command(subcommand)]
        action: PortCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Generate shell completions and write to stdout
    pub fn generate_completions(shell: Shell) {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "cishim", &mut std::io::stdout());
    }
}

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Create any missing report directory or placeholder file
    Ensure {
        /// Directory the report layout is relative to
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Suite name written into the placeholders
        #[arg(long)]
        suite: Option<String>,

        /// Exit with an error if any artifact could not be ensured
        #[arg(long)]
        strict: bool,
    },
    /// List report artifacts that already exist
    #[command(visible_alias = "ls")]
    List {
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RouteCommands {
    /// Match a path against a pattern and print the extracted parameters
    Match {
        pattern: String,
        path: String,

        /// Case-sensitive matching
        #[arg(long)]
        sensitive: bool,

        /// Do not tolerate a trailing slash
        #[arg(long)]
        strict: bool,

        /// Match a prefix of the path (on a segment boundary)
        #[arg(long)]
        prefix: bool,
    },
    /// Build a path from a pattern and KEY=VALUE parameters
    Compile {
        pattern: String,

        #[arg(value_parser = parse_key_val, value_name = "KEY=VALUE")]
        params: Vec<(String, String)>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PortCommands {
    /// Print the first free candidate port
    Free {
        #[arg(long)]
        host: Option<String>,

        #[arg(long = "port", short = 'p', value_name = "PORT")]
        ports: Vec<u16>,
    },
    /// Poll a URL until it answers 2xx
    Wait {
        url: String,

        #[command(flatten)]
        poll: PollArgs,
    },
    /// Poll candidate ports until one serves a health path
    Probe {
        #[arg(long)]
        host: Option<String>,

        #[arg(long = "port", short = 'p', value_name = "PORT")]
        ports: Vec<u16>,

        /// Health path to request on each port
        #[arg(long, default_value = "/health")]
        path: String,

        #[command(flatten)]
        poll: PollArgs,
    },
}

/// Overrides for the configured polling policy
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PollArgs {
    /// Milliseconds between attempts
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Maximum number of attempts
    #[arg(long, value_name = "N")]
    pub attempts: Option<u32>,

    /// Per-request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

use crate::cli::{ColorChoice, OutputFormat};
use colored::Colorize;
use serde::Serialize;
use shim_core::{EnvironmentDescriptor, RouteMatch};
use shim_reports::{EnsureOutcome, EnsureReport};
use shim_server::ReadyReport;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Initialize color mode based on CLI choice and environment.
///
/// In `auto` mode `NO_COLOR` wins, then `FORCE_COLOR` / `CLICOLOR_FORCE`
/// (CI log viewers render ANSI even though stdout is a pipe), then the tty check.
pub fn init_color(choice: ColorChoice) {
    let should_color = match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            if std::env::var_os("NO_COLOR").is_some() {
                false
            } else if forced_by_env() {
                true
            } else {
                std::io::stdout().is_terminal()
            }
        }
    };

    colored::control::set_override(should_color);
}

fn forced_by_env() -> bool {
    ["FORCE_COLOR", "CLICOLOR_FORCE"].iter().any(|var| {
        std::env::var(var)
            .map(|v| !v.is_empty() && v != "0" && v != "false")
            .unwrap_or(false)
    })
}

pub fn output_result<T: Serialize + Displayable>(result: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(result) {
                println!("{}", json);
            }
        }
        OutputFormat::Text => {
            println!("{}", result.display());
        }
    }
}

pub fn output_list<T: Serialize + Displayable>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
        OutputFormat::Text => {
            for item in items {
                println!("{}", item.display());
            }
        }
    }
}

#[derive(Serialize)]
pub struct JsonError {
    pub error: bool,
    pub code: String,
    pub message: String,
}

pub fn output_error(err: &anyhow::Error, format: OutputFormat) {
    let message = match format {
        OutputFormat::Json => {
            let json_err = JsonError {
                error: true,
                code: error_code(err).to_string(),
                message: format!("{:#}", err),
            };
            serde_json::to_string_pretty(&json_err)
                .unwrap_or_else(|_| format!(r#"{{"error": true, "message": "{}"}}"#, err))
        }
        OutputFormat::Text => format!("{}: {:#}", "Error".red().bold(), err),
    };
    eprintln!("{}", message);
}

/// Stable machine-readable code for the root cause
fn error_code(err: &anyhow::Error) -> &'static str {
    use shim_core::ShimError;

    match err.chain().find_map(|e| e.downcast_ref::<ShimError>()) {
        Some(ShimError::Io(_)) => "io",
        Some(ShimError::Parse(_)) => "parse",
        Some(ShimError::InvalidPattern { .. }) => "invalid_pattern",
        Some(ShimError::MissingParam(_)) | Some(ShimError::InvalidParam { .. }) => "invalid_params",
        Some(ShimError::NoFreePort(_)) => "no_free_port",
        Some(ShimError::NotReady { .. }) => "not_ready",
        Some(ShimError::Http(_)) => "http",
        None => "error",
    }
}

pub trait Displayable {
    fn display(&self) -> String;
}

fn flag(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".dimmed().to_string()
    }
}

/// Descriptor plus whether text output lists the evidence
#[derive(Serialize)]
pub struct EnvView<'a> {
    #[serde(flatten)]
    pub descriptor: &'a EnvironmentDescriptor,
    #[serde(skip)]
    pub show_evidence: bool,
}

impl Displayable for EnvView<'_> {
    fn display(&self) -> String {
        let d = self.descriptor;
        let vendor = if d.ci {
            d.ci_vendor.as_str().cyan().bold().to_string()
        } else {
            d.ci_vendor.as_str().dimmed().to_string()
        };

        let mut output = format!(
            "{}: {} ({})\n{}: {} {}\n{}: {}\n{}: {}\n{}: {}",
            "OS".dimmed(),
            d.os.as_str().white().bold(),
            d.arch,
            "CI".dimmed(),
            flag(d.ci),
            vendor,
            "Container".dimmed(),
            d.container.as_str().yellow(),
            "Kubernetes".dimmed(),
            flag(d.in_kubernetes),
            "Cloud".dimmed(),
            d.cloud.as_str().magenta(),
        );

        if self.show_evidence && !d.evidence.is_empty() {
            output.push_str(&format!("\n{}:", "Evidence".dimmed()));
            for ev in &d.evidence {
                output.push_str(&format!("\n  {:<9} {}", ev.facet.as_str(), ev.source));
            }
        }

        output
    }
}

impl Displayable for EnsureReport {
    fn display(&self) -> String {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|entry| {
                let (label, reason) = match &entry.outcome {
                    EnsureOutcome::Created => ("created".green().to_string(), None),
                    EnsureOutcome::AlreadyPresent => ("present".dimmed().to_string(), None),
                    EnsureOutcome::Failed(reason) => ("failed".red().bold().to_string(), Some(reason)),
                };
                let mut line = format!("{:<8} {}", label, entry.path.display());
                if let Some(reason) = reason {
                    line.push_str(&format!(" ({})", reason));
                }
                line
            })
            .collect();

        lines.push(format!(
            "{} created, {} already present, {} failed",
            self.created(),
            self.already_present(),
            self.failed()
        ));
        lines.join("\n")
    }
}

impl Displayable for RouteMatch {
    fn display(&self) -> String {
        let mut output = format!("{} {}", "matched".green(), self.path.white().bold());
        for (name, value) in &self.params {
            output.push_str(&format!("\n  {}: {}", name.cyan(), value));
        }
        output
    }
}

impl Displayable for ReadyReport {
    fn display(&self) -> String {
        format!(
            "{} {} ({} after {} attempt{}, {}ms)",
            "ready".green().bold(),
            self.url,
            self.status,
            self.attempts,
            if self.attempts == 1 { "" } else { "s" },
            self.elapsed_ms
        )
    }
}

#[derive(Serialize)]
pub struct ArtifactPath {
    pub path: PathBuf,
}

impl Displayable for ArtifactPath {
    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Serialize)]
pub struct CompiledPath {
    pub path: String,
}

impl Displayable for CompiledPath {
    fn display(&self) -> String {
        self.path.clone()
    }
}

#[derive(Serialize)]
pub struct FreePort {
    pub host: String,
    pub port: u16,
}

impl Displayable for FreePort {
    fn display(&self) -> String {
        self.port.to_string()
    }
}

#[derive(Serialize)]
pub struct ProbeResult {
    pub port: u16,
    #[serde(flatten)]
    pub ready: ReadyReport,
}

impl Displayable for ProbeResult {
    fn display(&self) -> String {
        format!("{}: {}\n{}", "Port".dimmed(), self.port, self.ready.display())
    }
}

#[derive(Serialize)]
pub struct Listening {
    pub address: String,
    pub url: String,
    pub port: u16,
}

impl Displayable for Listening {
    fn display(&self) -> String {
        format!("Listening on {}", self.url)
    }
}

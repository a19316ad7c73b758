use crate::cli::{OutputFormat, ReportCommands};
use crate::config::Config;
use crate::output::{output_list, output_result, ArtifactPath};
use anyhow::{bail, Result};
use shim_core::detect;
use shim_reports::{discover, write_failure_marker, ArtifactWriter, EnsureOutcome, ReportContext};
use std::path::Path;
use tracing::warn;

pub fn handle_reports(action: &ReportCommands, config: &Config, format: OutputFormat) -> Result<()> {
    match action {
        ReportCommands::Ensure {
            root,
            suite,
            strict,
        } => handle_ensure(config, root.as_deref(), suite.as_deref(), *strict, format),
        ReportCommands::List { root } => {
            let root = root.as_deref().unwrap_or(&config.reports.root);
            handle_list(root, format)
        }
    }
}

fn handle_ensure(
    config: &Config,
    root: Option<&Path>,
    suite: Option<&str>,
    strict: bool,
    format: OutputFormat,
) -> Result<()> {
    let layout = config.reports.layout(root);
    let context = ReportContext::new(suite.unwrap_or(&config.reports.suite)).with_environment(detect());
    let report = ArtifactWriter::new(context).ensure(&layout);

    if !report.all_ok() {
        let failures: Vec<String> = report
            .entries
            .iter()
            .filter_map(|entry| match &entry.outcome {
                EnsureOutcome::Failed(reason) => Some(format!("{}: {}", entry.path.display(), reason)),
                _ => None,
            })
            .collect();
        if write_failure_marker(&layout.root, &failures.join("; ")).is_none() {
            warn!(root = %layout.root.display(), "failure marker not written");
        }
    }

    output_result(&report, format);

    if strict && !report.all_ok() {
        bail!("{} report artifact(s) could not be ensured", report.failed());
    }
    Ok(())
}

fn handle_list(root: &Path, format: OutputFormat) -> Result<()> {
    let found: Vec<ArtifactPath> = discover(root)
        .into_iter()
        .map(|path| ArtifactPath { path })
        .collect();

    output_list(&found, format);
    Ok(())
}

//! Idempotent "make sure this artifact exists" operations
//!
//! Existing artifacts are never touched. Failures are recorded per artifact
//! and logged; they never stop the remaining artifacts from being ensured.

use crate::layout::{ArtifactKind, ArtifactSpec, ReportLayout};
use crate::render::{render_html, render_json, render_junit, ReportContext};
use chrono::Utc;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const FAILURE_MARKER: &str = "shim-error.txt";

/// What happened to a single artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "kebab-case")]
pub enum EnsureOutcome {
    Created,
    AlreadyPresent,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct EnsureEntry {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: EnsureOutcome,
}

/// Per-artifact outcomes of one [`ArtifactWriter::ensure`] run
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnsureReport {
    pub entries: Vec<EnsureEntry>,
}

impl EnsureReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, EnsureOutcome::Created))
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, EnsureOutcome::AlreadyPresent))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EnsureOutcome::Failed(_)))
    }

    pub fn all_ok(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&EnsureOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}

/// Creates missing report directories and placeholder files
#[derive(Debug, Clone, Default)]
pub struct ArtifactWriter {
    context: ReportContext,
}

impl ArtifactWriter {
    pub fn new(context: ReportContext) -> Self {
        Self { context }
    }

    /// Ensure every artifact of `layout` exists
    pub fn ensure(&self, layout: &ReportLayout) -> EnsureReport {
        let entries = layout
            .artifacts()
            .into_iter()
            .map(|spec| {
                let outcome = self.ensure_one(&spec);
                match &outcome {
                    EnsureOutcome::Created => info!(path = %spec.path.display(), "created report artifact"),
                    EnsureOutcome::AlreadyPresent => debug!(path = %spec.path.display(), "report artifact already present"),
                    EnsureOutcome::Failed(reason) => {
                        warn!(path = %spec.path.display(), %reason, "failed to ensure report artifact")
                    }
                }
                EnsureEntry {
                    kind: spec.kind,
                    path: spec.path,
                    outcome,
                }
            })
            .collect();

        EnsureReport { entries }
    }

    /// Ensure a single artifact exists
    pub fn ensure_one(&self, spec: &ArtifactSpec) -> EnsureOutcome {
        match spec.kind {
            ArtifactKind::Dir => ensure_dir(&spec.path),
            ArtifactKind::Html => ensure_file(&spec.path, &render_html(&self.context)),
            ArtifactKind::JunitXml => ensure_file(&spec.path, &render_junit(&self.context)),
            ArtifactKind::Json => ensure_file(&spec.path, &render_json(&self.context)),
        }
    }
}

fn ensure_dir(path: &Path) -> EnsureOutcome {
    if path.is_dir() {
        return EnsureOutcome::AlreadyPresent;
    }
    if path.exists() {
        return EnsureOutcome::Failed(format!("{} exists and is not a directory", path.display()));
    }

    match std::fs::create_dir_all(path) {
        Ok(()) => EnsureOutcome::Created,
        Err(e) => EnsureOutcome::Failed(e.to_string()),
    }
}

fn ensure_file(path: &Path, content: &str) -> EnsureOutcome {
    if path.is_file() {
        return EnsureOutcome::AlreadyPresent;
    }
    if path.exists() {
        return EnsureOutcome::Failed(format!("{} exists and is not a file", path.display()));
    }

    match write_new(path, content) {
        Ok(()) => EnsureOutcome::Created,
        // lost a race with another writer
        Err(_) if path.is_file() => EnsureOutcome::AlreadyPresent,
        Err(e) => EnsureOutcome::Failed(e.to_string()),
    }
}

/// Write through a temp sibling and publish with a no-clobber rename
fn write_new(path: &Path, content: &str) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut tmp = NamedTempFile::new_in(&parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}

/// Best-effort marker recording why a step failed; returns the marker path on success
pub fn write_failure_marker(dir: &Path, message: &str) -> Option<PathBuf> {
    let path = dir.join(FAILURE_MARKER);
    let body = format!("{} {}\n", Utc::now().to_rfc3339(), message);

    let result = std::fs::create_dir_all(dir).and_then(|_| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(body.as_bytes()))
    });

    match result {
        Ok(()) => Some(path),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not write failure marker");
            None
        }
    }
}

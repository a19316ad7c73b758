use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Glob patterns (relative to the root) that count as report artifacts
const REPORT_GLOBS: &[&str] = &[
    "**/junit*.xml",
    "**/*results*.json",
    "**/playwright-report/index.html",
    "test-results/**/*",
];

/// Existing report artifacts under `root`, sorted and de-duplicated
pub fn discover(root: &Path) -> Vec<PathBuf> {
    let base = glob::Pattern::escape(&root.to_string_lossy());
    let mut found = BTreeSet::new();

    for pattern in REPORT_GLOBS {
        let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
        let entries = match glob::glob(&full) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(pattern = %full, error = %e, "skipping invalid report glob");
                continue;
            }
        };

        for path in entries.flatten() {
            if path.is_file() {
                found.insert(path);
            }
        }
    }

    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArtifactWriter, ReportLayout};
    use tempfile::tempdir;

    #[test]
    fn test_discover_empty_root() {
        let dir = tempdir().unwrap();
        assert!(discover(dir.path()).is_empty());
    }

    #[test]
    fn test_discover_finds_ensured_files() {
        let dir = tempdir().unwrap();
        ArtifactWriter::default().ensure(&ReportLayout::default_under(dir.path()));
        std::fs::write(dir.path().join("test-results/trace.zip"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let found = discover(dir.path());
        assert_eq!(
            found,
            vec![
                dir.path().join("junit-results.xml"),
                dir.path().join("playwright-report/index.html"),
                dir.path().join("test-results/trace.zip"),
                dir.path().join("test-results.json"),
            ]
        );
    }
}

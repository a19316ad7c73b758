//! Which report artifacts exist and where

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_HTML: &str = "playwright-report/index.html";
pub const DEFAULT_JUNIT: &str = "junit-results.xml";
pub const DEFAULT_JSON: &str = "test-results.json";
pub const DEFAULT_DIRS: &[&str] = &["playwright-report", "test-results"];

/// Kind of artifact to ensure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Dir,
    Html,
    JunitXml,
    Json,
}

/// One artifact and its absolute or root-relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// The full set of report artifacts under a root directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLayout {
    pub root: PathBuf,
    pub dirs: Vec<PathBuf>,
    pub html: PathBuf,
    pub junit: PathBuf,
    pub json: PathBuf,
}

impl ReportLayout {
    /// The conventional Playwright/JUnit layout under `root`
    pub fn default_under(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dirs: DEFAULT_DIRS.iter().map(PathBuf::from).collect(),
            html: PathBuf::from(DEFAULT_HTML),
            junit: PathBuf::from(DEFAULT_JUNIT),
            json: PathBuf::from(DEFAULT_JSON),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        // absolute paths replace the root on join
        self.root.join(path)
    }

    /// Artifacts in creation order: directories first, then files
    pub fn artifacts(&self) -> Vec<ArtifactSpec> {
        let mut specs: Vec<ArtifactSpec> = self
            .dirs
            .iter()
            .map(|dir| ArtifactSpec {
                kind: ArtifactKind::Dir,
                path: self.resolve(dir),
            })
            .collect();

        specs.push(ArtifactSpec {
            kind: ArtifactKind::Html,
            path: self.resolve(&self.html),
        });
        specs.push(ArtifactSpec {
            kind: ArtifactKind::JunitXml,
            path: self.resolve(&self.junit),
        });
        specs.push(ArtifactSpec {
            kind: ArtifactKind::Json,
            path: self.resolve(&self.json),
        });

        specs
    }
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self::default_under(".")
    }
}

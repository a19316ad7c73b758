//! Implementations of the host seams.
//!
//! [`ProcessEnv`] and [`HostFs`] read the real process; [`StaticEnv`] and
//! [`StaticFs`] are in-memory substitutes. A [`HostFixture`] describes a whole
//! host in TOML:
//!
//! ```toml
//! os = "linux"
//! arch = "x86_64"
//!
//! [env]
//! GITHUB_ACTIONS = "true"
//!
//! [files]
//! "/.dockerenv" = ""
//! ```

use crate::error::{Result, ShimError};
use crate::traits::{EnvSource, FileProbe};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variables of the running process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// The real host filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFs;

impl FileProbe for HostFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }
}

/// Fixed set of environment variables
#[derive(Debug, Default, Clone)]
pub struct StaticEnv {
    vars: HashMap<String, String>,
}

impl StaticEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Fixed set of files keyed by absolute path
#[derive(Debug, Default, Clone)]
pub struct StaticFs {
    files: HashMap<PathBuf, String>,
}

impl StaticFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl FileProbe for StaticFs {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
        self.files.get(path).cloned()
    }
}

/// A described host: OS, architecture, environment and sentinel files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostFixture {
    /// OS name in `std::env::consts::OS` form; defaults to the running OS
    #[serde(default)]
    pub os: Option<String>,

    /// Architecture; defaults to the running architecture
    #[serde(default)]
    pub arch: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Sentinel file path -> contents
    #[serde(default)]
    pub files: HashMap<String, String>,
}

impl HostFixture {
    /// Load a fixture from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShimError::Io(format!("Failed to read host fixture {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ShimError::Parse(format!("Failed to parse host fixture {}: {}", path.display(), e))
        })
    }

    pub fn os(&self) -> &str {
        self.os.as_deref().unwrap_or(std::env::consts::OS)
    }

    pub fn arch(&self) -> &str {
        self.arch.as_deref().unwrap_or(std::env::consts::ARCH)
    }

    pub fn env_source(&self) -> StaticEnv {
        self.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn file_probe(&self) -> StaticFs {
        self.files
            .iter()
            .fold(StaticFs::new(), |fs, (path, content)| {
                fs.with(PathBuf::from(path), content.clone())
            })
    }
}

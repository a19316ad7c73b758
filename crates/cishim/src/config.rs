use crate::cli::PollArgs;
use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use shim_reports::ReportLayout;
use shim_server::{PollPolicy, DEFAULT_CANDIDATE_PORTS};
use std::path::{Path, PathBuf};

/// Top-level configuration, layered defaults -> TOML -> `CISHIM_*` env
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReportsConfig {
    pub root: PathBuf,
    pub suite: String,
    pub html: PathBuf,
    pub junit: PathBuf,
    pub json: PathBuf,
    pub dirs: Vec<PathBuf>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        let layout = ReportLayout::default();
        Self {
            root: layout.root,
            suite: "placeholder".to_string(),
            html: layout.html,
            junit: layout.junit,
            json: layout.json,
            dirs: layout.dirs,
        }
    }
}

impl ReportsConfig {
    /// Layout rooted at `root`, or at the configured root
    pub fn layout(&self, root: Option<&Path>) -> ReportLayout {
        ReportLayout {
            root: root.map(Path::to_path_buf).unwrap_or_else(|| self.root.clone()),
            dirs: self.dirs.clone(),
            html: self.html.clone(),
            junit: self.junit.clone(),
            json: self.json.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub ports: Vec<u16>,
    pub manifest: Option<PathBuf>,
    pub request_log: Option<PathBuf>,
    /// Include the built-in replies alongside the manifest
    pub builtin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            ports: DEFAULT_CANDIDATE_PORTS.to_vec(),
            manifest: None,
            request_log: None,
            builtin: true,
        }
    }
}

impl ServerConfig {
    pub fn host_or(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string).unwrap_or_else(|| self.host.clone())
    }

    /// CLI ports win when any were given
    pub fn ports_or(&self, cli: &[u16]) -> Vec<u16> {
        if cli.is_empty() {
            self.ports.clone()
        } else {
            cli.to_vec()
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
    pub timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            interval_ms: policy.interval.as_millis() as u64,
            max_attempts: policy.max_attempts,
            timeout_ms: policy.request_timeout.as_millis() as u64,
        }
    }
}

impl PollConfig {
    pub fn policy(&self, overrides: &PollArgs) -> PollPolicy {
        PollPolicy::from_millis(
            overrides.interval_ms.unwrap_or(self.interval_ms),
            overrides.attempts.unwrap_or(self.max_attempts),
            overrides.timeout_ms.unwrap_or(self.timeout_ms),
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        for path in config_paths(config_path) {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        // CISHIM_SERVER__HOST -> server.host
        figment = figment.merge(Env::prefixed("CISHIM_").split("__"));

        figment
            .extract()
            .map_err(|e| anyhow!("Failed to load config: {}", e))
    }
}

fn config_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
        return paths;
    }

    if let Some(path) = get_user_config_path() {
        push_unique(&mut paths, path);
    }
    if let Some(path) = get_xdg_config_path() {
        push_unique(&mut paths, path);
    }
    push_unique(&mut paths, PathBuf::from("cishim.toml"));

    paths
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

fn get_user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cishim").map(|d| d.config_dir().join("config.toml"))
}

fn get_xdg_config_path() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(|dir| PathBuf::from(dir).join("cishim").join("config.toml"))
}

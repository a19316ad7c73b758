//! Manifest parsing and request matching
//!
//! The manifest maps request paths to canned JSON replies:
//!
//! ```toml
//! [[responses]]
//! path = "/api/agent/:id"
//! match = "pattern"
//! body = { id = "{{id}}", status = "ok" }
//!
//! [[responses]]
//! path = "/api/metrics"
//! file = "metrics.json"
//! status = 503
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shim_core::RouteMatcher;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A manifest defines path-to-response mappings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// List of response mappings, first match wins
    #[serde(default)]
    pub responses: Vec<ResponseMapping>,

    /// Directory that `file` entries are relative to
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// How a mapping's `path` is compared with the request path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// `path` or anything below it on a segment boundary
    #[default]
    Prefix,
    /// `path` only (a trailing `/` is tolerated)
    Exact,
    /// A route pattern such as `/api/agent/:id`
    Pattern,
}

/// Maps a request to a canned response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMapping {
    pub path: String,

    #[serde(rename = "match", default)]
    pub match_kind: MatchKind,

    /// HTTP method to match, `*` for any
    #[serde(default = "any_method")]
    pub method: String,

    /// HTTP status code to reply with (default: 200)
    #[serde(default = "default_status")]
    pub status: u16,

    /// Inline JSON body
    #[serde(default)]
    pub body: Option<Value>,

    /// Response file path (relative to the manifest directory)
    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Delay in milliseconds before replying (simulates latency)
    #[serde(default)]
    pub delay_ms: u64,
}

fn any_method() -> String {
    "*".to_string()
}

fn default_status() -> u16 {
    200
}

impl ResponseMapping {
    /// A `GET`-or-anything prefix mapping with an inline body
    pub fn canned(path: &str, body: Value) -> Self {
        Self {
            path: path.to_string(),
            match_kind: MatchKind::Prefix,
            method: any_method(),
            status: default_status(),
            body: Some(body),
            file: None,
            headers: BTreeMap::new(),
            delay_ms: 0,
        }
    }

    fn method_matches(&self, method: &str) -> bool {
        self.method == "*" || self.method.eq_ignore_ascii_case(method)
    }

    /// Parameters extracted when this mapping matches `path`
    fn matches(&self, path: &str, matcher: &dyn RouteMatcher) -> Option<BTreeMap<String, String>> {
        match self.match_kind {
            MatchKind::Exact => {
                let trimmed = |p: &str| p.trim_end_matches('/').to_string();
                (trimmed(&self.path) == trimmed(path)).then(BTreeMap::new)
            }
            MatchKind::Prefix => {
                let prefix = self.path.trim_end_matches('/');
                let on_boundary = path == prefix
                    || prefix.is_empty()
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'));
                on_boundary.then(BTreeMap::new)
            }
            MatchKind::Pattern => match matcher.match_path(&self.path, path) {
                Ok(hit) => hit.map(|m| m.params),
                Err(e) => {
                    warn!(pattern = %self.path, error = %e, "ignoring mapping with invalid pattern");
                    None
                }
            },
        }
    }
}

impl Manifest {
    /// Load a manifest from a TOML file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ManifestError::Io(path.to_path_buf(), e))?;

        let mut manifest: Manifest =
            toml::from_str(&content).map_err(|e| ManifestError::Parse(path.to_path_buf(), e))?;
        manifest.base_dir = path.parent().map(Path::to_path_buf);
        Ok(manifest)
    }

    /// The canned replies served when nothing else is configured
    pub fn builtin() -> Self {
        let ok = json!({ "status": "ok" });
        Self {
            responses: vec![
                ResponseMapping::canned("/health", ok.clone()),
                ResponseMapping::canned("/api/health", ok),
                ResponseMapping::canned(
                    "/api/status",
                    json!({ "status": "ok", "mode": "fallback" }),
                ),
                ResponseMapping::canned(
                    "/api/agents",
                    json!({ "agents": [] }),
                ),
                ResponseMapping::canned(
                    "/api/agent",
                    json!({ "status": "ok", "agent": "fallback", "ready": true }),
                ),
                ResponseMapping::canned("/api/config", json!({ "config": {} })),
            ],
            base_dir: None,
        }
    }

    /// User mappings first, then `fallback`'s
    pub fn merge(mut self, fallback: Manifest) -> Self {
        self.responses.extend(fallback.responses);
        if self.base_dir.is_none() {
            self.base_dir = fallback.base_dir;
        }
        self
    }

    /// Find the first mapping for a request, with its extracted parameters
    pub fn find(
        &self,
        method: &str,
        path: &str,
        matcher: &dyn RouteMatcher,
    ) -> Option<(&ResponseMapping, BTreeMap<String, String>)> {
        self.responses
            .iter()
            .filter(|m| m.method_matches(method))
            .find_map(|m| m.matches(path, matcher).map(|params| (m, params)))
    }

    /// The JSON body for `mapping`, with `{{name}}` placeholders filled from `params`
    pub fn resolve_body(
        &self,
        mapping: &ResponseMapping,
        params: &BTreeMap<String, String>,
    ) -> Result<Value, ManifestError> {
        let body = if let Some(body) = &mapping.body {
            body.clone()
        } else if let Some(file) = &mapping.file {
            let path = self
                .base_dir
                .as_deref()
                .unwrap_or_else(|| Path::new("."))
                .join(file);
            let content = std::fs::read_to_string(&path)
                .map_err(|_| ManifestError::ResponseNotFound(path.clone()))?;
            serde_json::from_str(&content).map_err(|e| ManifestError::Body(path, e))?
        } else {
            json!({})
        };

        Ok(fill_placeholders(body, params))
    }
}

fn fill_placeholders(value: Value, params: &BTreeMap<String, String>) -> Value {
    match value {
        Value::String(s) if s.contains("{{") => Value::String(
            params
                .iter()
                .fold(s, |acc, (k, v)| acc.replace(&format!("{{{{{}}}}}", k), v)),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| fill_placeholders(v, params))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, fill_placeholders(v, params)))
                .collect(),
        ),
        other => other,
    }
}

/// Errors that can occur when loading or using a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest file {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Failed to parse manifest {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Response file not found: {0}")]
    ResponseNotFound(PathBuf),

    #[error("Response file {0} is not valid JSON: {1}")]
    Body(PathBuf, serde_json::Error),
}

impl From<ManifestError> for shim_core::ShimError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Io(..) | ManifestError::ResponseNotFound(_) => {
                shim_core::ShimError::Io(err.to_string())
            }
            ManifestError::Parse(..) | ManifestError::Body(..) => {
                shim_core::ShimError::Parse(err.to_string())
            }
        }
    }
}

//! Canned-response HTTP server
//!
//! Every request goes through one fallback handler that looks the path up in
//! the [`Manifest`]. The route matcher is injected, so pattern mappings work
//! with any [`RouteMatcher`] implementation.

use crate::manifest::Manifest;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shim_core::{Result, RouteMatcher, ShimError};
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A single request log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status: u16,

    /// Path of the mapping that answered, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<String>,

    pub duration_ms: u64,
}

struct RequestLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

struct ResponderState {
    manifest: Manifest,
    matcher: Arc<dyn RouteMatcher>,
    log: Option<RequestLog>,
}

/// Shared state for the fallback responder
#[derive(Clone)]
pub struct ResponderApp {
    state: Arc<ResponderState>,
}

/// A fully resolved reply, independent of the HTTP framework
#[derive(Debug, Clone, PartialEq)]
pub struct CannedReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
    pub mapping: Option<String>,
    pub delay: Duration,
}

impl ResponderApp {
    pub fn new(manifest: Manifest, matcher: Arc<dyn RouteMatcher>) -> Self {
        Self {
            state: Arc::new(ResponderState {
                manifest,
                matcher,
                log: None,
            }),
        }
    }

    /// Append one JSON line per request to `path`
    pub fn with_request_log(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ShimError::Io(format!("Failed to open request log {}: {}", path.display(), e))
            })?;

        let state = Arc::try_unwrap(self.state).unwrap_or_else(|shared| ResponderState {
            manifest: shared.manifest.clone(),
            matcher: Arc::clone(&shared.matcher),
            log: None,
        });

        Ok(Self {
            state: Arc::new(ResponderState {
                log: Some(RequestLog {
                    path,
                    writer: Mutex::new(BufWriter::new(file)),
                }),
                ..state
            }),
        })
    }

    pub fn request_log_path(&self) -> Option<&Path> {
        self.state.log.as_ref().map(|l| l.path.as_path())
    }

    pub fn router(&self) -> Router {
        Router::new()
            .fallback(fallback_handler)
            .with_state(self.clone())
    }

    /// Resolve the reply for a request without touching the network
    pub fn reply_for(&self, method: &str, path: &str) -> CannedReply {
        let manifest = &self.state.manifest;

        let Some((mapping, params)) = manifest.find(method, path, self.state.matcher.as_ref())
        else {
            return CannedReply {
                status: 404,
                headers: Vec::new(),
                body: json!({ "error": "not found", "path": path }),
                mapping: None,
                delay: Duration::ZERO,
            };
        };

        match manifest.resolve_body(mapping, &params) {
            Ok(body) => CannedReply {
                status: mapping.status,
                headers: mapping
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                body,
                mapping: Some(mapping.path.clone()),
                delay: Duration::from_millis(mapping.delay_ms),
            },
            Err(e) => {
                warn!(mapping = %mapping.path, error = %e, "could not resolve canned body");
                CannedReply {
                    status: 500,
                    headers: Vec::new(),
                    body: json!({ "error": e.to_string() }),
                    mapping: Some(mapping.path.clone()),
                    delay: Duration::ZERO,
                }
            }
        }
    }

    fn log_request(&self, method: &str, path: &str, reply: &CannedReply, start: Instant) {
        let Some(log) = &self.state.log else {
            return;
        };

        let entry = RequestLogEntry {
            timestamp: Utc::now(),
            method: method.to_string(),
            path: path.to_string(),
            status: reply.status,
            mapping: reply.mapping.clone(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        let mut writer = log.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = append_entry(&mut *writer, &entry) {
            warn!(path = %log.path.display(), error = %e, "could not write request log entry");
        }
    }
}

/// Append one JSON line and flush
fn append_entry<W: Write>(writer: &mut W, entry: &RequestLogEntry) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, entry)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

async fn fallback_handler(State(app): State<ResponderApp>, method: Method, uri: Uri) -> Response {
    let start = Instant::now();
    let path = uri.path().to_string();
    let reply = app.reply_for(method.as_str(), &path);

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    debug!(%method, %path, status = reply.status, "fallback reply");
    app.log_request(method.as_str(), &path, &reply, start);

    into_response(reply)
}

fn into_response(reply: CannedReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or_else(|_| {
        warn!(status = reply.status, "invalid status in manifest, replying 500");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut headers = HeaderMap::new();
    for (name, value) in &reply.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "skipping invalid header in manifest"),
        }
    }

    (status, headers, Json(reply.body)).into_response()
}

/// Serve `app` on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: tokio::net::TcpListener, app: ResponderApp, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| ShimError::Io(e.to_string()))?;
    info!(%addr, "fallback responder listening");

    axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ShimError::Http(format!("server failed: {}", e)))
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Read back a request log written by [`ResponderApp::with_request_log`]
pub fn read_request_log(path: &Path) -> Vec<RequestLogEntry> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{MatchKind, ResponseMapping};
    use shim_routes::PatternMatcher;

    fn builtin_app() -> ResponderApp {
        ResponderApp::new(Manifest::builtin(), Arc::new(PatternMatcher::default()))
    }

    #[test]
    fn test_reply_for_builtin_health() {
        let reply = builtin_app().reply_for("GET", "/health");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, json!({ "status": "ok" }));
        assert_eq!(reply.mapping.as_deref(), Some("/health"));
    }

    #[test]
    fn test_reply_for_unknown_path() {
        let reply = builtin_app().reply_for("GET", "/nowhere");
        assert_eq!(reply.status, 404);
        assert_eq!(reply.body["path"], "/nowhere");
        assert!(reply.mapping.is_none());
    }

    #[test]
    fn test_reply_for_broken_file_mapping() {
        let mut mapping = ResponseMapping::canned("/broken", json!(null));
        mapping.body = None;
        mapping.file = Some("missing.json".to_string());
        let manifest = Manifest {
            responses: vec![mapping],
            base_dir: None,
        };
        let app = ResponderApp::new(manifest, Arc::new(PatternMatcher::default()));

        assert_eq!(app.reply_for("GET", "/broken").status, 500);
    }

    #[test]
    fn test_injected_matcher_is_used() {
        struct Everything;
        impl RouteMatcher for Everything {
            fn match_path(&self, _: &str, path: &str) -> Result<Option<shim_core::RouteMatch>> {
                Ok(Some(shim_core::RouteMatch {
                    path: path.to_string(),
                    params: [("who".to_string(), "stub".to_string())].into_iter().collect(),
                }))
            }
            fn compile_path(
                &self,
                pattern: &str,
                _: &std::collections::BTreeMap<String, String>,
            ) -> Result<String> {
                Ok(pattern.to_string())
            }
        }

        let mut mapping = ResponseMapping::canned("/ignored/:x", json!({ "who": "{{who}}" }));
        mapping.match_kind = MatchKind::Pattern;
        let app = ResponderApp::new(
            Manifest {
                responses: vec![mapping],
                base_dir: None,
            },
            Arc::new(Everything),
        );

        assert_eq!(app.reply_for("GET", "/anything").body["who"], "stub");
    }

    #[test]
    fn test_append_entry_reports_write_errors() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let entry = RequestLogEntry {
            timestamp: Utc::now(),
            method: "GET".to_string(),
            path: "/health".to_string(),
            status: 200,
            mapping: None,
            duration_ms: 1,
        };

        let err = append_entry(&mut Broken, &entry).unwrap_err();
        assert!(err.to_string().contains("disk full"));

        let mut buf = Vec::new();
        append_entry(&mut buf, &entry).unwrap();
        let line = String::from_utf8(buf).unwrap();
        assert!(line.ends_with('\n'));
        assert!(!line.contains("mapping"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_serve_over_http_and_log_requests() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("requests.jsonl");
        let app = builtin_app().with_request_log(&log_path).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, app, async {
            let _ = rx.await;
        }));

        let base = format!("http://{}", addr);
        let (status, body, missing) = tokio::task::spawn_blocking(move || {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .into();
            let mut ok = agent.get(&format!("{}/api/status", base)).call().unwrap();
            let status = ok.status().as_u16();
            let body: serde_json::Value = ok.body_mut().read_json().unwrap();
            let missing = agent
                .get(&format!("{}/nope", base))
                .call()
                .unwrap()
                .status()
                .as_u16();
            (status, body, missing)
        })
        .await
        .unwrap();

        assert_eq!(status, 200);
        assert_eq!(body["mode"], "fallback");
        assert_eq!(missing, 404);

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();

        let entries = read_request_log(&log_path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "/api/status");
        assert_eq!(entries[0].mapping.as_deref(), Some("/api/status"));
        assert_eq!(entries[1].status, 404);
    }
}

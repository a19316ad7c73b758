//! Port discovery and readiness polling
//!
//! Both are plain linear retry loops: a fixed interval between rounds and a
//! fixed number of rounds.

use serde::{Deserialize, Serialize};
use shim_core::{Result, ShimError};
use std::net::TcpListener;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use ureq::Agent;

/// Ports tried when none are configured
pub const DEFAULT_CANDIDATE_PORTS: &[u16] = &[3000, 3001, 3002, 8080, 8081, 9323];

/// Interval and attempt budget for polling loops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Socket timeout for a single readiness request
    pub request_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: 20,
            request_timeout: Duration::from_secs(2),
        }
    }
}

impl PollPolicy {
    /// Build from millisecond values, clamping attempts to at least one
    pub fn from_millis(interval_ms: u64, max_attempts: u32, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            max_attempts: max_attempts.max(1),
            request_timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// Outcome of a successful readiness wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadyReport {
    pub url: String,
    pub status: u16,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

/// Bind the first free candidate, retrying whole rounds per `policy`.
/// A candidate of `0` lets the OS choose.
pub fn bind_first_free(host: &str, candidates: &[u16], policy: &PollPolicy) -> Result<TcpListener> {
    for attempt in 1..=policy.max_attempts {
        for &port in candidates {
            match TcpListener::bind((host, port)) {
                Ok(listener) => {
                    debug!(host, port, attempt, "bound candidate port");
                    return Ok(listener);
                }
                Err(e) => debug!(host, port, error = %e, "candidate port unavailable"),
            }
        }
        if attempt < policy.max_attempts {
            std::thread::sleep(policy.interval);
        }
    }

    Err(ShimError::NoFreePort(candidates.to_vec()))
}

/// First free candidate port (the probe socket is released before returning)
pub fn find_free_port(host: &str, candidates: &[u16], policy: &PollPolicy) -> Result<u16> {
    let listener = bind_first_free(host, candidates, policy)?;
    let port = listener.local_addr()?.port();
    Ok(port)
}

fn agent(policy: &PollPolicy) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(policy.request_timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// One readiness request: `Ok(status)` on 2xx, `Err(reason)` otherwise
fn check(agent: &Agent, url: &str) -> std::result::Result<u16, String> {
    match agent.get(url).call() {
        Ok(response) if response.status().is_success() => Ok(response.status().as_u16()),
        Ok(response) => Err(format!("HTTP {}", response.status().as_u16())),
        Err(e) => Err(e.to_string()),
    }
}

/// Poll `url` until it answers 2xx
pub fn wait_until_ready(url: &str, policy: &PollPolicy) -> Result<ReadyReport> {
    let agent = agent(policy);
    let start = Instant::now();
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=policy.max_attempts {
        match check(&agent, url) {
            Ok(status) => {
                info!(url, attempt, "endpoint ready");
                return Ok(ReadyReport {
                    url: url.to_string(),
                    status,
                    attempts: attempt,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
            Err(reason) => {
                debug!(url, attempt, %reason, "endpoint not ready");
                last_error = reason;
            }
        }
        if attempt < policy.max_attempts {
            std::thread::sleep(policy.interval);
        }
    }

    Err(ShimError::NotReady {
        url: url.to_string(),
        attempts: policy.max_attempts,
        last_error,
    })
}

/// Poll every candidate port each round until one serves `path` with 2xx
pub fn probe_ports(
    host: &str,
    candidates: &[u16],
    path: &str,
    policy: &PollPolicy,
) -> Result<(u16, ReadyReport)> {
    let agent = agent(policy);
    let start = Instant::now();
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    let mut last_error = String::from("no candidate ports");

    for attempt in 1..=policy.max_attempts {
        for &port in candidates {
            let url = format!("http://{}:{}{}", host, port, path);
            match check(&agent, &url) {
                Ok(status) => {
                    info!(%url, attempt, "found ready endpoint");
                    return Ok((
                        port,
                        ReadyReport {
                            url,
                            status,
                            attempts: attempt,
                            elapsed_ms: start.elapsed().as_millis() as u64,
                        },
                    ));
                }
                Err(reason) => last_error = format!("{}: {}", url, reason),
            }
        }
        if attempt < policy.max_attempts {
            std::thread::sleep(policy.interval);
        }
    }

    Err(ShimError::NotReady {
        url: format!("http://{}:{:?}{}", host, candidates, path),
        attempts: policy.max_attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick() -> PollPolicy {
        PollPolicy::from_millis(10, 3, 500)
    }

    #[test]
    fn test_policy_defaults() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.max_attempts, 20);
        assert_eq!(PollPolicy::from_millis(1, 0, 1).max_attempts, 1);
    }

    #[test]
    fn test_find_free_port_skips_taken() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let taken_port = taken.local_addr().unwrap().port();

        let port = find_free_port("127.0.0.1", &[taken_port, 0], &quick()).unwrap();
        assert_ne!(port, taken_port);
        assert_ne!(port, 0);
    }

    #[test]
    fn test_find_free_port_exhausted() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let taken_port = taken.local_addr().unwrap().port();

        let err = find_free_port("127.0.0.1", &[taken_port], &quick()).unwrap_err();
        assert!(matches!(err, ShimError::NoFreePort(ports) if ports == vec![taken_port]));
    }

    #[tokio::test]
    async fn test_wait_until_ready_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
            .mount(&mock_server)
            .await;

        let url = format!("{}/health", mock_server.uri());
        let report = wait_until_ready(&url, &quick()).unwrap();
        assert_eq!(report.status, 200);
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn test_wait_until_ready_gives_up() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let url = format!("{}/health", mock_server.uri());
        let err = wait_until_ready(&url, &quick()).unwrap_err();
        match err {
            ShimError::NotReady {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("503"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_probe_ports_finds_live_candidate() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        // a port with nothing listening, then the mock server
        let dead = TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_port = dead.local_addr().unwrap().port();
        drop(dead);
        let live_port = mock_server.address().port();

        let (port, report) =
            probe_ports("127.0.0.1", &[dead_port, live_port], "api/health", &quick()).unwrap();
        assert_eq!(port, live_port);
        assert_eq!(report.status, 204);
        assert!(report.url.ends_with("/api/health"));
    }
}

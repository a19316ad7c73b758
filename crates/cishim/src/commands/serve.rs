use crate::cli::OutputFormat;
use crate::config::Config;
use crate::output::{output_result, Listening};
use anyhow::{Context, Result};
use shim_routes::PatternMatcher;
use shim_server::{bind_first_free, serve, shutdown_signal, Manifest, ResponderApp};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct ServeArgs<'a> {
    pub host: Option<&'a str>,
    pub ports: &'a [u16],
    pub manifest: Option<&'a Path>,
    pub no_builtin: bool,
    pub log_requests: Option<&'a Path>,
}

pub fn handle_serve(args: ServeArgs<'_>, config: &Config, format: OutputFormat) -> Result<()> {
    let manifest = build_manifest(
        args.manifest.or(config.server.manifest.as_deref()),
        config.server.builtin && !args.no_builtin,
    )?;
    info!(mappings = manifest.responses.len(), "loaded response manifest");

    let mut app = ResponderApp::new(manifest, Arc::new(PatternMatcher::default()));
    if let Some(path) = args.log_requests.or(config.server.request_log.as_deref()) {
        app = app
            .with_request_log(path)
            .with_context(|| format!("Failed to open request log {}", path.display()))?;
    }

    let host = config.server.host_or(args.host);
    let candidates = config.server.ports_or(args.ports);
    let listener = bind_first_free(&host, &candidates, &config.poll.policy(&Default::default()))
        .context("Failed to bind a candidate port")?;
    listener
        .set_nonblocking(true)
        .context("Failed to configure listener")?;

    let addr = listener.local_addr().context("Failed to read bound address")?;
    output_result(
        &Listening {
            address: addr.to_string(),
            url: format!("http://{}", addr),
            port: addr.port(),
        },
        format,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let listener =
            tokio::net::TcpListener::from_std(listener).context("Failed to adopt listener")?;
        serve(listener, app, shutdown_signal())
            .await
            .context("Responder stopped with an error")
    })
}

/// Manifest file entries first, then the built-in replies unless disabled
fn build_manifest(path: Option<&Path>, include_builtin: bool) -> Result<Manifest> {
    let user = match path {
        Some(path) => Manifest::load(path)
            .with_context(|| format!("Failed to load manifest {}", path.display()))?,
        None => Manifest::default(),
    };

    Ok(if include_builtin {
        user.merge(Manifest::builtin())
    } else {
        user
    })
}

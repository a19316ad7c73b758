use crate::cli::{OutputFormat, PortCommands};
use crate::config::Config;
use crate::output::{output_result, FreePort, ProbeResult};
use anyhow::{Context, Result};
use shim_server::{find_free_port, probe_ports, wait_until_ready};

pub fn handle_ports(action: &PortCommands, config: &Config, format: OutputFormat) -> Result<()> {
    match action {
        PortCommands::Free { host, ports } => {
            let host = config.server.host_or(host.as_deref());
            let candidates = config.server.ports_or(ports);
            let policy = config.poll.policy(&Default::default());

            let port = find_free_port(&host, &candidates, &policy)
                .context("Failed to find a free port")?;
            output_result(&FreePort { host, port }, format);
            Ok(())
        }
        PortCommands::Wait { url, poll } => {
            let report = wait_until_ready(url, &config.poll.policy(poll))
                .with_context(|| format!("{} did not become ready", url))?;
            output_result(&report, format);
            Ok(())
        }
        PortCommands::Probe {
            host,
            ports,
            path,
            poll,
        } => {
            let host = config.server.host_or(host.as_deref());
            let candidates = config.server.ports_or(ports);

            let (port, ready) = probe_ports(&host, &candidates, path, &config.poll.policy(poll))
                .context("No candidate port became ready")?;
            output_result(&ProbeResult { port, ready }, format);
            Ok(())
        }
    }
}

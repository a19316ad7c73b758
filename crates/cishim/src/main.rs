mod cli;
mod commands;
mod config;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::serve::ServeArgs;
use config::Config;
use logging::{init_logging, parse_level, LoggingConfig};
use output::output_error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    output::init_color(cli.color);

    if let Err(e) = run(&cli) {
        output_error(&e, cli.format);
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

fn run(cli: &Cli) -> Result<()> {
    // Completions need neither config nor logging
    if let Commands::Completions { shell } = &cli.command {
        Cli::generate_completions(*shell);
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    init_logging(LoggingConfig {
        level: parse_level(cli.log_level.as_deref().unwrap_or(&config.log.level)),
        use_json: cli.log_json || config.log.json,
    });

    match &cli.command {
        Commands::Env { fixture, evidence } => {
            commands::env::handle_env(fixture.as_deref(), *evidence, cli.format)
        }
        Commands::Reports { action } => {
            commands::reports::handle_reports(action, &config, cli.format)
        }
        Commands::Routes { action } => commands::routes::handle_routes(action, cli.format),
        Commands::Serve {
            host,
            ports,
            manifest,
            no_builtin,
            log_requests,
        } => commands::serve::handle_serve(
            ServeArgs {
                host: host.as_deref(),
                ports,
                manifest: manifest.as_deref(),
                no_builtin: *no_builtin,
                log_requests: log_requests.as_deref(),
            },
            &config,
            cli.format,
        ),
        Commands::Ports { action } => commands::ports::handle_ports(action, &config, cli.format),
        Commands::Completions { .. } => Ok(()),
    }
}

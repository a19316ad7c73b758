use crate::cli::{OutputFormat, RouteCommands};
use crate::output::{output_result, CompiledPath};
use anyhow::{anyhow, Context, Result};
use shim_core::RouteMatcher;
use shim_routes::{MatchOptions, PatternMatcher};
use std::collections::BTreeMap;

pub fn handle_routes(action: &RouteCommands, format: OutputFormat) -> Result<()> {
    match action {
        RouteCommands::Match {
            pattern,
            path,
            sensitive,
            strict,
            prefix,
        } => {
            let options = MatchOptions {
                sensitive: *sensitive,
                strict: *strict,
                end: !*prefix,
            };
            handle_match(&PatternMatcher::new(options), pattern, path, format)
        }
        RouteCommands::Compile { pattern, params } => {
            handle_compile(&PatternMatcher::default(), pattern, params, format)
        }
    }
}

fn handle_match(
    matcher: &dyn RouteMatcher,
    pattern: &str,
    path: &str,
    format: OutputFormat,
) -> Result<()> {
    let matched = matcher
        .match_path(pattern, path)
        .with_context(|| format!("Invalid route pattern '{}'", pattern))?
        .ok_or_else(|| anyhow!("'{}' does not match '{}'", path, pattern))?;

    output_result(&matched, format);
    Ok(())
}

fn handle_compile(
    matcher: &dyn RouteMatcher,
    pattern: &str,
    params: &[(String, String)],
    format: OutputFormat,
) -> Result<()> {
    let params: BTreeMap<String, String> = params.iter().cloned().collect();
    let path = matcher
        .compile_path(pattern, &params)
        .with_context(|| format!("Failed to compile '{}'", pattern))?;

    output_result(&CompiledPath { path }, format);
    Ok(())
}

use crate::output::{output_result, EnvView};
use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use shim_core::{classify, detect, HostFixture};
use std::path::Path;

pub fn handle_env(fixture: Option<&Path>, show_evidence: bool, format: OutputFormat) -> Result<()> {
    let descriptor = match fixture {
        Some(path) => {
            let fixture = HostFixture::load(path)
                .with_context(|| format!("Failed to load host fixture {}", path.display()))?;
            classify(
                &fixture.env_source(),
                &fixture.file_probe(),
                fixture.os(),
                fixture.arch(),
            )
        }
        None => detect(),
    };

    output_result(
        &EnvView {
            descriptor: &descriptor,
            show_evidence,
        },
        format,
    );
    Ok(())
}

//! Placeholder report documents
//!
//! Placeholders declare zero executed tests. They exist so report scrapers
//! find well-formed files; they never claim a test passed.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use shim_core::EnvironmentDescriptor;

pub const GENERATOR: &str = concat!("cishim ", env!("CARGO_PKG_VERSION"));

/// Inputs shared by every rendered placeholder
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub suite_name: String,
    pub generated_at: DateTime<Utc>,
    pub environment: Option<EnvironmentDescriptor>,
}

impl ReportContext {
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            generated_at: Utc::now(),
            environment: None,
        }
    }

    pub fn with_environment(mut self, environment: EnvironmentDescriptor) -> Self {
        self.environment = Some(environment);
        self
    }

    fn timestamp(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn environment_summary(&self) -> String {
        self.environment
            .as_ref()
            .map(EnvironmentDescriptor::summary)
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl Default for ReportContext {
    fn default() -> Self {
        Self::new("placeholder")
    }
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// JUnit XML with one empty suite
pub fn render_junit(ctx: &ReportContext) -> String {
    let name = xml_escape(&ctx.suite_name);
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<testsuites name=\"{}\" tests=\"0\" failures=\"0\" errors=\"0\" skipped=\"0\" time=\"0\">\n",
        name
    ));
    out.push_str(&format!(
        "  <testsuite name=\"{}\" tests=\"0\" failures=\"0\" errors=\"0\" skipped=\"0\" time=\"0\" timestamp=\"{}\">\n",
        name,
        ctx.timestamp()
    ));
    out.push_str("    <properties>\n");
    for (key, value) in [
        ("placeholder", "true".to_string()),
        ("generator", GENERATOR.to_string()),
        ("environment", ctx.environment_summary()),
    ] {
        out.push_str(&format!(
            "      <property name=\"{}\" value=\"{}\"/>\n",
            key,
            xml_escape(&value)
        ));
    }
    out.push_str("    </properties>\n");
    out.push_str("  </testsuite>\n");
    out.push_str("</testsuites>\n");
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    placeholder: bool,
    generator: &'a str,
    suite: &'a str,
    generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<&'a EnvironmentDescriptor>,
    stats: JsonStats,
    suites: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct JsonStats {
    tests: u32,
    passed: u32,
    failed: u32,
    skipped: u32,
}

/// JSON results document with empty stats
pub fn render_json(ctx: &ReportContext) -> String {
    let report = JsonReport {
        placeholder: true,
        generator: GENERATOR,
        suite: &ctx.suite_name,
        generated_at: ctx.timestamp(),
        environment: ctx.environment.as_ref(),
        stats: JsonStats {
            tests: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
        },
        suites: Vec::new(),
    };

    // serializing plain structs of strings and numbers cannot fail
    let mut json = serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string());
    json.push('\n');
    json
}

/// Minimal HTML index page
pub fn render_html(ctx: &ReportContext) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="generator" content="{generator}">
  <title>{title} report</title>
</head>
<body>
  <h1>{title}</h1>
  <p>No test results were recorded. This page is a placeholder.</p>
  <dl>
    <dt>Generated</dt><dd>{timestamp}</dd>
    <dt>Environment</dt><dd>{environment}</dd>
  </dl>
</body>
</html>
"#,
        generator = html_escape(GENERATOR),
        title = html_escape(&ctx.suite_name),
        timestamp = ctx.timestamp(),
        environment = html_escape(&ctx.environment_summary()),
    )
}

use crate::client::QueryOptions;
use crate::retry::RetryPolicy;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::io::{BufRead, IsTerminal, Write};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const API_KEY_ENV_VAR: &str = "LIMITLESS_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://api.limitless.ai/v1/lifelogs";
pub const DEFAULT_OUTPUT: &str = "all_lifelogs.txt";

/// Configuration required to run the export process.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone)]
pub struct ExportConfig {
    pub api_key: String,
    pub base_url: Url,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub start_cursor: Option<String>,
    pub query: QueryOptions,
    pub request_delay: Duration,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub quiet: bool,
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("output", &self.output)
            .field("format", &self.format)
            .field("start_cursor", &self.start_cursor)
            .field("query", &self.query)
            .field("request_delay", &self.request_delay)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("quiet", &self.quiet)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Record text only, separated by blank lines.
    #[default]
    Text,
    /// One JSON object per record, as received.
    Jsonl,
}

/// Timezone sent with each request when none is configured: `TZ`, then the
/// system zone, then UTC.
pub fn local_timezone() -> String {
    let detected = iana_time_zone::get_timezone()
        .inspect_err(|e| tracing::warn!(error = %e, "Could not detect local timezone"))
        .ok();
    pick_timezone(std::env::var("TZ").ok(), detected)
}

fn pick_timezone(tz_env: Option<String>, detected: Option<String>) -> String {
    let clean = |tz: String| {
        let tz = tz.trim().trim_start_matches(':').to_string();
        (!tz.is_empty()).then_some(tz)
    };
    tz_env
        .and_then(clean)
        .or_else(|| detected.and_then(clean))
        .unwrap_or_else(|| "UTC".to_string())
}

/// Resolve the API key: an explicit value wins, otherwise ask on the terminal.
pub fn resolve_api_key(explicit: Option<String>) -> Result<String> {
    if let Some(key) = explicit {
        return validate_api_key(&key);
    }

    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Err(eyre!(
            "No API key provided.\nPass --api-key, set {API_KEY_ENV_VAR}, or set api_key in config.toml."
        ));
    }

    eprintln!(
        "Didn't find an API key in {API_KEY_ENV_VAR}. Set it to skip this prompt on future runs."
    );
    prompt_api_key(&mut stdin.lock(), &mut std::io::stderr())
}

fn prompt_api_key<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<String> {
    write!(out, "Please enter your Limitless API key: ").wrap_err("Failed to write prompt")?;
    out.flush().wrap_err("Failed to write prompt")?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .wrap_err("Failed to read API key")?;
    validate_api_key(&line)
}

fn validate_api_key(raw: &str) -> Result<String> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(eyre!("No API key provided."));
    }
    Ok(key.to_string())
}

use clap::Parser;
use eyre::{Context, Result, eyre};
use lifelog_export::client::QueryOptions;
use lifelog_export::retry::RetryPolicy;
use lifelog_export::{logging, sequential};
use lifelog_export::utils::{
    self, DEFAULT_BASE_URL, DEFAULT_OUTPUT, Direction, ExportConfig, OutputFormat,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Export every Limitless lifelog into a single local text file.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Limitless API key. Prompted for if not given anywhere.
    #[arg(long, value_name = "KEY", env = "LIMITLESS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Output file.
    /// Defaults to ./all_lifelogs.txt if not set in config.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/lifelog-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Cursor to start from instead of the beginning.
    #[arg(long, value_name = "CURSOR")]
    cursor: Option<String>,

    /// Output format.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Lifelogs requested per page.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    limit: Option<u32>,

    /// Fetch oldest first (asc) or newest first (desc).
    #[arg(long, value_enum)]
    direction: Option<Direction>,

    /// IANA timezone for timestamps (e.g. "Europe/Berlin").
    /// Defaults to $TZ, then the system timezone, then UTC.
    #[arg(long, value_name = "TZ")]
    timezone: Option<String>,

    /// Lifelogs endpoint.
    #[arg(long, value_name = "URL")]
    base_url: Option<Url>,

    /// Log every request and retry.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress standard output (progress and summary).
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    base_url: Option<Url>,
    limit: Option<u32>,
    direction: Option<Direction>,
    timezone: Option<String>,
    include_markdown: Option<bool>,
    include_headings: Option<bool>,
    request_delay_ms: Option<u64>,
    max_attempts: Option<u32>,
    retry_delay_ms: Option<u64>,
    timeout_secs: Option<u64>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("lifelog-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

/// Merge CLI and file settings (CLI > Config > Default).
fn build_config(cli: Cli, file_cfg: FileConfig, api_key: String) -> Result<ExportConfig> {
    let base_url = match cli.base_url.or(file_cfg.base_url) {
        Some(url) => url,
        None => Url::parse(DEFAULT_BASE_URL).wrap_err("Invalid default endpoint")?,
    };

    let limit = cli.limit.or(file_cfg.limit).unwrap_or(10);
    if limit == 0 {
        return Err(eyre!("limit must be at least 1"));
    }

    let defaults = RetryPolicy::default();
    let retry = RetryPolicy {
        max_attempts: file_cfg.max_attempts.unwrap_or(defaults.max_attempts),
        delay: file_cfg
            .retry_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.delay),
    };

    Ok(ExportConfig {
        api_key,
        base_url,
        output: cli
            .output
            .or(file_cfg.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        format: cli.format.or(file_cfg.format).unwrap_or_default(),
        start_cursor: cli.cursor.filter(|c| !c.is_empty()),
        query: QueryOptions {
            limit,
            direction: cli.direction.or(file_cfg.direction).unwrap_or_default(),
            include_markdown: file_cfg.include_markdown.unwrap_or(true),
            include_headings: file_cfg.include_headings.unwrap_or(false),
            timezone: cli
                .timezone
                .or(file_cfg.timezone)
                .unwrap_or_else(utils::local_timezone),
        },
        request_delay: Duration::from_millis(file_cfg.request_delay_ms.unwrap_or(1000)),
        retry,
        timeout: Duration::from_secs(file_cfg.timeout_secs.unwrap_or(30)),
        quiet: cli.quiet,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let pb = sequential::progress_bar(cli.quiet)?;
    logging::init(cli.verbose, cli.quiet, &pb);

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve the API key (CLI/env > Config > prompt)
    let api_key = utils::resolve_api_key(cli.api_key.clone().or(file_cfg.api_key.clone()))?;

    // 3. Build the Export Config
    let config = build_config(cli, file_cfg, api_key)?;

    // 4. Run the Business Logic
    sequential::execute(config, &pb)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["lifelog-export"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_flags_or_config() {
        let cfg = build_config(parse(&[]), FileConfig::default(), "k".into()).unwrap();
        assert_eq!(cfg.output, PathBuf::from("all_lifelogs.txt"));
        assert_eq!(cfg.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(cfg.format, OutputFormat::Text);
        assert_eq!(cfg.query.limit, 10);
        assert_eq!(cfg.query.direction, Direction::Asc);
        assert!(cfg.query.include_markdown);
        assert!(!cfg.query.include_headings);
        assert_eq!(cfg.start_cursor, None);
        assert_eq!(cfg.request_delay, Duration::from_secs(1));
        assert_eq!(cfg.retry, RetryPolicy::default());
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn cli_overrides_config_file() {
        let file_cfg: FileConfig = toml::from_str(
            r#"
            output = "from-config.txt"
            limit = 25
            direction = "desc"
            format = "jsonl"
            "#,
        )
        .unwrap();
        let cli = parse(&["-o", "from-cli.txt", "--limit", "5", "--cursor", "abc"]);
        let cfg = build_config(cli, file_cfg, "k".into()).unwrap();

        assert_eq!(cfg.output, PathBuf::from("from-cli.txt"));
        assert_eq!(cfg.query.limit, 5);
        assert_eq!(cfg.query.direction, Direction::Desc);
        assert_eq!(cfg.format, OutputFormat::Jsonl);
        assert_eq!(cfg.start_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn config_file_tunes_retry_and_timing() {
        let file_cfg: FileConfig = toml::from_str(
            r#"
            max_attempts = 5
            retry_delay_ms = 250
            request_delay_ms = 0
            timeout_secs = 10
            include_headings = true
            timezone = "America/New_York"
            base_url = "http://localhost:8080/v1/lifelogs"
            "#,
        )
        .unwrap();
        let cfg = build_config(parse(&[]), file_cfg, "k".into()).unwrap();

        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.delay, Duration::from_millis(250));
        assert_eq!(cfg.request_delay, Duration::ZERO);
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert!(cfg.query.include_headings);
        assert_eq!(cfg.query.timezone, "America/New_York");
        assert_eq!(cfg.base_url.port(), Some(8080));
    }

    #[test]
    fn zero_limit_in_config_is_rejected() {
        let file_cfg: FileConfig = toml::from_str("limit = 0").unwrap();
        assert!(build_config(parse(&[]), file_cfg, "k".into()).is_err());
    }

    #[test]
    fn zero_limit_flag_is_rejected() {
        assert!(Cli::try_parse_from(["lifelog-export", "--limit", "0"]).is_err());
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("db_path = \"x\"").is_err());
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let err = load_file_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn explicit_config_path_is_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "api_key = \"from-file\"\nlimit = 3").unwrap();
        let cfg = load_file_config(Some(file.path())).unwrap();
        assert_eq!(cfg.api_key.as_deref(), Some("from-file"));
        assert_eq!(cfg.limit, Some(3));
    }
}

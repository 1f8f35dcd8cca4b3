use crate::api::Lifelog;
use crate::client::{LifelogClient, PageSource};
use crate::exporter;
use crate::pager::Pages;
use crate::utils::ExportConfig;
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages: usize,
    pub lifelogs: usize,
}

/// The main entry point: fetch every page one after another, then write the output file.
pub fn execute(config: ExportConfig, pb: &ProgressBar) -> Result<ExportSummary> {
    let client = LifelogClient::from_config(&config)?;
    run(&client, &config, pb)
}

/// Spinner for the fetch loop, hidden when `quiet`. It starts ticking once the run begins.
pub fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} Fetched {pos} lifelogs ({msg}) [{elapsed}]")
            .wrap_err("Invalid progress template")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message("starting");
    Ok(pb)
}

pub fn run<S: PageSource>(
    source: &S,
    config: &ExportConfig,
    pb: &ProgressBar,
) -> Result<ExportSummary> {
    if !pb.is_hidden() {
        pb.enable_steady_tick(Duration::from_millis(80));
    }
    pb.println(format!(
        "Fetching lifelogs: limit_per_page={}, direction={}, timezone={}",
        config.query.limit,
        config.query.direction.as_str(),
        config.query.timezone
    ));

    let mut pages = Pages::new(
        source,
        config.start_cursor.clone(),
        config.retry,
        config.request_delay,
    );
    let mut lifelogs: Vec<Lifelog> = Vec::new();

    while let Some(result) = pages.next() {
        match result {
            Ok(page) => {
                pb.inc(page.lifelogs.len() as u64);
                pb.set_message(format!("page {}", pages.fetched()));
                lifelogs.extend(page.lifelogs);
            }
            Err(e) => {
                pb.finish_and_clear();
                let context = if e.is_auth() {
                    "Authentication with the lifelog API failed".to_string()
                } else {
                    format!("Failed to fetch page {}", pages.requested())
                };
                return Err(e).wrap_err(context);
            }
        }
    }
    pb.finish_and_clear();

    let summary = ExportSummary {
        pages: pages.fetched(),
        lifelogs: lifelogs.len(),
    };
    tracing::debug!(pages = summary.pages, lifelogs = summary.lifelogs, "Fetch complete");

    exporter::write_output(&config.output, &lifelogs, config.format)?;

    if !config.quiet {
        if summary.lifelogs == 0 {
            eprintln!(
                "No lifelogs found. Wrote an empty {}.",
                config.output.display()
            );
        } else {
            eprintln!(
                "Done. {} lifelogs from {} page(s) written to {}.",
                summary.lifelogs,
                summary.pages,
                config.output.display()
            );
        }
    }

    Ok(summary)
}

//! # espi_watch
//!
//! Batch scraper for stockwatch.pl that keeps an eye on a list of companies
//! listed on the Warsaw Stock Exchange.
//!
//! ## Subcommands
//!
//! - `report`: collect ESPI/EBI disclosures from the last N days, render one
//!   HTML report and e-mail it when SMTP credentials are configured
//! - `page`: the same report written as a static `index.html`, no e-mail
//! - `crawl`: page backwards through each company's news listing and append
//!   every article (with its body) to a CSV archive
//!
//! ## Usage
//!
//! ```sh
//! RUST_LOG=debug espi_watch report --days 7
//! espi_watch crawl --since "2024-01-01 00:00:00"
//! ```
//!
//! ## Pipeline
//!
//! 1. **Config**: read the company/ticker and recipient files
//! 2. **Scrape**: fetch and parse pages one at a time, with pauses between
//!    news pages and article fetches
//! 3. **Output**: HTML report (+ optional JSON) or CSV rows
//! 4. **Notify**: e-mail the report (report flow only)

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod models;
mod notify;
mod outputs;
mod scrapers;
mod utils;

use cli::{Cli, Command, CrawlArgs};
use config::Settings;
use models::DateWindow;
use outputs::html::{ReportContext, ReportKind};
use outputs::{csv_store, html, json};
use scrapers::article::{default_strategies, fetch_articles};
use scrapers::client::{HttpFetcher, PageSource};
use scrapers::news::{CrawlOptions, crawl_all};
use scrapers::reports::collect_reports;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "espi_watch starting up");

    let args = Cli::parse();
    let fetcher = HttpFetcher::new(args.verify_tls)?;

    match &args.command {
        Command::Crawl(crawl) => {
            match run_crawl(&fetcher, crawl).await? {
                CrawlRun::Appended(rows) => info!(rows, "Crawl run finished"),
                other => warn!(run = ?other, "Crawl run ended early"),
            }
        }
        command => {
            let kind = if matches!(command, Command::Page) {
                ReportKind::Page
            } else {
                ReportKind::Report
            };
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| command.default_output());
            let settings = Settings::from_cli(&args, output);
            match run_report(&fetcher, &settings, kind).await {
                ReportRun::Written { reports, mailed } => info!(reports, mailed, "Report run finished"),
                other => warn!(run = ?other, "Report run ended early"),
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// How a `report`/`page` run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportRun {
    /// The company list was missing or empty; nothing was rendered.
    NoCompanies,
    /// The report window could not be built from the configured day count.
    BadWindow,
    /// The HTML file could not be written; no e-mail was attempted.
    WriteFailed,
    Written { reports: usize, mailed: bool },
}

/// How a `crawl` run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrawlRun {
    /// The ticker list was missing or empty.
    NoTickers,
    Appended(usize),
    StoreFailed,
}

/// Collect reports, render them, and mail the result when there is something to say.
#[instrument(level = "info", skip_all, fields(kind = ?kind, days = settings.window_days))]
async fn run_report<S: PageSource>(source: &S, settings: &Settings, kind: ReportKind) -> ReportRun {
    let companies = match config::load_companies(&settings.companies_path).await {
        Ok(companies) => companies,
        Err(e) => {
            error!(path = %settings.companies_path.display(), error = %e, "Cannot read company list");
            Vec::new()
        }
    };
    if companies.is_empty() {
        warn!("No companies configured; nothing to do");
        return ReportRun::NoCompanies;
    }

    let window = match DateWindow::trailing_days(Local::now().date_naive(), settings.window_days) {
        Ok(window) => window,
        Err(e) => {
            error!(error = %e, "Cannot build report window");
            return ReportRun::BadWindow;
        }
    };
    info!(start = %window.start(), end = %window.end(), companies = companies.len(), "Searching for reports");

    let names: Vec<String> = companies.iter().map(|c| c.name.clone()).collect();
    let reports = collect_reports(source, &companies, &window).await;

    let generated_at = Local::now().naive_local();
    let ctx = ReportContext {
        kind,
        companies: &names,
        window,
        window_days: settings.window_days,
        generated_at,
    };
    let report_html = html::render_report(&reports, &ctx);
    if let Err(e) = html::write_report(&settings.output_path, &report_html).await {
        error!(path = %settings.output_path.display(), error = %e, "Failed to write HTML report");
        return ReportRun::WriteFailed;
    }

    if let Some(json_path) = &settings.json_output_path {
        let export = json::ReportExport {
            generated_at,
            window,
            companies: &names,
            reports: &reports,
        };
        if let Err(e) = json::write_export(&export, json_path).await {
            error!(path = %json_path.display(), error = %e, "Failed to write JSON export");
        }
    }

    let written = |mailed| ReportRun::Written {
        reports: reports.len(),
        mailed,
    };
    if kind != ReportKind::Report {
        return written(false);
    }
    if reports.is_empty() {
        info!("No new reports; not sending e-mail");
        return written(false);
    }

    let recipients = match config::load_recipients(&settings.recipients_path).await {
        Ok(recipients) => recipients,
        Err(e) => {
            error!(path = %settings.recipients_path.display(), error = %e, "Cannot read recipient list");
            Vec::new()
        }
    };
    let subject = notify::report_subject(&names);
    let mailed = match notify::send_report(settings.mail.as_ref(), &recipients, &subject, &report_html).await {
        Ok(sent) => sent,
        Err(e) => {
            error!(error = %e, "Failed to send report e-mail");
            false
        }
    };
    written(mailed)
}

/// Crawl news for every ticker, fetch bodies, and append them to the store.
///
/// An unreadable ticker list aborts the crawl; an inverted window is returned as an error.
#[instrument(level = "info", skip_all, fields(since = %crawl.since, store = %crawl.store.display()))]
async fn run_crawl<S: PageSource>(source: &S, crawl: &CrawlArgs) -> Result<CrawlRun, Box<dyn Error>> {
    let window = DateWindow::new(crawl.since, Local::now().naive_local())?;

    let tickers = match config::load_tickers(&crawl.tickers).await {
        Ok(tickers) => tickers,
        Err(e) => {
            error!(path = %crawl.tickers.display(), error = %e, "Cannot read ticker list; aborting crawl");
            return Ok(CrawlRun::NoTickers);
        }
    };
    if tickers.is_empty() {
        warn!("No tickers configured; aborting crawl");
        return Ok(CrawlRun::NoTickers);
    }

    let options = CrawlOptions {
        page_delay: Duration::from_millis(crawl.page_delay_ms),
        max_pages: crawl.max_pages,
    };
    let listings = crawl_all(source, &tickers, &window, &options).await;

    let articles = fetch_articles(
        source,
        listings,
        &default_strategies(),
        Duration::from_millis(crawl.article_delay_ms),
    )
    .await;

    match csv_store::append_articles(&crawl.store, &articles).await {
        Ok(written) => {
            info!(written, "Crawl finished");
            Ok(CrawlRun::Appended(written))
        }
        Err(e) => {
            error!(path = %crawl.store.display(), error = %e, "Failed to append to CSV store");
            Ok(CrawlRun::StoreFailed)
        }
    }
}

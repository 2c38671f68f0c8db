//! Command-line interface definitions for espi_watch.
//!
//! Options shared by every subcommand are global, so they can be given before
//! or after the subcommand name. Every path and credential can also come from
//! the environment.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Accepted formats for `crawl --since`.
const SINCE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Command-line arguments for espi_watch.
///
/// # Examples
///
/// ```sh
/// # Weekly ESPI/EBI report, mailed when SMTP credentials are set
/// espi_watch report --days 7
///
/// # Static page for a web server, no e-mail
/// espi_watch page --output /var/www/index.html
///
/// # Archive company news since the start of 2024
/// espi_watch crawl --since "2024-01-01 00:00:00" --store artykuly.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Company list, one `name,ticker` per line
    #[arg(long, env = "ESPI_COMPANIES_PATH", default_value = "spolki.txt", global = true)]
    pub companies: PathBuf,

    /// E-mail recipients, one address per line
    #[arg(long, env = "ESPI_RECIPIENTS_PATH", default_value = "odbiorcy.txt", global = true)]
    pub recipients: PathBuf,

    /// Length of the report window in days, counted back from today
    #[arg(short, long, env = "ESPI_WINDOW_DAYS", default_value_t = 7, global = true)]
    pub days: u32,

    /// Where to write the HTML report (defaults depend on the subcommand)
    #[arg(short, long, env = "ESPI_OUTPUT_PATH", global = true)]
    pub output: Option<PathBuf>,

    /// Also dump the collected reports as JSON
    #[arg(long, env = "ESPI_JSON_OUTPUT", global = true)]
    pub json_output: Option<PathBuf>,

    /// Verify TLS certificates of the scraped site (off by default, the site has had broken chains)
    #[arg(long, global = true)]
    pub verify_tls: bool,

    /// SMTP relay used for the report e-mail
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com", global = true)]
    pub smtp_host: String,

    /// SMTP login, also used as the sender address
    #[arg(long, env = "SMTP_USER", global = true)]
    pub smtp_user: Option<String>,

    /// SMTP password (an app password for Gmail)
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true, global = true)]
    pub smtp_password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the ESPI/EBI report and e-mail it
    Report,
    /// Build the same report as a static page, without e-mail
    Page,
    /// Crawl company news pages and append articles to the CSV store
    Crawl(CrawlArgs),
}

impl Command {
    pub fn default_output(&self) -> PathBuf {
        match self {
            Command::Page => PathBuf::from("index.html"),
            _ => PathBuf::from("raport_gieldowy.html"),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct CrawlArgs {
    /// Ticker list, one per line
    #[arg(long, env = "ESPI_TICKERS_PATH", default_value = "spolki.txt")]
    pub tickers: PathBuf,

    /// CSV file the articles are appended to
    #[arg(long, env = "ESPI_STORE_PATH", default_value = "artykuly.csv")]
    pub store: PathBuf,

    /// Oldest article timestamp to keep; pagination stops past it
    #[arg(long, env = "ESPI_CRAWL_SINCE", default_value = "2024-01-01 00:00:00", value_parser = parse_since)]
    pub since: NaiveDateTime,

    /// Pause between listing pages
    #[arg(long, default_value_t = 1000)]
    pub page_delay_ms: u64,

    /// Pause between article fetches
    #[arg(long, default_value_t = 1000)]
    pub article_delay_ms: u64,

    /// Stop after this many listing pages per company
    #[arg(long)]
    pub max_pages: Option<u32>,
}

fn parse_since(value: &str) -> Result<NaiveDateTime, String> {
    SINCE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value.trim(), fmt).ok())
        .ok_or_else(|| format!("expected a timestamp like 2024-01-01 00:00:00, got {value:?}"))
}

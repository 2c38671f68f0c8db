//! ESPI/EBI disclosure listings.
//!
//! Each company has a listing page at
//! `https://www.stockwatch.pl/gpw/{name},komunikaty,wskazniki.aspx` with a
//! `table.cctabdt` whose rows look like:
//!
//! ```text
//! <tr><td>2024-05-05</td><td>ESPI</td><td><a href="/...">Title</a></td></tr>
//! ```
//!
//! Rows are turned into [`RowOutcome`]s so callers can see why a row was
//! dropped instead of losing that information.

use crate::models::{Company, DateWindow, Report};
use crate::scrapers::client::PageSource;
use crate::utils::{SITE_ORIGIN, absolute_link, collapse_whitespace};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, instrument};

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table.cctabdt").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

/// Why a table row did not produce a [`Report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSkip {
    /// Fewer than three `td` cells (header rows, separators).
    TooFewCells,
    /// First cell is not a `YYYY-MM-DD` date.
    BadDate(String),
    OutOfWindow(NaiveDate),
    /// Third cell has no anchor, or the anchor has no usable `href`.
    MissingLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Report(Report),
    Skipped(RowSkip),
}

/// Result of scanning one listing page.
#[derive(Debug, Default)]
pub struct TableScan {
    pub table_found: bool,
    pub reports: Vec<Report>,
    pub skipped: Vec<RowSkip>,
}

/// Listing URL for a company; the name is lower-cased into the path.
pub fn listing_url(company_name: &str) -> String {
    format!(
        "{}/gpw/{},komunikaty,wskazniki.aspx",
        SITE_ORIGIN,
        company_name.to_lowercase()
    )
}

/// Classify a single `tr`.
fn parse_row(row: ElementRef<'_>, company: &str, window: &DateWindow<NaiveDate>) -> RowOutcome {
    let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
    if cells.len() < 3 {
        return RowOutcome::Skipped(RowSkip::TooFewCells);
    }

    let date_text = collapse_whitespace(&cells[0].text().collect::<String>());
    let date = match NaiveDate::parse_from_str(&date_text, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => return RowOutcome::Skipped(RowSkip::BadDate(date_text)),
    };
    if !window.contains(date) {
        return RowOutcome::Skipped(RowSkip::OutOfWindow(date));
    }

    let Some(anchor) = cells[2].select(&ANCHOR).next() else {
        return RowOutcome::Skipped(RowSkip::MissingLink);
    };
    let Some(link) = anchor.value().attr("href").and_then(absolute_link) else {
        return RowOutcome::Skipped(RowSkip::MissingLink);
    };

    RowOutcome::Report(Report {
        company: company.to_string(),
        date,
        title: collapse_whitespace(&anchor.text().collect::<String>()),
        link,
    })
}

/// Extract in-window reports from listing markup, preserving row order.
pub fn parse_listing(html: &str, company: &str, window: &DateWindow<NaiveDate>) -> TableScan {
    let document = Html::parse_document(html);
    let Some(table) = document.select(&TABLE).next() else {
        return TableScan::default();
    };

    let mut scan = TableScan {
        table_found: true,
        ..TableScan::default()
    };
    for row in table.select(&ROW) {
        match parse_row(row, company, window) {
            RowOutcome::Report(report) => scan.reports.push(report),
            RowOutcome::Skipped(reason) => scan.skipped.push(reason),
        }
    }
    scan
}

/// Fetch and parse one company's listing.
///
/// Any fetch failure is logged and yields no reports.
#[instrument(level = "info", skip_all, fields(company = %company.name, ticker = %company.ticker))]
pub async fn fetch_reports<S: PageSource>(
    source: &S,
    company: &Company,
    window: &DateWindow<NaiveDate>,
) -> Vec<Report> {
    let url = listing_url(&company.name);
    let html = match source.fetch(&url).await {
        Ok(html) => html,
        Err(e) => {
            error!(%url, error = %e, "Failed to fetch report listing");
            return Vec::new();
        }
    };

    let scan = parse_listing(&html, &company.name, window);
    if !scan.table_found {
        info!(%url, "No report table on listing page");
        return Vec::new();
    }
    for reason in &scan.skipped {
        debug!(?reason, "Skipped listing row");
    }
    for report in &scan.reports {
        debug!(date = %report.date, title = %report.title, "Found report");
    }
    info!(
        found = scan.reports.len(),
        skipped = scan.skipped.len(),
        "Scanned report listing"
    );
    scan.reports
}

/// Collect reports for every company, in configuration order.
pub async fn collect_reports<S: PageSource>(
    source: &S,
    companies: &[Company],
    window: &DateWindow<NaiveDate>,
) -> Vec<Report> {
    let mut all = Vec::new();
    for company in companies {
        all.extend(fetch_reports(source, company, window).await);
    }
    info!(total = all.len(), companies = companies.len(), "Collected reports");
    all
}

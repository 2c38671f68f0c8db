//! Company news crawler.
//!
//! News for a ticker is listed newest-first at
//! `https://www.stockwatch.pl/wiadomosci/walor/{ticker}?page={n}`. The crawler
//! walks pages from `n = 1` and stops on the first of:
//!
//! - a page with no summary blocks ([`StopReason::Exhausted`])
//! - a block older than the window start ([`StopReason::ReachedOlder`]);
//!   the rest of that page is discarded and no further page is requested
//! - a failed page fetch ([`StopReason::FetchFailed`])
//! - the optional page cap ([`StopReason::PageLimit`])
//!
//! Stopping on the first stale block assumes the listing is strictly
//! descending across pages. An out-of-order page would hide newer items
//! behind it.

use crate::models::{ArticleListing, DateWindow};
use crate::scrapers::client::PageSource;
use crate::utils::{SITE_ORIGIN, absolute_link, collapse_whitespace};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

static BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.news-list-item, article.news-item, li.news-item").unwrap());
static TITLE_LINKS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["h2 a[href]", "h3 a[href]", "a.title[href]", "a[href]"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static TIMESTAMP: Lazy<Selector> = Lazy::new(|| Selector::parse("time, .date, .news-date").unwrap());

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Why a summary block was ignored without affecting pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSkip {
    MissingTimestamp,
    BadTimestamp(String),
    MissingLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Matched(ArticleListing),
    /// After the window end; passed over, pagination continues.
    Newer(NaiveDateTime),
    /// Before the window start; ends pagination for the company.
    Older(NaiveDateTime),
    Unparseable(BlockSkip),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    ReachedOlder,
    FetchFailed,
    PageLimit,
}

/// One listing page, scanned up to the first too-old block.
#[derive(Debug, Default)]
pub struct PageScan {
    pub blocks: usize,
    pub listings: Vec<ArticleListing>,
    pub skipped: Vec<BlockSkip>,
    pub newer: usize,
    pub reached_older: bool,
}

/// Everything learned about one company.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub listings: Vec<ArticleListing>,
    pub pages_fetched: u32,
    pub skipped: usize,
    pub stop: StopReason,
}

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub page_delay: Duration,
    pub max_pages: Option<u32>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_secs(1),
            max_pages: None,
        }
    }
}

pub fn news_page_url(ticker: &str, page: u32) -> String {
    format!(
        "{}/wiadomosci/walor/{}?page={}",
        SITE_ORIGIN,
        ticker.to_lowercase(),
        page
    )
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = collapse_whitespace(raw);
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
}

fn block_timestamp(block: ElementRef<'_>) -> Result<NaiveDateTime, BlockSkip> {
    let element = block
        .select(&TIMESTAMP)
        .next()
        .ok_or(BlockSkip::MissingTimestamp)?;
    if let Some(ts) = element.value().attr("datetime").and_then(parse_timestamp) {
        return Ok(ts);
    }
    let text = element.text().collect::<String>();
    parse_timestamp(&text).ok_or_else(|| BlockSkip::BadTimestamp(collapse_whitespace(&text)))
}

fn title_link(block: ElementRef<'_>) -> Option<(String, String)> {
    TITLE_LINKS.iter().find_map(|selector| {
        let anchor = block.select(selector).next()?;
        let link = anchor.value().attr("href").and_then(absolute_link)?;
        let title = collapse_whitespace(&anchor.text().collect::<String>());
        (!title.is_empty()).then_some((title, link))
    })
}

/// Classify one summary block against the window.
pub fn classify_block(
    block: ElementRef<'_>,
    company: &str,
    window: &DateWindow<NaiveDateTime>,
) -> BlockOutcome {
    let date = match block_timestamp(block) {
        Ok(date) => date,
        Err(reason) => return BlockOutcome::Unparseable(reason),
    };
    if date < window.start() {
        return BlockOutcome::Older(date);
    }
    if date > window.end() {
        return BlockOutcome::Newer(date);
    }
    match title_link(block) {
        Some((title, link)) => BlockOutcome::Matched(ArticleListing {
            company: company.to_string(),
            title,
            date,
            link,
        }),
        None => BlockOutcome::Unparseable(BlockSkip::MissingLink),
    }
}

pub fn scan_page(html: &str, company: &str, window: &DateWindow<NaiveDateTime>) -> PageScan {
    let document = Html::parse_document(html);
    let mut scan = PageScan::default();
    for block in document.select(&BLOCK) {
        scan.blocks += 1;
        match classify_block(block, company, window) {
            BlockOutcome::Matched(listing) => scan.listings.push(listing),
            BlockOutcome::Newer(date) => {
                debug!(%date, "Passing over news newer than the window");
                scan.newer += 1;
            }
            BlockOutcome::Unparseable(reason) => {
                debug!(?reason, "Skipped news block");
                scan.skipped.push(reason);
            }
            BlockOutcome::Older(date) => {
                debug!(%date, "Reached news older than the window");
                scan.reached_older = true;
                break;
            }
        }
    }
    scan
}

/// Paginate through one company's news listing.
#[instrument(level = "info", skip(source, window, options))]
pub async fn crawl_company<S: PageSource>(
    source: &S,
    ticker: &str,
    window: &DateWindow<NaiveDateTime>,
    options: &CrawlOptions,
) -> CrawlOutcome {
    let mut listings = Vec::new();
    let mut skipped = 0;
    let mut pages_fetched = 0u32;

    let stop = loop {
        if options.max_pages.is_some_and(|max| pages_fetched >= max) {
            break StopReason::PageLimit;
        }
        if pages_fetched > 0 {
            sleep(options.page_delay).await;
        }

        let page = pages_fetched + 1;
        let url = news_page_url(ticker, page);
        let html = match source.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "Failed to fetch news page");
                break StopReason::FetchFailed;
            }
        };
        pages_fetched = page;

        let scan = scan_page(&html, ticker, window);
        debug!(
            page,
            blocks = scan.blocks,
            matched = scan.listings.len(),
            newer = scan.newer,
            "Scanned news page"
        );
        listings.extend(scan.listings);
        skipped += scan.skipped.len();

        if scan.blocks == 0 {
            break StopReason::Exhausted;
        }
        if scan.reached_older {
            break StopReason::ReachedOlder;
        }
    };

    info!(
        found = listings.len(),
        pages = pages_fetched,
        skipped,
        ?stop,
        "Finished news pagination"
    );
    CrawlOutcome {
        listings,
        pages_fetched,
        skipped,
        stop,
    }
}

/// Crawl every ticker in order and return all listings found.
pub async fn crawl_all<S: PageSource>(
    source: &S,
    tickers: &[String],
    window: &DateWindow<NaiveDateTime>,
    options: &CrawlOptions,
) -> Vec<ArticleListing> {
    let mut all = Vec::new();
    for ticker in tickers {
        let outcome = crawl_company(source, ticker, window, options).await;
        if outcome.stop == StopReason::FetchFailed && outcome.pages_fetched == 0 {
            warn!(%ticker, "No news pages could be fetched");
        }
        debug!(%ticker, skipped = outcome.skipped, "Company crawl done");
        all.extend(outcome.listings);
    }
    info!(total = all.len(), tickers = tickers.len(), "Collected news listings");
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::client::fake::FakeSource;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn window() -> DateWindow<NaiveDateTime> {
        DateWindow::new(ts("2024-05-01 00:00:00"), ts("2024-05-10 12:00:00")).unwrap()
    }

    fn options() -> CrawlOptions {
        CrawlOptions {
            page_delay: Duration::ZERO,
            max_pages: None,
        }
    }

    fn page(items: &[(&str, &str, &str)]) -> String {
        let blocks: String = items
            .iter()
            .map(|(when, title, href)| {
                format!(
                    r#"<div class="news-list-item"><span class="date">{when}</span><h2><a href="{href}">{title}</a></h2><p>lead</p></div>"#
                )
            })
            .collect();
        format!("<html><body><div class=\"news-list\">{blocks}</div></body></html>")
    }

    #[test]
    fn test_news_page_url() {
        assert_eq!(
            news_page_url("PKN", 3),
            "https://www.stockwatch.pl/wiadomosci/walor/pkn?page=3"
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-05-05 10:15:30"), Some(ts("2024-05-05 10:15:30")));
        assert_eq!(parse_timestamp(" 2024-05-05 10:15 "), Some(ts("2024-05-05 10:15:00")));
        assert_eq!(parse_timestamp("05.05.2024 10:15"), Some(ts("2024-05-05 10:15:00")));
        assert_eq!(parse_timestamp("wczoraj"), None);
    }

    #[test]
    fn test_datetime_attribute_wins_over_text() {
        let html = r#"<article class="news-item"><time datetime="2024-05-03T09:00:00">3 maja</time><a class="title" href="/n/1">Tytuł</a></article>"#;
        let scan = scan_page(html, "PKN", &window());
        assert_eq!(scan.listings.len(), 1);
        assert_eq!(scan.listings[0].date, ts("2024-05-03 09:00:00"));
        assert_eq!(scan.listings[0].link, "https://www.stockwatch.pl/n/1");
    }

    #[test]
    fn test_newer_items_pass_through() {
        let html = page(&[
            ("2024-05-11 08:00:00", "too new", "/n/3"),
            ("2024-05-05 10:00:00", "in window", "/n/2"),
        ]);
        let scan = scan_page(&html, "PKN", &window());
        assert_eq!(scan.newer, 1);
        assert_eq!(scan.listings.len(), 1);
        assert_eq!(scan.listings[0].title, "in window");
        assert!(!scan.reached_older);
    }

    #[test]
    fn test_unparseable_blocks_do_not_stop_scan() {
        let html = r#"<div class="news-list-item"><h2><a href="/n/9">no date</a></h2></div>
            <div class="news-list-item"><span class="date">dzisiaj</span><h2><a href="/n/8">bad date</a></h2></div>
            <div class="news-list-item"><span class="date">2024-05-04 12:00:00</span></div>
            <div class="news-list-item"><span class="date">2024-05-04 11:00:00</span><h2><a href="/n/7">ok</a></h2></div>"#;
        let scan = scan_page(html, "PKN", &window());
        assert_eq!(
            scan.skipped,
            vec![
                BlockSkip::MissingTimestamp,
                BlockSkip::BadTimestamp("dzisiaj".to_string()),
                BlockSkip::MissingLink,
            ]
        );
        assert_eq!(scan.listings.len(), 1);
        assert_eq!(scan.blocks, 4);
    }

    #[tokio::test]
    async fn test_stops_on_first_older_item_without_fetching_next_page() {
        let source = FakeSource::new()
            .with_page(
                &news_page_url("PKN", 1),
                &page(&[
                    ("2024-05-09 10:00:00", "a", "/n/1"),
                    ("2024-05-08 10:00:00", "b", "/n/2"),
                ]),
            )
            .with_page(
                &news_page_url("PKN", 2),
                &page(&[
                    ("2024-05-02 10:00:00", "c", "/n/3"),
                    ("2024-04-30 23:59:59", "too old", "/n/4"),
                    ("2024-05-01 08:00:00", "after stale", "/n/5"),
                ]),
            )
            .with_page(&news_page_url("PKN", 3), &page(&[("2024-04-01 10:00:00", "d", "/n/6")]));

        let outcome = crawl_company(&source, "PKN", &window(), &options()).await;

        let titles: Vec<&str> = outcome.listings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(outcome.stop, StopReason::ReachedOlder);
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(
            source.requested(),
            vec![news_page_url("PKN", 1), news_page_url("PKN", 2)]
        );
    }

    #[tokio::test]
    async fn test_empty_page_ends_pagination() {
        let source = FakeSource::new()
            .with_page(&news_page_url("KGH", 1), &page(&[("2024-05-09 10:00:00", "a", "/n/1")]))
            .with_page(&news_page_url("KGH", 2), "<html><body><p>Brak wiadomości</p></body></html>");

        let outcome = crawl_company(&source, "KGH", &window(), &options()).await;
        assert_eq!(outcome.stop, StopReason::Exhausted);
        assert_eq!(outcome.listings.len(), 1);
        assert_eq!(outcome.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_ends_company_only() {
        let source = FakeSource::new()
            .with_page(&news_page_url("PZU", 1), &page(&[("2024-05-09 10:00:00", "pzu", "/n/1")]))
            .with_page(&news_page_url("PZU", 2), "<html></html>");
        let tickers = vec!["KGH".to_string(), "PZU".to_string()];

        let listings = crawl_all(&source, &tickers, &window(), &options()).await;
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].company, "PZU");
    }

    #[tokio::test]
    async fn test_page_limit() {
        let source = FakeSource::new()
            .with_page(&news_page_url("PKN", 1), &page(&[("2024-05-09 10:00:00", "a", "/n/1")]))
            .with_page(&news_page_url("PKN", 2), &page(&[("2024-05-08 10:00:00", "b", "/n/2")]));
        let options = CrawlOptions {
            max_pages: Some(1),
            ..options()
        };

        let outcome = crawl_company(&source, "PKN", &window(), &options).await;
        assert_eq!(outcome.stop, StopReason::PageLimit);
        assert_eq!(outcome.pages_fetched, 1);
        assert_eq!(source.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_page_limit_returns_without_waiting() {
        let source = FakeSource::new()
            .with_page(&news_page_url("PKN", 1), &page(&[("2024-05-09 10:00:00", "a", "/n/1")]));
        let options = CrawlOptions {
            page_delay: Duration::from_secs(30),
            max_pages: Some(1),
        };

        let started = std::time::Instant::now();
        let outcome = crawl_company(&source, "PKN", &window(), &options).await;
        assert_eq!(outcome.stop, StopReason::PageLimit);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_zero_page_limit_fetches_nothing() {
        let source = FakeSource::new();
        let options = CrawlOptions {
            max_pages: Some(0),
            ..options()
        };
        let outcome = crawl_company(&source, "PKN", &window(), &options).await;
        assert_eq!(outcome.stop, StopReason::PageLimit);
        assert_eq!(outcome.pages_fetched, 0);
        assert!(source.requested().is_empty());
    }
}

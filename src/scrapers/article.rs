//! Article body extraction.
//!
//! The site serves news articles from more than one template, so the body is
//! looked up with an ordered list of [`ExtractionStrategy`] values and the
//! first strategy with non-empty text wins. When nothing matches, or the page
//! cannot be fetched, the body becomes a sentinel string and the article is
//! still kept.

use crate::models::{Article, ArticleListing};
use crate::scrapers::client::PageSource;
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use std::error::Error;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Body stored when no strategy matches the page.
pub const BODY_NOT_FOUND: &str = "[body extraction failed: no known content layout matched]";

/// Body stored when the article page could not be fetched.
pub fn body_fetch_failed(error: &dyn Error) -> String {
    format!("[body fetch failed: {error}]")
}

/// Whether `body` is one of the failure sentinels rather than article text.
pub fn is_sentinel(body: &str) -> bool {
    body == BODY_NOT_FOUND || body.starts_with("[body fetch failed: ")
}

/// A named CSS selector for one article template.
#[derive(Debug, Clone)]
pub struct ExtractionStrategy {
    pub name: &'static str,
    selector: Selector,
}

impl ExtractionStrategy {
    pub fn new(name: &'static str, css: &str) -> Result<Self, Box<dyn Error>> {
        let selector = Selector::parse(css).map_err(|e| format!("invalid selector {css:?}: {e}"))?;
        Ok(Self { name, selector })
    }

    /// Text of the first matching element, one trimmed text node per line.
    pub fn extract(&self, document: &Html) -> Option<String> {
        let element = document.select(&self.selector).next()?;
        let text = element
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        (!text.is_empty()).then_some(text)
    }
}

/// Strategies for the templates seen so far, primary layout first.
pub fn default_strategies() -> Vec<ExtractionStrategy> {
    [
        ("article-content", "div.article-content"),
        ("article-body", "div#articleBody"),
        ("article-section", "article .content"),
    ]
    .into_iter()
    .filter_map(|(name, css)| ExtractionStrategy::new(name, css).ok())
    .collect()
}

/// Try each strategy in order; `None` when the page matches none of them.
pub fn extract_body(html: &str, strategies: &[ExtractionStrategy]) -> Option<(&'static str, String)> {
    let document = Html::parse_document(html);
    strategies
        .iter()
        .find_map(|s| s.extract(&document).map(|text| (s.name, text)))
}

/// Fetch one article page and return its body or a sentinel.
#[instrument(level = "info", skip(source, strategies))]
pub async fn fetch_body<S: PageSource>(
    source: &S,
    url: &str,
    strategies: &[ExtractionStrategy],
) -> String {
    let html = match source.fetch(url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, "Article fetch failed");
            return body_fetch_failed(&*e);
        }
    };
    match extract_body(&html, strategies) {
        Some((strategy, body)) => {
            debug!(strategy, bytes = body.len(), preview = %truncate_for_log(&body, 80), "Extracted article body");
            body
        }
        None => {
            warn!("No extraction strategy matched the article page");
            BODY_NOT_FOUND.to_string()
        }
    }
}

/// Fetch bodies for all listings, one at a time with `delay` between requests.
///
/// Every listing produces an [`Article`], whatever happened to its body.
#[instrument(level = "info", skip_all, fields(count = listings.len()))]
pub async fn fetch_articles<S: PageSource>(
    source: &S,
    listings: Vec<ArticleListing>,
    strategies: &[ExtractionStrategy],
    delay: Duration,
) -> Vec<Article> {
    let articles: Vec<Article> = stream::iter(listings.into_iter().enumerate())
        .then(|(i, listing)| async move {
            if i > 0 {
                sleep(delay).await;
            }
            let body = fetch_body(source, &listing.link, strategies).await;
            Article::from_listing(listing, body)
        })
        .collect()
        .await;

    let failed = articles.iter().filter(|a| is_sentinel(&a.body)).count();
    info!(fetched = articles.len(), failed, "Fetched article bodies");
    articles
}

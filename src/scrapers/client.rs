//! HTTP access to stockwatch.pl.
//!
//! Scrapers talk to the network through the [`PageSource`] trait so the
//! parsing and pagination logic can run against canned pages in tests.
//! [`HttpFetcher`] is the real implementation.
//!
//! # TLS
//!
//! Certificate verification is **disabled** unless the caller opts in. The
//! site has served incomplete certificate chains in the past and the job is
//! expected to keep running through that; the client logs a warning whenever
//! it is built in this mode.

use reqwest::Client;
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Browser-like User-Agent; the site serves a reduced page to unknown agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Something that can turn a URL into page markup.
pub trait PageSource {
    /// Fetch `url` and return the response body as text.
    ///
    /// Transport errors and non-2xx statuses are both reported as `Err`.
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// [`PageSource`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(verify_tls: bool) -> Result<Self, Box<dyn Error>> {
        if !verify_tls {
            warn!("TLS certificate verification is disabled for scraped pages");
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

//! Append-only CSV archive of crawled articles.
//!
//! Columns are `company,title,date,link,body`. The header is written only when
//! the file is created; every later run appends. Rows are never compared with
//! what is already stored, so overlapping crawls leave duplicates for
//! consumers to collapse.

use crate::models::Article;
use std::error::Error;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

pub const HEADER: [&str; 5] = ["company", "title", "date", "link", "body"];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append `articles` to the store at `path` and return how many rows were written.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = articles.len()))]
pub async fn append_articles(path: &Path, articles: &[Article]) -> Result<usize, Box<dyn Error>> {
    let existed = fs::try_exists(path).await?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    if !existed {
        writer.write_record(HEADER)?;
    }
    for article in articles {
        let date = article.date.format(DATE_FORMAT).to_string();
        writer.write_record([
            article.company.as_str(),
            article.title.as_str(),
            date.as_str(),
            article.link.as_str(),
            article.body.as_str(),
        ])?;
    }
    let rows = writer.into_inner().map_err(|e| e.into_error())?;

    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(&rows).await?;
    file.flush().await?;

    info!(new_file = !existed, "Appended articles to CSV store");
    Ok(articles.len())
}

//! JSON export of a report run.
//!
//! Same data as the HTML report, for tools that want to consume it:
//!
//! ```json
//! {
//!   "generated_at": "2024-05-08T07:30:00",
//!   "window": { "start": "2024-05-01", "end": "2024-05-08" },
//!   "companies": ["Orlen"],
//!   "reports": [{ "company": "Orlen", "date": "2024-05-05", "title": "...", "link": "..." }]
//! }
//! ```

use crate::models::{DateWindow, Report};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
pub struct ReportExport<'a> {
    pub generated_at: NaiveDateTime,
    pub window: DateWindow<NaiveDate>,
    pub companies: &'a [String],
    pub reports: &'a [Report],
}

/// Serialize `export` and write it to `path`, replacing any previous file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), reports = export.reports.len()))]
pub async fn write_export(export: &ReportExport<'_>, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(export)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, json).await?;
    info!("Wrote JSON export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("reports.json");
        let day = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
        let companies = vec!["Orlen".to_string()];
        let reports = vec![Report {
            company: "Orlen".to_string(),
            date: day,
            title: "Quarterly results".to_string(),
            link: "https://www.stockwatch.pl/r/1".to_string(),
        }];
        let export = ReportExport {
            generated_at: day.and_hms_opt(8, 0, 0).unwrap(),
            window: DateWindow::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), day).unwrap(),
            companies: &companies,
            reports: &reports,
        };

        write_export(&export, &path).await.unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["window"]["start"], "2024-05-01");
        assert_eq!(value["reports"][0]["date"], "2024-05-05");
        assert_eq!(value["companies"][0], "Orlen");
    }
}

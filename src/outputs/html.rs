//! Self-contained HTML report.
//!
//! Reports are grouped per company, companies appear in monitoring order and
//! only when they have at least one report, and each group is sorted newest
//! first. All styles are inline so the file can be mailed as-is.

use crate::models::{DateWindow, Report};
use chrono::{NaiveDate, NaiveDateTime};
use html_escape::{encode_double_quoted_attribute, encode_text};
use itertools::Itertools;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const STYLE: &str = "body{font-family:Segoe UI,system-ui,sans-serif;margin:0;background-color:#f0f2f5}.container{max-width:850px;margin:2em auto;padding:1em 2em;background-color:#fff;border:1px solid #ddd;border-radius:8px;box-shadow:0 2px 5px rgba(0,0,0,0.05)}h1{color:#1d2d44;border-bottom:2px solid #e0e0e0;padding-bottom:0.5em}h2{font-size:1.1em;color:#555;font-weight:normal;line-height:1.6;}.company-header{font-size:1.5em;color:#005a87;margin-top:2em;margin-bottom:1em;padding-bottom:0.3em;border-bottom:2px solid #005a87}.report-item{border-bottom:1px solid #eee;padding:1.2em .5em;display:flex;align-items:center}.report-item:last-child{border-bottom:none}.report-date{font-weight:600;color:#333;margin-right:1.5em;min-width:100px}.report-title a{text-decoration:none;color:#0d6efd;font-size:1.05em;font-weight:500}.report-title a:hover{text-decoration:underline}.footer{text-align:center;margin-top:2em;color:#888;font-size:.9em}";

/// Which document is being produced; only the footer wording differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Mailed report (`raport_gieldowy.html`).
    Report,
    /// Static page (`index.html`).
    Page,
}

impl ReportKind {
    fn footer_label(self) -> &'static str {
        match self {
            ReportKind::Report => "Raport wygenerowano",
            ReportKind::Page => "Strona wygenerowana",
        }
    }
}

/// Inputs for [`render_report`].
#[derive(Debug)]
pub struct ReportContext<'a> {
    pub kind: ReportKind,
    /// Company names in monitoring order.
    pub companies: &'a [String],
    pub window: DateWindow<NaiveDate>,
    pub window_days: u32,
    pub generated_at: NaiveDateTime,
}

/// Group reports by company in monitoring order, newest first within a group.
/// Companies without reports are left out.
pub fn group_reports<'r>(reports: &'r [Report], companies: &[String]) -> Vec<(String, Vec<&'r Report>)> {
    let mut by_company: HashMap<&str, Vec<&Report>> = reports
        .iter()
        .map(|r| (r.company.as_str(), r))
        .into_group_map();

    companies
        .iter()
        .unique()
        .filter_map(|name| {
            let mut group = by_company.remove(name.as_str())?;
            group.sort_by(|a, b| b.date.cmp(&a.date));
            Some((name.clone(), group))
        })
        .collect()
}

pub fn render_report(reports: &[Report], ctx: &ReportContext<'_>) -> String {
    let names = encode_text(&ctx.companies.join(", ")).into_owned();
    let start = ctx.window.start().format("%Y-%m-%d");
    let end = ctx.window.end().format("%Y-%m-%d");

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html><html lang="pl"><head><meta charset="UTF-8"><title>Raporty ESPI/EBI dla {names}</title>
<style>{STYLE}</style>
</head><body><div class="container"><h1>Raporty bieżące i okresowe</h1>
<h2>
    Monitorowane spółki: {names}<br>
    Okres: Ostatnie <b>{days} dni</b> (od {start} do {end})
</h2>
"#,
        days = ctx.window_days,
    );

    if reports.is_empty() {
        html.push_str("<p><strong>Nie znaleziono żadnych nowych raportów w zadanym okresie.</strong></p>\n");
    } else {
        for (company, group) in group_reports(reports, ctx.companies) {
            let _ = writeln!(html, r#"<div class="company-header">{}</div>"#, encode_text(&company));
            for report in group {
                let _ = writeln!(
                    html,
                    r#"<div class="report-item">
    <div class="report-date">{}</div>
    <div class="report-title"><a href="{}" target="_blank" rel="noopener noreferrer">{}</a></div>
</div>"#,
                    report.date.format("%Y-%m-%d"),
                    encode_double_quoted_attribute(&report.link),
                    encode_text(&report.title),
                );
            }
        }
    }

    let _ = write!(
        html,
        r#"<div class="footer">{}: {}</div></div></body></html>
"#,
        ctx.kind.footer_label(),
        ctx.generated_at.format("%Y-%m-%d %H:%M:%S"),
    );
    html
}

/// Write the rendered report in a single call, replacing any previous file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), bytes = html.len()))]
pub async fn write_report(path: &Path, html: &str) -> Result<(), Box<dyn Error>> {
    fs::write(path, html).await?;
    info!("Wrote HTML report");
    Ok(())
}

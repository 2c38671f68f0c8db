//! Line-oriented configuration files and the run-wide [`Settings`].
//!
//! All three files share the same rules: UTF-8, one entry per line, blank
//! lines skipped, and lines whose trimmed form starts with `#` treated as
//! comments.

use crate::cli::Cli;
use crate::models::Company;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

/// Older deployments export the Gmail app password under this name.
const LEGACY_PASSWORD_ENV: &str = "GMAIL_APP_PASSWORD";

/// SMTP login used by [`crate::notify::EmailNotifier`].
#[derive(Clone)]
pub struct MailCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailCredentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Settings for the `report` and `page` flows, resolved once from the CLI.
#[derive(Debug, Clone)]
pub struct Settings {
    pub window_days: u32,
    pub output_path: PathBuf,
    pub companies_path: PathBuf,
    pub recipients_path: PathBuf,
    pub json_output_path: Option<PathBuf>,
    /// `None` when either the user or the password is unset.
    pub mail: Option<MailCredentials>,
}

/// Credentials are usable only when both the login and the password are non-empty.
pub fn mail_credentials(host: &str, user: Option<&str>, password: Option<&str>) -> Option<MailCredentials> {
    match (user, password) {
        (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
            Some(MailCredentials {
                host: host.to_string(),
                user: user.to_string(),
                password: password.to_string(),
            })
        }
        _ => None,
    }
}

impl Settings {
    pub fn from_cli(cli: &Cli, output_path: PathBuf) -> Self {
        let password = cli
            .smtp_password
            .clone()
            .or_else(|| std::env::var(LEGACY_PASSWORD_ENV).ok());
        let mail = mail_credentials(&cli.smtp_host, cli.smtp_user.as_deref(), password.as_deref());

        Self {
            window_days: cli.days,
            output_path,
            companies_path: cli.companies.clone(),
            recipients_path: cli.recipients.clone(),
            json_output_path: cli.json_output.clone(),
            mail,
        }
    }
}

/// Yield the meaningful lines of a config file, trimmed.
fn entries(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Parse `name,ticker` lines. Lines that do not split into exactly two parts
/// are skipped with a warning.
pub fn parse_companies(content: &str) -> Vec<Company> {
    let mut companies = Vec::new();
    for line in entries(content) {
        let parts: Vec<&str> = line.split(',').collect();
        match parts.as_slice() {
            [name, ticker] => companies.push(Company {
                name: name.trim().to_string(),
                ticker: ticker.trim().to_string(),
            }),
            _ => warn!(%line, "Skipping malformed company line"),
        }
    }
    companies
}

/// Parse bare identifiers, one per line (e-mail addresses).
pub fn parse_lines(content: &str) -> Vec<String> {
    entries(content).map(str::to_string).collect()
}

/// Parse crawler tickers.
///
/// Accepts bare tickers and the `name,ticker` lines of the company file, so
/// both flows can share `spolki.txt`. Anything else is skipped with a warning.
pub fn parse_tickers(content: &str) -> Vec<String> {
    let mut tickers = Vec::new();
    for line in entries(content) {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [ticker] | [_, ticker] if !ticker.is_empty() => tickers.push(ticker.to_string()),
            _ => warn!(%line, "Skipping malformed ticker line"),
        }
    }
    tickers
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_companies(path: &Path) -> Result<Vec<Company>, Box<dyn Error>> {
    let content = fs::read_to_string(path).await?;
    let companies = parse_companies(&content);
    info!(count = companies.len(), "Loaded companies");
    Ok(companies)
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_tickers(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let content = fs::read_to_string(path).await?;
    let tickers = parse_tickers(&content);
    info!(count = tickers.len(), "Loaded tickers");
    Ok(tickers)
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_recipients(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let content = fs::read_to_string(path).await?;
    let recipients = parse_lines(&content);
    info!(count = recipients.len(), "Loaded recipients");
    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_whitespace_around_fields_is_ignored() {
        let padded = parse_companies("  AAPL , aapl  \n");
        let tight = parse_companies("AAPL,aapl\n");
        assert_eq!(padded, tight);
        assert_eq!(padded[0].name, "AAPL");
        assert_eq!(padded[0].ticker, "aapl");
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let content = "# monitored\n\nOrlen,PKN\n   # indented comment\nKGHM,KGH\n";
        let companies = parse_companies(content);
        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].name, "Orlen");
        assert_eq!(companies[1].ticker, "KGH");
    }

    #[test]
    fn test_malformed_company_lines_are_dropped() {
        let content = "Orlen\nKGHM,KGH,extra\nPZU,PZU\n";
        let companies = parse_companies(content);
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "PZU");
    }

    #[test]
    fn test_parse_lines_for_recipients() {
        let content = "jan@example.com\n# ola@example.com\n\n  ewa@example.com  \n";
        assert_eq!(parse_lines(content), vec!["jan@example.com", "ewa@example.com"]);
    }

    #[test]
    fn test_tickers_from_bare_lines() {
        let content = "pkn\n# kgh\n\n  pzu  \n";
        assert_eq!(parse_tickers(content), vec!["pkn", "pzu"]);
    }

    #[test]
    fn test_tickers_from_company_file_take_second_field() {
        let content = "Orlen,PKN\n KGHM , KGH \nCDR\n";
        assert_eq!(parse_tickers(content), vec!["PKN", "KGH", "CDR"]);
    }

    #[test]
    fn test_malformed_ticker_lines_are_dropped() {
        let content = "Orlen,\nA,B,C\nPZU\n";
        assert_eq!(parse_tickers(content), vec!["PZU"]);
    }

    #[tokio::test]
    async fn test_load_tickers_from_company_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spolki.txt");
        std::fs::write(&path, "Orlen,PKN\nKGHM,KGH\n").unwrap();
        assert_eq!(load_tickers(&path).await.unwrap(), vec!["PKN", "KGH"]);
    }

    #[tokio::test]
    async fn test_load_companies_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spolki.txt");
        std::fs::write(&path, "Orlen,PKN\n").unwrap();

        let companies = load_companies(&path).await.unwrap();
        assert_eq!(
            companies,
            vec![Company {
                name: "Orlen".to_string(),
                ticker: "PKN".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_recipients(&dir.path().join("odbiorcy.txt")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_mail_needs_user_and_password() {
        assert!(mail_credentials("smtp.example.com", Some("me@example.com"), None).is_none());
        assert!(mail_credentials("smtp.example.com", None, Some("secret")).is_none());
        assert!(mail_credentials("smtp.example.com", Some("me@example.com"), Some("")).is_none());
        assert!(mail_credentials("smtp.example.com", Some(""), Some("secret")).is_none());

        let mail = mail_credentials("smtp.example.com", Some("me@example.com"), Some("secret")).unwrap();
        assert_eq!(mail.host, "smtp.example.com");
        assert_eq!(mail.password, "secret");
    }

    #[test]
    fn test_settings_with_full_credentials() {
        let cli = Cli::parse_from([
            "espi_watch",
            "--smtp-host",
            "smtp.gmail.com",
            "--smtp-user",
            "me@example.com",
            "--smtp-password",
            "secret",
            "--days",
            "3",
            "report",
        ]);
        let settings = Settings::from_cli(&cli, PathBuf::from("out.html"));
        let mail = settings.mail.unwrap();
        assert_eq!(mail.host, "smtp.gmail.com");
        assert_eq!(mail.user, "me@example.com");
        assert_eq!(settings.window_days, 3);
        assert!(!format!("{mail:?}").contains("secret"));
    }
}

//! E-mail delivery of the HTML report.
//!
//! Sends over SMTP with STARTTLS (Gmail on port 587 by default). Delivery is
//! optional: with no credentials or no valid recipients the step is logged and
//! skipped.

use crate::config::MailCredentials;
use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::{AsyncSmtpTransport, authentication::Credentials};
use lettre::{AsyncTransport, Tokio1Executor};
use std::error::Error;
use tracing::{info, instrument, warn};

/// Subject line naming the monitored companies.
pub fn report_subject(companies: &[String]) -> String {
    format!("Raport Giełdowy: Nowe komunikaty dla {}", companies.join(", "))
}

/// Parse recipient addresses, dropping the ones that are not valid mailboxes.
pub fn parse_recipients(recipients: &[String]) -> Vec<Mailbox> {
    recipients
        .iter()
        .filter_map(|addr| match addr.parse::<Mailbox>() {
            Ok(mailbox) => Some(mailbox),
            Err(e) => {
                warn!(%addr, error = %e, "Skipping invalid recipient address");
                None
            }
        })
        .collect()
}

/// Build an HTML message addressed to every recipient.
pub fn build_message(
    from: Mailbox,
    to: &[Mailbox],
    subject: &str,
    html: &str,
) -> Result<Message, Box<dyn Error>> {
    let mut builder = Message::builder()
        .from(from)
        .subject(subject)
        .header(ContentType::TEXT_HTML);
    for mailbox in to {
        builder = builder.to(mailbox.clone());
    }
    Ok(builder.body(html.to_string())?)
}

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailNotifier {
    pub fn new(credentials: &MailCredentials) -> Result<Self, Box<dyn Error>> {
        let from: Mailbox = credentials.user.parse()?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&credentials.host)?
            .credentials(Credentials::new(
                credentials.user.clone(),
                credentials.password.clone(),
            ))
            .build();
        Ok(Self { mailer, from })
    }

    #[instrument(level = "info", skip_all, fields(recipients = to.len()))]
    pub async fn send_html(&self, to: &[Mailbox], subject: &str, html: &str) -> Result<(), Box<dyn Error>> {
        let message = build_message(self.from.clone(), to, subject, html)?;
        self.mailer.send(message).await?;
        info!("Report e-mail sent");
        Ok(())
    }
}

/// Send the report if mail is configured.
///
/// Returns `Ok(false)` when the step was skipped.
pub async fn send_report(
    credentials: Option<&MailCredentials>,
    recipients: &[String],
    subject: &str,
    html: &str,
) -> Result<bool, Box<dyn Error>> {
    let Some(credentials) = credentials else {
        warn!("Sender credentials are not configured; skipping e-mail");
        return Ok(false);
    };
    let to = parse_recipients(recipients);
    if to.is_empty() {
        warn!("Recipient list is empty; skipping e-mail");
        return Ok(false);
    }
    info!(recipients = to.len(), "Sending report e-mail");
    EmailNotifier::new(credentials)?.send_html(&to, subject, html).await?;
    Ok(true)
}

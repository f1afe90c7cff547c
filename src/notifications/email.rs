//! SMTP delivery of build reports.

use anyhow::Result;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::logs::LogBundle;

use super::BuildReport;

/// SMTP relay and addressing, injected from the environment.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Upgrade the session with STARTTLS. Disable only for local relays.
    pub smtp_tls: bool,
    pub from_address: String,
    pub to_addresses: Vec<String>,
}

/// Sends build reports through a single synchronous SMTP session per
/// recipient: connect, upgrade, authenticate, send, close.
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send the report to every configured recipient, with the log bundle
    /// attached when it has content.
    pub async fn send_report(&self, report: &BuildReport, logs: Option<&LogBundle>) -> Result<()> {
        let mailer = self.transport()?;
        let from: Mailbox = self.config.from_address.parse()?;

        for to_address in &self.config.to_addresses {
            let to: Mailbox = to_address.parse()?;
            let message = build_message(from.clone(), to, report, logs)?;
            mailer.send(message).await?;

            info!(
                to = %to_address,
                subject = %report.subject(),
                "Report email sent"
            );
        }

        Ok(())
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(builder.build())
    }
}

/// Compose one report message: plain + HTML alternatives, plus the log
/// attachment when the bundle has any lines. Empty bundles carry only the
/// header line and are not worth attaching.
fn build_message(
    from: Mailbox,
    to: Mailbox,
    report: &BuildReport,
    logs: Option<&LogBundle>,
) -> Result<Message> {
    let alternative = MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(report.render_text()),
        )
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(report.render_html()),
        );

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(report.subject());

    let message = match logs.filter(|bundle| !bundle.is_empty()) {
        Some(bundle) => {
            let attachment =
                Attachment::new(bundle.attachment_name()).body(bundle.to_text(), ContentType::TEXT_PLAIN);
            builder.multipart(MultiPart::mixed().multipart(alternative).singlepart(attachment))?
        }
        None => builder.multipart(alternative)?,
    };

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebuild::BuildStatus;

    fn mailboxes() -> (Mailbox, Mailbox) {
        (
            "builds@example.com".parse().unwrap(),
            "team@example.com".parse().unwrap(),
        )
    }

    fn report() -> BuildReport {
        BuildReport::new("np", "codebuildtest-np", "codebuildtest-np:0f1e2d3c", BuildStatus::Succeeded)
    }

    #[test]
    fn test_message_without_logs() {
        let (from, to) = mailboxes();
        let message = build_message(from, to, &report(), None).unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("CodeBuild alert for project codebuildtest-np"));
        assert!(raw.contains("SUCCEEDED"));
        assert!(!raw.contains("logs.txt"));
    }

    #[test]
    fn test_message_with_logs_carries_attachment() {
        let (from, to) = mailboxes();
        let bundle = LogBundle::new(
            "codebuildtest-np:0f1e2d3c",
            vec!["phase BUILD".to_string()],
        );
        let message = build_message(from, to, &report(), Some(&bundle)).unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("codebuildtest-np-0f1e2d3c-logs.txt"));
        assert!(raw.contains("phase BUILD"));
    }

    #[test]
    fn test_empty_bundle_omits_attachment() {
        let (from, to) = mailboxes();
        let bundle = LogBundle::new("codebuildtest-np:0f1e2d3c", vec![]);
        let message = build_message(from, to, &report(), Some(&bundle)).unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(!raw.contains("logs.txt"));
        assert!(raw.contains("SUCCEEDED"));
    }
}

//! Report delivery: local HTML/JSON files and outbound email.
//!
//! SMTP sits behind the `SmtpSender` trait so tests never open a socket.
//! Local files are always written before the email is attempted, so a mail
//! outage can never lose a report.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::error::{ConfigError, OutputError};
use crate::report::{DigestReport, render_json};

/// Plain-text body for clients that refuse HTML mail.
const PLAIN_FALLBACK: &str =
    "Your daily RecSys & LLM industry papers digest. View in an HTML-capable email client.";

/// Trait for SMTP sending.
#[async_trait]
pub trait SmtpSender: Send + Sync {
    /// Send one HTML message; returns the transport's response code.
    async fn send_email(&self, to: &str, subject: &str, html_body: &str)
    -> Result<String, String>;
}

/// Real SMTP sender using lettre (STARTTLS relay).
pub struct LettreSmtp {
    host: String,
    port: u16,
    username: String,
    password: String,
    from_address: String,
}

impl LettreSmtp {
    /// Build a sender from config, resolving the password env var.
    pub fn from_config(config: &EmailConfig) -> Result<Self, ConfigError> {
        let password =
            std::env::var(&config.password_env).map_err(|_| ConfigError::EnvVarMissing {
                var: config.password_env.clone(),
            })?;
        Ok(Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            username: config.sender.clone(),
            password,
            from_address: config.sender.clone(),
        })
    }
}

#[async_trait]
impl SmtpSender for LettreSmtp {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<String, String> {
        let email = lettre::Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .multipart(lettre::message::MultiPart::alternative_plain_html(
                PLAIN_FALLBACK.to_string(),
                html_body.to_string(),
            ))
            .map_err(|e| format!("Failed to build email: {e}"))?;

        let creds = lettre::transport::smtp::authentication::Credentials::new(
            self.username.clone(),
            self.password.clone(),
        );

        let mailer =
            lettre::AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|e| format!("SMTP relay error: {e}"))?
                .port(self.port)
                .credentials(creds)
                .build();

        use lettre::AsyncTransport;
        let response = mailer
            .send(email)
            .await
            .map_err(|e| format!("SMTP send error: {e}"))?;

        Ok(format!("{}", response.code()))
    }
}

/// Write the HTML and JSON report files into `dir`, creating it if needed.
/// Returns the path of the HTML file.
pub fn write_report_files(
    report: &DigestReport,
    html: &str,
    dir: &Path,
) -> Result<PathBuf, OutputError> {
    std::fs::create_dir_all(dir).map_err(|e| OutputError::ReportWrite {
        path: dir.to_path_buf(),
        message: format!("Failed to create reports directory: {}", e),
    })?;

    let stem = report.file_stem();
    let html_path = dir.join(format!("{stem}.html"));
    std::fs::write(&html_path, html).map_err(|e| OutputError::ReportWrite {
        path: html_path.clone(),
        message: e.to_string(),
    })?;

    let json_path = dir.join(format!("{stem}.json"));
    let json = render_json(report).map_err(|e| OutputError::ReportWrite {
        path: json_path.clone(),
        message: format!("Failed to serialize report: {}", e),
    })?;
    std::fs::write(&json_path, json).map_err(|e| OutputError::ReportWrite {
        path: json_path.clone(),
        message: e.to_string(),
    })?;

    info!(path = %html_path.display(), "Report saved");
    Ok(html_path)
}

/// Delivery flags from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    pub dry_run: bool,
    pub no_email: bool,
}

/// Deliver a rendered report.
///
/// Dry runs perform no side effect at all. Otherwise the local files are
/// written first; only then is the email attempted, so a transport error
/// surfaces only after the report is safely on disk.
pub async fn dispatch(
    report: &DigestReport,
    html: &str,
    reports_dir: &Path,
    smtp: &dyn SmtpSender,
    recipient: &str,
    opts: DispatchOptions,
) -> Result<Option<PathBuf>, OutputError> {
    if opts.dry_run {
        info!("Dry run: skipping report files, email, and state update");
        return Ok(None);
    }

    let html_path = write_report_files(report, html, reports_dir)?;

    if opts.no_email {
        info!("--no-email: report saved at {}", html_path.display());
        return Ok(Some(html_path));
    }

    let subject = report.email_subject();
    match smtp.send_email(recipient, &subject, html).await {
        Ok(code) => {
            info!(recipient, code = code.as_str(), "Email sent");
            Ok(Some(html_path))
        }
        Err(e) => {
            warn!("Email not sent; report remains at {}", html_path.display());
            Err(OutputError::MailSend { message: e })
        }
    }
}

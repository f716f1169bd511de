//! Mail delivery over SMTP (implicit TLS) via lettre.
//!
//! Delivery is best-effort: every failure is logged at error level and
//! reported as a `DeliveryOutcome`, never propagated.

use std::sync::Arc;
use std::time::Duration;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::{error, info};

use crate::config::MailConfig;
use crate::error::MailError;
use crate::publish::render::RenderedSummary;

/// Something that can put a built message on the wire.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: &Message) -> Result<(), MailError>;
}

/// Authenticated SMTP relay transport.
pub struct SmtpMailTransport {
    transport: SmtpTransport,
}

impl SmtpMailTransport {
    /// Relay to `config.smtp_host:smtp_port`, logging in as the sender.
    pub fn new(config: &MailConfig, timeout: Duration) -> Result<Self, MailError> {
        let creds = Credentials::new(
            config.from.clone(),
            config.app_password.expose_secret().to_string(),
        );

        let transport = SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.smtp_port)
            .credentials(creds)
            .timeout(Some(timeout))
            .build();

        Ok(Self { transport })
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, message: &Message) -> Result<(), MailError> {
        self.transport
            .send(message)
            .map(|_| ())
            .map_err(|e| MailError::Transport(format!("SMTP send failed: {e}")))
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.trim().parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Build a multipart/alternative (text/plain + text/html) message.
pub fn build_message(
    from: &str,
    to: &[String],
    subject: &str,
    plain_text: &str,
    html_body: &str,
) -> Result<Message, MailError> {
    if to.is_empty() {
        return Err(MailError::NoRecipients);
    }

    let mut builder = Message::builder().from(mailbox(from)?).subject(subject);
    for recipient in to {
        builder = builder.to(mailbox(recipient)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            plain_text.to_string(),
            html_body.to_string(),
        ))
        .map_err(|e| MailError::Build(e.to_string()))
}

/// Result of one delivery attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered { recipients: usize },
    Failed(MailError),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

pub struct Mailer {
    from: String,
    to: Vec<String>,
    transport: Arc<dyn MailTransport>,
}

impl Mailer {
    pub fn new(from: impl Into<String>, to: Vec<String>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            from: from.into(),
            to,
            transport,
        }
    }

    /// Build and send the rendered summary. Errors are logged, not returned.
    pub async fn send(&self, rendered: &RenderedSummary) -> DeliveryOutcome {
        match self.try_send(rendered).await {
            Ok(()) => {
                info!(
                    subject = %rendered.subject,
                    recipients = self.to.len(),
                    "Daily log mail sent"
                );
                DeliveryOutcome::Delivered {
                    recipients: self.to.len(),
                }
            }
            Err(e) => {
                error!(subject = %rendered.subject, error = %e, "Daily log mail delivery failed");
                DeliveryOutcome::Failed(e)
            }
        }
    }

    async fn try_send(&self, rendered: &RenderedSummary) -> Result<(), MailError> {
        let message = build_message(
            &self.from,
            &self.to,
            &rendered.subject,
            &rendered.plain_text,
            &rendered.html_body,
        )?;

        // SMTP transport is blocking.
        let transport = Arc::clone(&self.transport);
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Transport(format!("Mail task failed: {e}")))?
    }
}

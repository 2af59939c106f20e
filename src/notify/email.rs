//! SMTP notifier.
//!
//! One message per notification, addressed to every configured recipient. STARTTLS is
//! used when `use_tls` is set, implicit TLS otherwise.

use crate::config::app::{EmailConfig, RecipientConfig};
use crate::errors::{Error, Result};
use crate::models::EmployeeName;
use crate::notify::Notifier;
use crate::notify::messages::{MessageContent, alert_message, change_of_plans_message};
use async_trait::async_trait;
use chrono::NaiveDate;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

pub struct EmailNotifier {
    from: Mailbox,
    recipients: Vec<Mailbox>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

fn parse_address(value: &str) -> Result<Address> {
    value.parse::<Address>().map_err(|e| Error::Config {
        message: format!("Invalid email address '{value}': {e}"),
    })
}

impl EmailNotifier {
    /// Builds the SMTP transport. Nothing is sent and no connection is opened yet.
    pub fn new(config: &EmailConfig, recipients: &[RecipientConfig]) -> Result<Self> {
        if recipients.is_empty() {
            return Err(Error::Config {
                message: "At least one notification recipient is required".to_string(),
            });
        }

        let from = Mailbox::new(
            Some(config.from_name.clone()),
            parse_address(&config.from_email)?,
        );
        let recipients = recipients
            .iter()
            .map(|r| Ok(Mailbox::new(r.name.clone(), parse_address(&r.email)?)))
            .collect::<Result<Vec<_>>>()?;

        let relay = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        }
        .map_err(|e| Error::Config {
            message: format!("SMTP relay error for {}: {e}", config.smtp_host),
        })?;

        let transport = relay
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        Ok(Self {
            from,
            recipients,
            transport,
        })
    }

    fn build_message(&self, content: MessageContent) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(content.subject);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                content.text_body,
                content.html_body,
            ))
            .map_err(|e| Error::Notification {
                message: format!("Failed to build email: {e}"),
            })
    }

    async fn deliver(&self, content: MessageContent) -> Result<()> {
        let message = self.build_message(content)?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| Error::Notification {
                message: format!("Failed to send email: {e}"),
            })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_alert(&self, date: NaiveDate, key_bearers: &[EmployeeName]) -> Result<()> {
        self.deliver(alert_message(date, key_bearers))
            .await
            .inspect(|_| {
                info!(
                    %date,
                    recipients = self.recipients.len(),
                    "Alert email sent"
                );
            })
            .inspect_err(|e| warn!(%date, "Failed to send alert email: {}", e))
    }

    async fn send_change_of_plans(&self, date: NaiveDate, employee_name: &str) -> Result<()> {
        self.deliver(change_of_plans_message(date, employee_name))
            .await
            .inspect(|_| {
                info!(%date, employee = employee_name, "Change of plans email sent");
            })
            .inspect_err(|e| warn!(%date, "Failed to send change of plans email: {}", e))
    }
}

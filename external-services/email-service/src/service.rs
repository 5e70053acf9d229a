// SMTP email dispatch
use crate::error::{EmailError, EmailResult};
use async_trait::async_trait;
use logger_redacted::redact;
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);
/// Line width for the plain-text alternative part
const TEXT_WIDTH: usize = 80;

/// Outbound mail boundary used by account flows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    /// Deliver an HTML message; returns a message id
    async fn send(&self, to: &str, subject: &str, html: &str) -> EmailResult<String>;
}

/// SMTP relay settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmtpSettings {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Implicit TLS; otherwise STARTTLS is negotiated
    #[serde(default)]
    pub use_tls: bool,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            use_tls: false,
        }
    }
}

/// Email service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp: SmtpSettings,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_email_enabled")]
    pub email_enabled: bool,
}

fn default_from_email() -> String {
    "noreply@accounts.local".to_string()
}

fn default_from_name() -> String {
    "User Management System".to_string()
}

fn default_email_enabled() -> bool {
    true
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp: SmtpSettings::default(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            email_enabled: default_email_enabled(),
        }
    }
}

impl EmailConfig {
    /// Load email configuration from environment variables
    pub fn from_env() -> EmailResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> EmailResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str, default: bool| -> EmailResult<bool> {
            lookup(key).map_or(Ok(default), |value| {
                value
                    .parse()
                    .map_err(|_| EmailError::Configuration(format!("{key} must be true or false")))
            })
        };

        let port = match lookup("SMTP_PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| EmailError::Configuration(format!("invalid SMTP_PORT: {value}")))?,
            None => default_smtp_port(),
        };

        Ok(Self {
            smtp: SmtpSettings {
                host: lookup("SMTP_HOST").unwrap_or_else(default_smtp_host),
                port,
                username: lookup("SMTP_USERNAME").filter(|v| !v.is_empty()),
                password: lookup("SMTP_PASSWORD").filter(|v| !v.is_empty()),
                use_tls: flag("SMTP_TLS_ENABLED", false)?,
            },
            from_email: lookup("EMAIL_FROM").unwrap_or_else(default_from_email),
            from_name: lookup("EMAIL_FROM_NAME").unwrap_or_else(default_from_name),
            email_enabled: flag("EMAIL_ENABLED", default_email_enabled())?,
        })
    }
}

/// Email service for sending transactional emails via Stalwart
pub struct SmtpEmailService {
    config: EmailConfig,
}

impl SmtpEmailService {
    pub fn new(config: EmailConfig) -> Self {
        if config.email_enabled {
            info!(host = %config.smtp.host, port = config.smtp.port, "SMTP email dispatch enabled");
        } else {
            info!("Email service disabled by configuration");
        }
        Self { config }
    }

    pub fn config(&self) -> &EmailConfig {
        &self.config
    }

    async fn send_message(&self, message: MessageBuilder<'_>) -> EmailResult<String> {
        let smtp = &self.config.smtp;
        let mut builder =
            SmtpClientBuilder::new(smtp.host.as_str(), smtp.port).implicit_tls(smtp.use_tls);

        if let (Some(user), Some(pass)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials((user.as_str(), pass.as_str()));
        }

        let delivery = async {
            let mut client = builder
                .connect()
                .await
                .map_err(|e| EmailError::SendFailed(format!("SMTP connection failed: {e}")))?;
            client
                .send(message)
                .await
                .map_err(|e| EmailError::SendFailed(format!("Failed to send email: {e}")))
        };

        tokio::time::timeout(SEND_TIMEOUT, delivery)
            .await
            .map_err(|_| EmailError::SendFailed("SMTP delivery timed out".to_string()))??;

        Ok(Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl EmailDispatcher for SmtpEmailService {
    async fn send(&self, to: &str, subject: &str, html: &str) -> EmailResult<String> {
        if !self.config.email_enabled {
            debug!(recipient = %redact(to), "Email disabled, skipping send");
            return Ok(format!("disabled-{}", Uuid::new_v4()));
        }

        let text = html2text::from_read(html.as_bytes(), TEXT_WIDTH);
        let message = MessageBuilder::new()
            .from((
                self.config.from_name.as_str(),
                self.config.from_email.as_str(),
            ))
            .to(to)
            .subject(subject)
            .html_body(html)
            .text_body(text.as_str());

        match self.send_message(message).await {
            Ok(message_id) => {
                debug!(recipient = %redact(to), message_id = %message_id, "Email sent");
                Ok(message_id)
            }
            Err(e) => {
                warn!(recipient = %redact(to), error = %e, "Email delivery failed");
                Err(e)
            }
        }
    }
}

//! Transactional email for the account service
//!
//! Account flows depend on the [`EmailDispatcher`] trait only. The SMTP
//! implementation builds multipart messages with Stalwart's `mail-builder`
//! and delivers them with `mail-send`; when email is disabled by
//! configuration it accepts every message without connecting.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use email_service::{AccountEmails, EmailConfig, EmailDispatcher, SmtpEmailService};
//!
//! # async fn run() -> email_service::EmailResult<()> {
//! let service = SmtpEmailService::new(EmailConfig::from_env()?);
//! let templates = AccountEmails::new("http://localhost:3000")?;
//!
//! let email = templates.verification("Ada", "0123abcd")?;
//! service.send("ada@example.com", &email.subject, &email.html).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod service;
pub mod templates;

pub use error::*;
pub use service::*;
pub use templates::*;

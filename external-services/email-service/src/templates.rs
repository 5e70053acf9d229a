// Handlebars templates for account emails
use crate::error::{EmailError, EmailResult};
use handlebars::Handlebars;
use serde_json::json;

const VERIFICATION_TEMPLATE: &str = "verification";
const PASSWORD_RESET_TEMPLATE: &str = "password_reset";

const VERIFICATION_HTML: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Email Verification</h2>
  <p>Hello {{first_name}},</p>
  <p>Thank you for registering. Please click the button below to verify your email address:</p>
  <p style="text-align: center; margin: 30px 0;">
    <a href="{{{link}}}" style="background-color: #4CAF50; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block;">Verify Email</a>
  </p>
  <p>If the button doesn't work, copy and paste this link into your browser:</p>
  <p>{{{link}}}</p>
  <p>If you didn't create an account with us, please ignore this email.</p>
  <br>
  <p>Best regards,<br>{{sender}}</p>
</div>"#;

const PASSWORD_RESET_HTML: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Password Reset</h2>
  <p>Hello {{first_name}},</p>
  <p>We received a request to reset your password. Click the button below to create a new password:</p>
  <p style="text-align: center; margin: 30px 0;">
    <a href="{{{link}}}" style="background-color: #f44336; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block;">Reset Password</a>
  </p>
  <p>If the button doesn't work, copy and paste this link into your browser:</p>
  <p>{{{link}}}</p>
  <p>This link will expire in {{expires_in}}.</p>
  <p>If you didn't request a password reset, please ignore this email.</p>
  <br>
  <p>Best regards,<br>{{sender}}</p>
</div>"#;

/// A rendered message ready for an [`crate::EmailDispatcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Verification and password-reset mails with links into the client app
pub struct AccountEmails {
    registry: Handlebars<'static>,
    client_url: String,
    sender: String,
}

impl AccountEmails {
    pub fn new(client_url: &str) -> EmailResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(VERIFICATION_TEMPLATE, VERIFICATION_HTML)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;
        registry
            .register_template_string(PASSWORD_RESET_TEMPLATE, PASSWORD_RESET_HTML)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        Ok(Self {
            registry,
            client_url: client_url.trim_end_matches('/').to_string(),
            sender: "User Management Team".to_string(),
        })
    }

    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/verify-email?token={token}", self.client_url)
    }

    pub fn password_reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={token}", self.client_url)
    }

    pub fn verification(&self, first_name: &str, token: &str) -> EmailResult<RenderedEmail> {
        let html = self.registry.render(
            VERIFICATION_TEMPLATE,
            &json!({
                "first_name": first_name,
                "link": self.verification_link(token),
                "sender": self.sender,
            }),
        )?;
        Ok(RenderedEmail {
            subject: "Verify Your Email Address".to_string(),
            html,
        })
    }

    /// `expires_in` is human text such as "1 hour"
    pub fn password_reset(
        &self,
        first_name: &str,
        token: &str,
        expires_in: &str,
    ) -> EmailResult<RenderedEmail> {
        let html = self.registry.render(
            PASSWORD_RESET_TEMPLATE,
            &json!({
                "first_name": first_name,
                "link": self.password_reset_link(token),
                "expires_in": expires_in,
                "sender": self.sender,
            }),
        )?;
        Ok(RenderedEmail {
            subject: "Password Reset Request".to_string(),
            html,
        })
    }
}

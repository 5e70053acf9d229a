use crate::error::{OAuthError, Result};
use serde::{Deserialize, Serialize};

/// Profile resolved at the end of a handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProfile {
    /// Stable subject id assigned by the provider
    pub external_subject_id: String,
    /// Provider-verified email
    pub email: String,
    pub given_name: String,
    pub family_name: String,
}

/// Redirect target plus the CSRF state it carries
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// OIDC userinfo response
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub name: Option<String>,
}

impl UserInfo {
    /// Reject profiles without a verified email
    pub fn into_profile(self) -> Result<OAuthProfile> {
        let email = self
            .email
            .filter(|email| !email.is_empty())
            .ok_or(OAuthError::IncompleteProfile("email"))?;
        if !self.email_verified {
            return Err(OAuthError::UnverifiedEmail);
        }

        // Fall back to splitting the display name when the parts are absent
        let mut display = self.name.as_deref().unwrap_or_default().splitn(2, ' ');
        let given_name = self
            .given_name
            .or_else(|| display.next().map(str::to_string))
            .unwrap_or_default();
        let family_name = self
            .family_name
            .or_else(|| display.next().map(str::to_string))
            .unwrap_or_default();

        Ok(OAuthProfile {
            external_subject_id: self.sub,
            email,
            given_name,
            family_name,
        })
    }
}

use auth_identity::AuthConfig;
use auth_oauth::GoogleOAuthConfig;
use email_service::EmailConfig;
use error_common::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// `development` or `production`
    #[serde(default = "default_app_env")]
    pub app_env: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Postgres connection string
    pub database_url: String,

    /// Browser application origin; used for CORS and for links in emails
    #[serde(default = "default_client_url")]
    pub client_url: String,

    /// Root directory for stored profile images
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    pub auth: AuthConfig,

    #[serde(default)]
    pub email: EmailConfig,

    /// Google sign-in is disabled when absent
    #[serde(default)]
    pub google: Option<GoogleOAuthConfig>,
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_client_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

impl AppConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            ServiceError::ConfigError(format!("invalid config {}: {e}", path.display()))
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ServiceError::ConfigError("DATABASE_URL is not set".into()))?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ServiceError::ConfigError(format!("invalid PORT: {raw}")))?,
            None => default_port(),
        };

        let auth =
            AuthConfig::from_lookup(&lookup).map_err(|e| ServiceError::ConfigError(e.to_string()))?;
        let email =
            EmailConfig::from_lookup(&lookup).map_err(|e| ServiceError::ConfigError(e.to_string()))?;

        // Google sign-in is optional; a partial configuration is a mistake
        let google = if lookup("GOOGLE_CLIENT_ID").is_some() {
            Some(
                GoogleOAuthConfig::from_lookup(&lookup)
                    .map_err(|e| ServiceError::ConfigError(e.to_string()))?,
            )
        } else {
            None
        };

        Ok(Self {
            app_env: lookup("APP_ENV").unwrap_or_else(default_app_env),
            host: lookup("HOST").unwrap_or_else(default_host),
            port,
            database_url,
            client_url: lookup("CLIENT_URL").unwrap_or_else(default_client_url),
            upload_dir: lookup("UPLOAD_DIR").map_or_else(default_upload_dir, PathBuf::from),
            auth,
            email,
            google,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn profile_image_dir(&self) -> PathBuf {
        self.upload_dir.join("profile-images")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/accounts"),
        ("JWT_SECRET", "access"),
        ("JWT_REFRESH_SECRET", "refresh"),
    ];

    #[test]
    fn test_defaults_from_minimal_env() {
        let config = AppConfig::from_lookup(lookup_from(&BASE)).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.client_url, "http://localhost:3000");
        assert_eq!(config.profile_image_dir(), PathBuf::from("uploads/profile-images"));
        assert!(config.google.is_none());
        assert!(!config.is_production());
        assert_eq!(config.auth.token.access_token_lifetime, 900);
    }

    #[test]
    fn test_missing_database_url() {
        let err = AppConfig::from_lookup(lookup_from(&BASE[1..])).unwrap_err();
        assert!(matches!(err, ServiceError::ConfigError(ref m) if m.contains("DATABASE_URL")));
    }

    #[test]
    fn test_partial_google_config_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("GOOGLE_CLIENT_ID", "id"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&pairs)),
            Err(ServiceError::ConfigError(_))
        ));

        pairs.push(("GOOGLE_CLIENT_SECRET", "secret"));
        pairs.push(("GOOGLE_CALLBACK_URL", "http://localhost:5000/api/auth/google/callback"));
        pairs.push(("APP_ENV", "production"));
        let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.google.is_some());
        assert!(config.is_production());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account-server.toml");
        std::fs::write(
            &path,
            r#"
database_url = "postgres://db/accounts"
port = 8080

[auth.token]
access_secret = "a"
refresh_secret = "b"
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.auth.token.refresh_token_lifetime, 7);
        assert!(config.email.email_enabled);
    }
}

// Patterns are compile-time constants; a failure here is a programming error.
#![allow(clippy::expect_used)]

use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email regex");
    static ref JWT_REGEX: Regex =
        Regex::new(r"\beyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+").expect("jwt regex");
    static ref BEARER_REGEX: Regex =
        Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+").expect("bearer regex");
    static ref HEX_TOKEN_REGEX: Regex = Regex::new(r"\b[0-9a-f]{64}\b").expect("hex token regex");
    static ref IP_REGEX: Regex =
        Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("ip regex");
    pub(crate) static ref DEFAULT_REDACTOR: PiiRedactor = PiiRedactor::new(RedactionConfig::default());
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_tokens: bool,
    pub redact_ip_addresses: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_tokens: true,
            redact_ip_addresses: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// PII redactor for log messages
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        // Tokens first: a JWT payload can contain an email-shaped substring once decoded
        if self.config.redact_tokens {
            result = self.redact_tokens(&result);
        }

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_ip_addresses {
            result = self.redact_ip_addresses(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", self.hash_value(email))
                } else {
                    match email.split_once('@') {
                        Some((local, domain)) => format!(
                            "{}***@{}***",
                            local.chars().next().unwrap_or('*'),
                            domain.chars().next().unwrap_or('*')
                        ),
                        None => "***@***".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn redact_tokens(&self, text: &str) -> String {
        let bearer = BEARER_REGEX.replace_all(text, "Bearer [TOKEN]");
        let jwt = JWT_REGEX.replace_all(&bearer, |caps: &regex::Captures| {
            if self.config.hash_for_correlation {
                format!("JWT[{}]", self.hash_value(caps.get(0).map_or("", |m| m.as_str())))
            } else {
                "[TOKEN]".to_string()
            }
        });
        HEX_TOKEN_REGEX.replace_all(&jwt, "[TOKEN]").to_string()
    }

    fn redact_ip_addresses(&self, text: &str) -> String {
        IP_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let ip = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("IP[{}]", self.hash_value(ip))
                } else {
                    let parts: Vec<&str> = ip.split('.').collect();
                    match (parts.first(), parts.get(3)) {
                        (Some(first), Some(last)) => format!("{first}.***.***.{last}"),
                        _ => "***.***.***.***".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let digest = Sha256::digest(value.as_bytes());
        general_purpose::STANDARD.encode(digest.get(..8).unwrap_or_default())
    }
}

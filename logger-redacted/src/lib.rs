pub mod config;
pub mod macros;
pub mod redactor;

pub use config::*;
pub use redactor::*;

/// Logging helpers with automatic credential and PII redaction
///
/// Account flows log recipients, bearer tokens and one-time links. Anything
/// interpolated into a free-text log message goes through [`PiiRedactor`]
/// first, so addresses and secrets never reach the log sink in clear text.
///
/// # Detected Data Types
///
/// - **Email Addresses**: user@example.com → EMAIL[hash] or u***@e***
/// - **JWTs / Bearer tokens**: three base64url segments → JWT[hash] or [TOKEN]
/// - **One-time tokens**: 64-char hex verification/reset tokens → [TOKEN]
/// - **IP Addresses**: 192.168.1.1 → 192.***.***.1
///
/// # Example
///
/// ```rust
/// use logger_redacted::redact;
///
/// let line = redact("reset link sent to jane@example.com");
/// assert!(!line.contains("jane@example.com"));
/// ```
pub fn redact(text: &str) -> String {
    redactor::DEFAULT_REDACTOR.redact(text)
}

//! Common error handling utilities for the account service
//!
//! Provides the process-level error type used by binaries and the stable,
//! machine-readable error codes returned in API error bodies.
//!
//! # Error Categories
//!
//! - **Validation**: malformed request bodies and weak passwords
//! - **Authentication**: credential and token failures
//! - **Authorization**: role checks
//! - **Account**: account lifecycle conflicts (duplicate email, bad reset token)
//! - **Infrastructure**: credential store, session registry and mail outages
//!
//! # Example
//!
//! ```rust
//! use error_common::{codes, ServiceError};
//!
//! fn bind_address(raw: &str) -> Result<std::net::SocketAddr, ServiceError> {
//!     raw.parse()
//!         .map_err(|e| ServiceError::ConfigError(format!("invalid bind address {raw}: {e}")))
//! }
//!
//! assert!(bind_address("127.0.0.1:8080").is_ok());
//! assert_eq!(codes::authentication::INVALID_CREDENTIALS, "AUTH_2001");
//! ```

pub mod codes;
pub mod types;

pub use types::*;

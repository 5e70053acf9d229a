// Stable error codes returned in API error bodies

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const MISSING_REQUIRED_FIELD: &str = "VALIDATION_1002";
    pub const INVALID_FORMAT: &str = "VALIDATION_1003";
    pub const WEAK_PASSWORD: &str = "VALIDATION_1004";
    pub const INVALID_FILE: &str = "VALIDATION_1005";
}

pub mod authentication {
    pub const INVALID_CREDENTIALS: &str = "AUTH_2001";
    pub const TOKEN_INVALID: &str = "AUTH_2002";
    pub const TOKEN_REVOKED: &str = "AUTH_2003";
    pub const REFRESH_TOKEN_INVALID: &str = "AUTH_2004";
    pub const TOKEN_MISSING: &str = "AUTH_2005";
    pub const OAUTH_FAILED: &str = "AUTH_2006";
}

pub mod authorization {
    pub const ACCESS_DENIED: &str = "AUTHZ_3001";
    pub const INSUFFICIENT_PERMISSIONS: &str = "AUTHZ_3002";
}

pub mod account {
    pub const NOT_FOUND: &str = "ACCOUNT_4001";
    pub const EMAIL_IN_USE: &str = "ACCOUNT_4002";
    pub const VERIFICATION_TOKEN_INVALID: &str = "ACCOUNT_4003";
    pub const RESET_TOKEN_INVALID: &str = "ACCOUNT_4004";
    pub const PASSWORD_INCORRECT: &str = "ACCOUNT_4005";
    pub const SELF_DELETION: &str = "ACCOUNT_4006";
}

pub mod infrastructure {
    pub const STORE_UNAVAILABLE: &str = "INFRA_5001";
    pub const REGISTRY_UNAVAILABLE: &str = "INFRA_5002";
    pub const EMAIL_FAILED: &str = "INFRA_5003";
    pub const INTERNAL: &str = "INFRA_5000";
}

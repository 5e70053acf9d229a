//! Route path constants
//!
//! utoipa `#[path(...)]` attributes need string literals, so the paths in
//! handler annotations must be kept equal to these by hand.

pub const API: &str = "/api";

/// Health check endpoints
pub mod health {
    pub const HEALTH: &str = "/health";
}

/// Authentication endpoints, nested under `/api/auth`
pub mod auth {
    pub const BASE: &str = "/auth";
    pub const REGISTER: &str = "/register";
    pub const LOGIN: &str = "/login";
    pub const VERIFY_EMAIL: &str = "/verify-email";
    pub const FORGOT_PASSWORD: &str = "/forgot-password";
    pub const RESET_PASSWORD: &str = "/reset-password";
    pub const REFRESH_TOKEN: &str = "/refresh-token";
    pub const LOGOUT: &str = "/logout";
    pub const SESSION: &str = "/session";
    pub const GOOGLE: &str = "/google";
    pub const GOOGLE_CALLBACK: &str = "/google/callback";
}

/// Self-service endpoints, nested under `/api/user`
pub mod user {
    pub const BASE: &str = "/user";
    pub const PROFILE: &str = "/profile";
    pub const PROFILE_IMAGE: &str = "/profile/image";
    pub const CHANGE_PASSWORD: &str = "/change-password";
    pub const DELETE_ACCOUNT: &str = "/delete-account";
}

/// Administration endpoints, nested under `/api/admin`
pub mod admin {
    pub const BASE: &str = "/admin";
    pub const USERS: &str = "/users";
    pub const USER_BY_ID: &str = "/users/:id";
    pub const USER_ROLE: &str = "/users/:id/role";
}

pub mod docs {
    pub const OPENAPI_JSON: &str = "/api/docs/openapi.json";
}

/// Stored profile images
pub const PROFILE_IMAGES: &str = "/uploads/profile-images";

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_register_requires_verification_before_login() {
    let app = TestApp::new();

    let (status, body) = app.register("Ada", "ada@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["isVerified"], false);
    assert!(body["user"].get("passwordHash").is_none());

    let email = app.email_to("ada@example.com").await;
    assert!(email.html.contains("/verify-email?token="));

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let token = app.verification_token("ada@example.com").await;
    let (status, body) = app
        .get(&format!("/api/auth/verify-email?token={token}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email verified successfully");

    let (access, refresh) = app.login("ada@example.com", PASSWORD).await;
    assert!(!access.is_empty());
    assert_ne!(access, refresh);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_invalid_input() {
    let app = TestApp::new();
    app.register("Ada", "ada@example.com").await;

    let (status, _) = app.register("Ada", "ADA@example.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "firstName": "A",
                "lastName": "Tester",
                "email": "not-an-email",
                "password": PASSWORD,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "validation_error");
    assert!(body["fieldErrors"].get("email").is_some());
    assert!(body["fieldErrors"].get("first_name").is_some());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.register_verified("Ada", "ada@example.com").await;
    app.register("Bob", "bob@example.com").await;

    let attempts = [
        ("nobody@example.com", PASSWORD),
        ("ada@example.com", "Wrong123"),
        ("bob@example.com", PASSWORD),
    ];

    for (email, password) in attempts {
        let (status, body) = app
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{email}");
        assert_eq!(body["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn test_verify_email_rejects_unknown_token() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/auth/verify-email?token=deadbeef", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/auth/verify-email", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_superseded_token() {
    let app = TestApp::new();
    app.register_verified("Ada", "ada@example.com").await;
    let (_, first_refresh) = app.login("ada@example.com", PASSWORD).await;

    let (status, body) = app
        .post(
            "/api/auth/refresh-token",
            None,
            json!({ "refreshToken": first_refresh }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second_refresh = body["refreshToken"].as_str().unwrap().to_string();
    let access = body["accessToken"].as_str().unwrap().to_string();

    let (status, _) = app.get("/api/user/profile", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/auth/refresh-token",
            None,
            json!({ "refreshToken": first_refresh }),
        )
        .await;
    assert_ne!(second_refresh, first_refresh);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid refresh token");

    let (status, _) = app
        .post(
            "/api/auth/refresh-token",
            None,
            json!({ "refreshToken": second_refresh }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_requires_a_token() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/auth/refresh-token", None, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Refresh token required");

    let (status, _) = app
        .call(Method::POST, "/api/auth/refresh-token", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/auth/refresh-token",
            None,
            json!({ "refreshToken": "garbage" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_access_and_refresh() {
    let app = TestApp::new();
    app.register_verified("Ada", "ada@example.com").await;
    let (access, refresh) = app.login("ada@example.com", PASSWORD).await;

    let (status, body) = app.post("/api/auth/logout", Some(&access), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, body) = app.get("/api/user/profile", Some(&access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token revoked. Please log in again.");

    let (status, _) = app
        .post(
            "/api/auth/refresh-token",
            None,
            json!({ "refreshToken": refresh }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_token_is_a_no_op() {
    let app = TestApp::new();

    let (status, _) = app
        .call(Method::POST, "/api/auth/logout", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.registry.is_empty().await);
}

#[tokio::test]
async fn test_session_reports_optional_identity() {
    let app = TestApp::new();
    app.register_verified("Ada", "ada@example.com").await;
    let (access, _) = app.login("ada@example.com", PASSWORD).await;

    let (status, body) = app.get("/api/auth/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);

    let (status, body) = app.get("/api/auth/session", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);

    let (_, body) = app.get("/api/auth/session", Some(&access)).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["identity"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_forgot_password_answers_uniformly() {
    let app = TestApp::new();
    app.register_verified("Ada", "ada@example.com").await;

    let (known_status, known) = app
        .post(
            "/api/auth/forgot-password",
            None,
            json!({ "email": "ada@example.com" }),
        )
        .await;
    let (unknown_status, unknown) = app
        .post(
            "/api/auth/forgot-password",
            None,
            json!({ "email": "nobody@example.com" }),
        )
        .await;

    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known, unknown);
}

#[tokio::test]
async fn test_password_reset_flow() {
    use auth_identity::CredentialStore;

    let app = TestApp::new();
    app.register_verified("Ada", "ada@example.com").await;

    app.post(
        "/api/auth/forgot-password",
        None,
        json!({ "email": "ada@example.com" }),
    )
    .await;

    let email = loop {
        let email = app.email_to("ada@example.com").await;
        if email.html.contains("/reset-password?token=") {
            break email;
        }
    };
    assert!(!email.subject.is_empty());

    let token = app
        .store
        .find_by_email("ada@example.com")
        .await
        .unwrap()
        .and_then(|account| account.reset_password_token)
        .unwrap();

    let (status, _) = app
        .post(
            "/api/auth/reset-password",
            None,
            json!({ "token": token, "password": "Brandnew9" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Single use
    let (status, _) = app
        .post(
            "/api/auth/reset-password",
            None,
            json!({ "token": token, "password": "Another99" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.login("ada@example.com", "Brandnew9").await;
}

#[tokio::test]
async fn test_google_routes_absent_without_configuration() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/auth/google", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

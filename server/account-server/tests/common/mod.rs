//! In-memory server assembly shared by the HTTP tests
#![allow(dead_code)]

use account_server::{create_app, AccountServer, AppConfig, ServerParts};
use async_trait::async_trait;
use auth_identity::{
    AuthConfig, HashingConfig, InMemoryCredentialStore, InMemorySessionRegistry, ManualClock,
    Role, SessionRegistry, TokenConfig,
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use email_service::{EmailConfig, EmailDispatcher, EmailResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;

pub const PASSWORD: &str = "Secret123";

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

struct RecordingMailer(mpsc::UnboundedSender<SentEmail>);

#[async_trait]
impl EmailDispatcher for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> EmailResult<String> {
        let _ = self.0.send(SentEmail {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
        });
        Ok("recorded".into())
    }
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<InMemoryCredentialStore>,
    pub registry: Arc<InMemorySessionRegistry>,
    pub clock: Arc<ManualClock>,
    outbox: Mutex<mpsc::UnboundedReceiver<SentEmail>>,
    _uploads: tempfile::TempDir,
}

pub fn test_config(upload_dir: &std::path::Path) -> AppConfig {
    let mut auth = AuthConfig::new(TokenConfig::new(
        "integration-access-secret",
        "integration-refresh-secret",
    ));
    auth.hashing = HashingConfig {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    };

    AppConfig {
        app_env: "test".into(),
        host: "127.0.0.1".into(),
        port: 0,
        database_url: "postgres://unused".into(),
        client_url: "http://localhost:3000".into(),
        upload_dir: upload_dir.to_path_buf(),
        auth,
        email: EmailConfig::default(),
        google: None,
    }
}

impl TestApp {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let registry = Arc::new(InMemorySessionRegistry::new(clock.clone()));
        Self::with_registry(registry.clone(), registry, clock)
    }

    /// Serve with `serving` as the session registry; `registry` is what the
    /// test inspects
    pub fn with_registry(
        serving: Arc<dyn SessionRegistry>,
        registry: Arc<InMemorySessionRegistry>,
        clock: Arc<ManualClock>,
    ) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryCredentialStore::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let server = AccountServer::from_parts(ServerParts {
            config: test_config(uploads.path()),
            store: store.clone(),
            registry: serving,
            mailer: Arc::new(RecordingMailer(tx)),
            oauth: None,
            clock: clock.clone(),
            database: None,
        })
        .unwrap();

        Self {
            app: create_app(server),
            store,
            registry,
            clock,
            outbox: Mutex::new(rx),
            _uploads: uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn register(&self, first_name: &str, email: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/register",
            None,
            serde_json::json!({
                "firstName": first_name,
                "lastName": "Tester",
                "email": email,
                "password": PASSWORD,
            }),
        )
        .await
    }

    pub async fn verification_token(&self, email: &str) -> String {
        use auth_identity::CredentialStore;
        self.store
            .find_by_email(email)
            .await
            .unwrap()
            .and_then(|account| account.verification_token)
            .unwrap()
    }

    /// Register and verify through the HTTP surface
    pub async fn register_verified(&self, first_name: &str, email: &str) -> Value {
        let (status, body) = self.register(first_name, email).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let token = self.verification_token(email).await;
        let (status, _) = self
            .get(&format!("/api/auth/verify-email?token={token}"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["user"].clone()
    }

    /// Returns `(access_token, refresh_token)`
    pub async fn login(&self, email: &str, password: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (
            body["accessToken"].as_str().unwrap().to_string(),
            body["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    pub async fn promote(&self, email: &str) {
        use auth_identity::CredentialStore;
        let mut account = self.store.find_by_email(email).await.unwrap().unwrap();
        account.role = Role::Admin;
        self.store.update(&account).await.unwrap();
    }

    /// Signed-in admin; returns its access token
    pub async fn admin(&self, email: &str) -> String {
        self.register_verified("Admin", email).await;
        self.promote(email).await;
        self.login(email, PASSWORD).await.0
    }

    pub async fn next_email(&self) -> SentEmail {
        let mut outbox = self.outbox.lock().await;
        tokio::time::timeout(Duration::from_secs(2), outbox.recv())
            .await
            .unwrap()
            .unwrap()
    }

    /// Wait for the next email addressed to `to`, skipping others
    pub async fn email_to(&self, to: &str) -> SentEmail {
        loop {
            let email = self.next_email().await;
            if email.to == to {
                return email;
            }
        }
    }
}

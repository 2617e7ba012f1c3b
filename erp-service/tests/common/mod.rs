//! Test helpers for erp-service integration tests.
//!
//! Every `TestApp` owns a private in-memory SQLite database and a manually
//! driven clock. Requests go through the full router with `oneshot`.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use erp_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, ErpConfig, JwtConfig, PasswordConfig, RateLimitConfig,
        SecurityConfig,
    },
    db,
    models::{Role, User},
    services::MockClock,
    utils::Password,
    AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// 2024-06-01T00:00:00Z
pub const START_EPOCH: i64 = 1_717_200_000;

pub fn test_config() -> ErpConfig {
    ErpConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "erp-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_minutes: 15,
        },
        // Cheap argon2 parameters keep the suite fast
        password: PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            token_attempts: 1000,
            token_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn detail(&self) -> &str {
        self.body["detail"].as_str().unwrap_or_default()
    }

    pub fn id(&self, field: &str) -> Uuid {
        self.body[field]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| panic!("response has no uuid field '{}': {}", field, self.body))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<MockClock>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: ErpConfig) -> Self {
        let pool = db::create_pool(&config.database)
            .await
            .expect("Failed to create test pool");
        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let start = DateTime::<Utc>::from_timestamp(START_EPOCH, 0).expect("valid start time");
        let clock = Arc::new(MockClock::new(start));

        let state =
            AppState::new(config, pool, clock.clone()).expect("Failed to build application state");
        let router = build_router(state.clone());

        TestApp {
            router,
            state,
            clock,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn put_empty(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), None).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Create a user and return its id. Collaborators sign up through
    /// `POST /users`; other roles cannot self-register and are written to
    /// the database directly.
    pub async fn register_user(&self, email: &str, role: &str) -> Uuid {
        let role: Role = role.parse().expect("known role");
        if role != Role::Collaborator {
            return self.seed_user(email, role).await;
        }

        let res = self
            .request(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "name": "Test User",
                    "email": email,
                    "password": TEST_PASSWORD,
                    "role": "collaborator",
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "register failed: {}", res.body);
        res.id("user_id")
    }

    pub async fn seed_user(&self, email: &str, role: Role) -> Uuid {
        let digest = self
            .state
            .hasher
            .hash(&Password::new(TEST_PASSWORD.to_string()))
            .expect("hash test password");
        let user = User::new(
            "Seeded User".to_string(),
            email.to_string(),
            digest.into_string(),
            role,
        );
        self.state.db.insert_user(&user).await.expect("insert user");
        user.user_id
    }

    pub async fn try_login(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/token",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn login(&self, email: &str) -> String {
        let res = self.try_login(email, TEST_PASSWORD).await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.body);
        res.body["access_token"]
            .as_str()
            .expect("access_token in response")
            .to_string()
    }

    /// Register and log in, returning `(user_id, token)`.
    pub async fn signed_in(&self, email: &str, role: &str) -> (Uuid, String) {
        let user_id = self.register_user(email, role).await;
        let token = self.login(email).await;
        (user_id, token)
    }

    pub async fn create_client(&self, token: &str, name: &str) -> Uuid {
        let res = self
            .post(
                "/clients",
                token,
                json!({
                    "name": name,
                    "email": format!("{}@clients.test", name.to_lowercase()),
                    "phone": "809-555-0100",
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "create client failed: {}", res.body);
        res.id("client_id")
    }

    pub async fn create_company(&self, token: &str, rnc: &str, related: &[Uuid]) -> TestResponse {
        self.post(
            "/companies",
            token,
            json!({
                "rnc": rnc,
                "name": format!("Company {}", rnc),
                "person_type": "juridica",
                "related": related,
            }),
        )
        .await
    }

    pub async fn create_tags(&self, token: &str, names: &[&str]) -> Vec<Uuid> {
        let body: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
        let res = self.post("/tags", token, Value::Array(body)).await;
        assert_eq!(res.status, StatusCode::CREATED, "create tags failed: {}", res.body);
        res.body
            .as_array()
            .expect("array of tags")
            .iter()
            .map(|t| t["tag_id"].as_str().unwrap().parse().unwrap())
            .collect()
    }

    pub async fn create_service(&self, token: &str, name: &str, tags: &[Uuid]) -> TestResponse {
        self.post("/services", token, json!({ "name": name, "tags": tags }))
            .await
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.state.db.pool())
            .await
            .unwrap()
    }
}

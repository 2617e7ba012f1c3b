pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ErpConfig;
use crate::services::{Clock, Database, JwtService, Relations};
use crate::utils::PasswordHasher;
use service_core::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: ErpConfig,
    pub db: Database,
    pub relations: Relations,
    pub jwt: JwtService,
    pub hasher: PasswordHasher,
    pub token_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire every service around one pool and one clock.
    pub fn new(config: ErpConfig, pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt, clock)?;
        let hasher = PasswordHasher::new(&config.password)?;

        let token_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.token_attempts,
            config.rate_limit.token_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        Ok(Self {
            config,
            db: Database::new(pool.clone()),
            relations: Relations::new(pool),
            jwt,
            hasher,
            token_rate_limiter,
            ip_rate_limiter,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    // Login is rate limited on its own budget
    let token_route = Router::new()
        .route("/token", post(handlers::token::issue_token))
        .layer(from_fn_with_state(
            state.token_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let protected = Router::new()
        .route("/users/me", get(handlers::users::get_me))
        .route(
            "/users/me/organizations",
            get(handlers::users::my_organizations),
        )
        .route(
            "/users/:user_id",
            get(handlers::users::get_user).delete(handlers::users::delete_user),
        )
        .route(
            "/users/:user_id/active",
            patch(handlers::users::set_user_active),
        )
        .route(
            "/organizations",
            post(handlers::organizations::create_organization)
                .get(handlers::organizations::list_my_organizations),
        )
        .route(
            "/organizations/:organization_id",
            get(handlers::organizations::get_organization)
                .delete(handlers::organizations::delete_organization),
        )
        .route(
            "/organizations/:organization_id/users",
            post(handlers::organizations::add_employee),
        )
        .route(
            "/organizations/:organization_id/users/:user_id",
            put(handlers::organizations::add_member)
                .delete(handlers::organizations::remove_member),
        )
        .route(
            "/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/clients/:client_id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/companies",
            get(handlers::companies::list_companies).post(handlers::companies::create_company),
        )
        .route(
            "/companies/:rnc",
            get(handlers::companies::get_company)
                .put(handlers::companies::update_company)
                .delete(handlers::companies::delete_company),
        )
        .route(
            "/companies/:rnc/clients",
            post(handlers::companies::link_clients),
        )
        .route(
            "/companies/:rnc/clients/:client_id",
            delete(handlers::companies::unlink_client),
        )
        .route(
            "/services",
            get(handlers::services::list_services)
                .post(handlers::services::create_service)
                .put(handlers::services::rename_services),
        )
        .route(
            "/services/:service_id",
            get(handlers::services::get_service).delete(handlers::services::delete_service),
        )
        .route(
            "/services/:service_id/tags",
            post(handlers::services::link_tags),
        )
        .route(
            "/services/:service_id/tags/:tag_id",
            delete(handlers::services::unlink_tag),
        )
        .route(
            "/tags",
            get(handlers::tags::list_tags)
                .post(handlers::tags::create_tags)
                .put(handlers::tags::rename_tags),
        )
        .route(
            "/tags/:tag_id",
            get(handlers::tags::get_tag).delete(handlers::tags::delete_tag),
        )
        .route(
            "/accounts",
            get(handlers::accounts::list_accounts).post(handlers::accounts::create_account),
        )
        .route(
            "/accounts/:account_id",
            get(handlers::accounts::get_account).delete(handlers::accounts::delete_account),
        )
        .route(
            "/accounts/:account_id/services",
            post(handlers::accounts::link_services),
        )
        .route(
            "/accounts/:account_id/services/:service_id",
            delete(handlers::accounts::unlink_service),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let ip_limiter = state.ip_rate_limiter.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/users", post(handlers::users::register))
        .merge(token_route)
        .merge(protected)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Service health check
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<service_core::axum::Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "SQLite health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(service_core::axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "database": "up"
        }
    })))
}

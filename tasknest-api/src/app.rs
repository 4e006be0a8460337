/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                  # Health check (public)
/// ├── /auth/
/// │   ├── POST /signup         # Public
/// │   ├── POST /login          # Public
/// │   └── PUT  /password       # Authenticated
/// ├── /me
/// │   ├── GET  /               # Authenticated
/// │   └── PUT  /               # Authenticated
/// └── /tasks
///     ├── POST   /             # Authenticated
///     ├── GET    /             # Authenticated
///     ├── GET    /:id          # Authenticated
///     ├── PUT    /:id          # Authenticated
///     └── DELETE /:id          # Authenticated
/// ```
///
/// Authenticated routes run through the request gate: bearer token →
/// verification → one user-store lookup → `CurrentUser` in request
/// extensions. Anything else never reaches a handler.

use crate::{config::Config, error::ApiError, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;
use tasknest_shared::auth::middleware::resolve_bearer_user;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Uses Arc
/// internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Secret used to sign and verify identity tokens
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Lifetime of newly issued identity tokens
    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.config.jwt.expires_in_hours)
    }
}

/// Builds the complete Axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public auth routes
    let public_auth_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login));

    // Password change requires an authenticated caller
    let protected_auth_routes = Router::new()
        .route("/password", put(routes::auth::change_password))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_gate,
        ));

    // Profile routes
    let me_routes = Router::new()
        .route(
            "/",
            get(routes::me::get_me).put(routes::me::update_profile),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_gate,
        ));

    // Task routes
    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_gate,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/me", me_routes)
        .nest("/tasks", task_routes)
        .fallback(route_not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Request-gate middleware layer
///
/// Authenticates the request and injects the resolved `CurrentUser` into
/// request extensions for downstream handlers.
async fn auth_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_bearer_user(&state.db, state.jwt_secret(), req.headers()).await?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Fallback for unmatched routes
async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

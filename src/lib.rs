// Library exports for the server binary and the integration tests

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    error_handling::HandleErrorLayer,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    BoxError, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use handlers::{artisans, auth, categories, events, forum, health, products};
use models::errors::AppError;
use services::credentials::{CredentialError, PasswordHasher};
use services::rate_limiter::{RateLimitConfig, RateLimiter};
use services::storage::Storage;
use services::tokens::TokenService;
use utils::config::AppConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn Storage>,
    pub passwords: PasswordHasher,
    pub tokens: Arc<TokenService>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<dyn Storage>) -> Result<Self, CredentialError> {
        let passwords = PasswordHasher::new(config.scrypt_log_n)?;
        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expires_in);
        let rate_limiter = if config.auth_rate_limit_max == 0 {
            RateLimiter::disabled()
        } else {
            RateLimiter::new(RateLimitConfig {
                max_attempts: config.auth_rate_limit_max,
                window: Duration::from_secs(config.auth_rate_limit_window_seconds),
            })
        };

        Ok(Self {
            config: Arc::new(config),
            storage,
            passwords,
            tokens: Arc::new(tokens),
            rate_limiter,
        })
    }
}

/// Builds the full router: every route, soft auth, and the outer layers.
pub fn app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let credentials = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::throttle::throttle_credentials,
        ));

    let router = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))
        // Session
        .route("/api/logout", post(auth::logout))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/user", get(auth::current_user))
        // Catalog
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/api/categories/:id", get(categories::get_category))
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/api/products/:id", get(products::get_product))
        .route(
            "/api/products/category/:id",
            get(products::list_products_by_category),
        )
        .route(
            "/api/products/artisan/:id",
            get(products::list_products_by_artisan),
        )
        // Artisans
        .route(
            "/api/artisans",
            get(artisans::list_artisans).post(artisans::create_artisan_profile),
        )
        .route("/api/artisans/:id", get(artisans::get_artisan))
        // Events
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/events/:id",
            get(events::get_event).patch(events::update_event),
        )
        // Forum
        .route("/api/forum", get(forum::list_posts).post(forum::create_post))
        .route("/api/forum/:id", get(forum::get_thread))
        .route("/api/forum/:id/reply", post(forum::create_reply_for_post))
        .route(
            "/api/forum/posts",
            get(forum::list_posts).post(forum::create_post),
        )
        .route("/api/forum/posts/:id", get(forum::get_thread))
        .route(
            "/api/forum/posts/:id/replies",
            post(forum::create_reply_for_post),
        )
        .route("/api/forum/replies", post(forum::create_reply))
        .merge(credentials)
        .fallback(route_not_found)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .layer(from_fn(middleware::diagnostics::method_not_allowed))
        .with_state(state);

    let timeout_seconds = config.request_timeout_seconds;
    let router = router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(middleware::diagnostics::handle_panic))
            .layer(HandleErrorLayer::new(move |error: BoxError| async move {
                middleware::diagnostics::middleware_error(error, timeout_seconds)
            }))
            .timeout(config.request_timeout())
            .layer(cors_layer(&config.cors_origins)),
    );

    if config.is_development() {
        router.layer(from_fn(middleware::diagnostics::expose_error_details))
    } else {
        router
    }
}

async fn route_not_found() -> AppError {
    AppError::not_found("Route")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, quiz, stats},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz, attempt, stats, analytics).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store and configuration).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route_layer(require_auth.clone()),
        );

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/recent", get(quiz::recent_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        .route("/{id}/verify-password", post(quiz::verify_password))
        // Mutations are admin-only; ownership is checked in the service
        .merge(
            Router::new()
                .route("/", post(quiz::create_quiz))
                .route("/{id}", put(quiz::update_quiz).delete(quiz::delete_quiz))
                .route_layer(middleware::from_fn(admin_middleware)),
        )
        .route_layer(require_auth.clone());

    let attempt_routes = Router::new()
        .route("/submit", post(attempt::submit_attempt))
        .route("/user/{quiz_id}", get(attempt::list_my_attempts))
        .route_layer(require_auth.clone());

    let stats_routes = Router::new()
        .route("/dashboard", get(stats::dashboard))
        .route_layer(require_auth.clone());

    // Double middleware protection: Auth first, then Admin check
    let analytics_routes = Router::new()
        .route("/{quiz_id}", get(stats::quiz_analytics))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(require_auth);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/attempt", attempt_routes)
        .nest("/api/stats", stats_routes)
        .nest("/api/analytics", analytics_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

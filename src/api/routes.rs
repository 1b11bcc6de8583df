//! API Routes
//!
//! Configures the Axum routers for the cache and registration endpoints.

use axum::{
    routing::{any, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, keys_handler, missing_key_handler, set_handler,
    stats_handler, AppState,
};
use super::users::{get_user_handler, register_handler, UsersState};

/// Cache routes without middleware.
///
/// # Endpoints
/// - `GET /cache/:key` - Read through the cache
/// - `PUT /cache/:key` - Store a value
/// - `DELETE /cache/:key` - Delete a key
/// - `/cache`, `/cache/` - 400, key not provided
/// - `GET /keys` - List cached keys
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
pub fn cache_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/cache/:key",
            get(get_handler).put(set_handler).delete(delete_handler),
        )
        .route("/cache", any(missing_key_handler))
        .route("/cache/", any(missing_key_handler))
        .route("/keys", get(keys_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Registration routes without middleware.
///
/// # Endpoints
/// - `POST /users` - Register a user and prime the cache
/// - `GET /users/:username` - Cached user lookup
pub fn user_routes(state: UsersState) -> Router {
    Router::new()
        .route("/users", post(register_handler))
        .route("/users/:username", get(get_user_handler))
        .with_state(state)
}

/// Creates the cache router with middleware.
pub fn create_router(state: AppState) -> Router {
    with_middleware(cache_routes(state))
}

/// Creates the full application: cache and registration routes with middleware.
pub fn create_app(cache: AppState, users: UsersState) -> Router {
    with_middleware(cache_routes(cache).merge(user_routes(users)))
}

/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
fn with_middleware(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}

//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `GET /cache/:key` - Read a value through the cache
//! - `PUT /cache/:key` - Store a value with optional TTL
//! - `DELETE /cache/:key` - Delete a key
//! - `GET /keys` - List cached keys
//! - `POST /users` - Register a user (writes origin, primes cache)
//! - `GET /users/:username` - Cached user lookup
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;
pub mod users;

pub use handlers::*;
pub use routes::{cache_routes, create_app, create_router, user_routes};
pub use users::{get_user_handler, register_handler, UsersState};

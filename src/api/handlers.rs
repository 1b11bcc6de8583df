//! API Handlers
//!
//! HTTP request handlers for the cache endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::warn;

use crate::cache::{CacheEngine, EngineOptions};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetQuery, GetResponse, HealthResponse, KeysResponse, SetRequest, SetResponse,
    StatsResponse,
};
use crate::origin::JsonFileOrigin;
use crate::persistence::JsonFilePersistence;

/// Application state shared across the cache handlers.
///
/// Holds a handle to the cache engine; the engine synchronizes internally.
#[derive(Clone, Debug)]
pub struct AppState {
    pub cache: CacheEngine,
}

impl AppState {
    /// Creates a new AppState around an existing engine.
    pub fn new(cache: CacheEngine) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The origin is the JSON file at `origin_path`; snapshots go to `cache_path`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let origin = JsonFileOrigin::open(&config.origin_path).await?;
        let persistence = JsonFilePersistence::new(&config.cache_path);
        let cache = CacheEngine::open(
            Arc::new(origin),
            Arc::new(persistence),
            EngineOptions {
                default_ttl: config.default_ttl(),
                revalidation: config.revalidation_mode(),
            },
        )
        .await;
        Ok(Self::new(cache))
    }
}

/// Turns a mutation result into the `persisted` flag.
///
/// A persistence failure leaves the cache updated, so it is reported as a
/// warning rather than an error.
pub(crate) fn persisted(key: &str, result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(CacheError::Persistence(message)) => {
            warn!(key, error = %message, "Cache updated but snapshot not persisted");
            Ok(false)
        }
        Err(other) => Err(other),
    }
}

/// Handler for GET /cache/{key}
///
/// Reads through the cache. `?ttl=<secs>` sets the TTL used if the value has
/// to be filled from the origin.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Json<GetResponse>> {
    let ttl = query.ttl().map_err(CacheError::InvalidRequest)?;

    match state.cache.get_with_ttl(&key, ttl).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound("Key not found".to_string())),
    }
}

/// Handler for PUT /cache/{key}
///
/// Stores a JSON value with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let result = state.cache.set(key.as_str(), req.value.clone(), req.ttl()).await;
    let persisted = persisted(&key, result)?;

    Ok(Json(SetResponse {
        key,
        value: req.value,
        ttl: req.ttl,
        persisted,
    }))
}

/// Handler for DELETE /cache/{key}
///
/// Deleting a key that is not cached succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let result = state.cache.delete(&key).await.map(|_| ());
    let persisted = persisted(&key, result)?;

    Ok(Json(DeleteResponse::new(key, persisted)))
}

/// Handler for `/cache` and `/cache/` without a key segment.
pub async fn missing_key_handler() -> Result<Json<GetResponse>> {
    Err(CacheError::InvalidRequest("Key not provided".to_string()))
}

/// Handler for GET /keys
///
/// Returns the cached keys in sorted order, expired-but-unreaped ones included.
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    let mut keys = state.cache.keys().await;
    keys.sort();
    Json(KeysResponse { keys })
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().await))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

//! Registration Handlers
//!
//! User registration writes through to the user directory (the origin) and
//! primes the cache with the same record, so the first read is a hit.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::api::handlers::persisted;
use crate::cache::{CacheEngine, EngineOptions};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::RegisterRequest;
use crate::origin::SqliteUserOrigin;
use crate::persistence::JsonFilePersistence;

/// State for the registration routes.
#[derive(Clone, Debug)]
pub struct UsersState {
    /// Cache whose origin is `directory`
    pub cache: CacheEngine,
    pub directory: Arc<SqliteUserOrigin>,
    /// TTL for primed and read-through user records
    pub ttl: Option<Duration>,
}

impl UsersState {
    pub fn new(cache: CacheEngine, directory: Arc<SqliteUserOrigin>) -> Self {
        let ttl = cache.default_ttl();
        Self {
            cache,
            directory,
            ttl,
        }
    }

    /// Opens the user directory at `users_db_path` and its cache snapshot at `users_cache_path`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let directory = Arc::new(SqliteUserOrigin::open(&config.users_db_path).await?);
        let cache = CacheEngine::open(
            directory.clone(),
            Arc::new(JsonFilePersistence::new(&config.users_cache_path)),
            EngineOptions {
                default_ttl: config.default_ttl(),
                revalidation: config.revalidation_mode(),
            },
        )
        .await;
        Ok(Self::new(cache, directory))
    }
}

/// Handler for POST /users
pub async fn register_handler(
    State(state): State<UsersState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let record = state
        .directory
        .upsert_user(&req.username, &req.email)
        .await?;

    let primed = state
        .cache
        .set(req.username.as_str(), record.clone(), state.ttl)
        .await;
    persisted(&req.username, primed)?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Handler for GET /users/{username}
pub async fn get_user_handler(
    State(state): State<UsersState>,
    Path(username): Path<String>,
) -> Result<Json<Value>> {
    match state.cache.get_with_ttl(&username, state.ttl).await? {
        Some(record) => Ok(Json(record)),
        None => Err(CacheError::NotFound("User not found".to_string())),
    }
}

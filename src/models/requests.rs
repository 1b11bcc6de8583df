//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Request body for the SET operation (PUT /cache/{key})
///
/// # Fields
/// - `value`: The value to store, any JSON
/// - `ttl`: Optional TTL in seconds, fractional allowed; `0` means no expiry
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<f64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        ttl_from_secs(self.ttl).err()
    }

    /// The requested TTL as a duration.
    pub fn ttl(&self) -> Option<Duration> {
        ttl_from_secs(self.ttl).ok().flatten()
    }
}

/// Query string for GET /cache/{key}
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetQuery {
    /// TTL in seconds for the entry if the read has to fill from the origin
    #[serde(default)]
    pub ttl: Option<f64>,
}

impl GetQuery {
    pub fn ttl(&self) -> Result<Option<Duration>, String> {
        ttl_from_secs(self.ttl)
    }
}

/// Request body for user registration (POST /users)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
}

impl RegisterRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.username.trim().is_empty() {
            return Some("Username cannot be empty".to_string());
        }
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => None,
            _ => Some(format!("Invalid email address: {}", self.email)),
        }
    }
}

/// Converts a TTL in seconds to a duration. `0` and absent both mean no TTL.
fn ttl_from_secs(ttl: Option<f64>) -> Result<Option<Duration>, String> {
    match ttl {
        None => Ok(None),
        Some(secs) if !secs.is_finite() || secs < 0.0 => {
            Err(format!("TTL must be a non-negative number of seconds, got {}", secs))
        }
        Some(secs) if secs == 0.0 => Ok(None),
        Some(secs) => Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|e| format!("Invalid TTL: {}", e)),
    }
}

//! Cache operation handlers.

use std::time::Duration;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::health::HEALTH_KEY;
use crate::types::{BlobValue, WriteOutcome};

use super::super::{error::ApiError, state::AppState};

/// Longest TTL a client may request: one year.
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Query parameters naming a cache key.
#[derive(Debug, Deserialize, Default)]
pub struct KeyQuery {
    pub key: Option<String>,
}

/// Body of `POST /cache`.
#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    /// Seconds until expiry; the server default when absent.
    pub ttl: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CachedValue {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct SetResponse {
    pub key: String,
    pub outcome: &'static str,
}

/// Get a cached value.
pub async fn get_value(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<CachedValue>, ApiError> {
    let key = validate_key(query.key)?;
    let value = state
        .blobs()
        .read_blob(&key)
        .await?
        .ok_or_else(|| ApiError::cache_miss(&key))?;
    Ok(Json(CachedValue {
        key,
        value: value.into_json(),
    }))
}

/// Store a value, chunking it if needed.
pub async fn set_value(
    State(state): State<AppState>,
    Json(request): Json<SetRequest>,
) -> Result<Json<SetResponse>, ApiError> {
    let key = validate_key(Some(request.key))?;
    let ttl = match request.ttl {
        Some(secs @ 1..=MAX_TTL_SECS) => Duration::from_secs(secs),
        Some(secs) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_TTL",
                format!("ttl must be between 1 and {} seconds, got {}", MAX_TTL_SECS, secs),
            ));
        }
        None => state.default_ttl(),
    };

    let value = BlobValue::from(request.value);
    match state.blobs().set_blob(&key, &value, ttl).await {
        WriteOutcome::Stored => Ok(Json(SetResponse {
            key,
            outcome: WriteOutcome::Stored.as_str(),
        })),
        WriteOutcome::Partial { skipped } => Err(ApiError::write_failed(&key, &skipped)),
        WriteOutcome::Failed => Err(ApiError::write_failed(&key, &[])),
        WriteOutcome::Unavailable => Err(ApiError::unavailable("cache unavailable")),
    }
}

/// Delete a value and all of its chunks.
pub async fn delete_value(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<StatusCode, ApiError> {
    let key = validate_key(query.key)?;
    if state.blobs().delete_blob(&key).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::unavailable(format!("could not delete '{}'", key)))
    }
}

/// Report the health gate state.
pub async fn cache_health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.client().check_health().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unavailable", "reason": e.to_string() })),
        ),
    }
}

/// Reject keys that are empty or would alias internal keys.
fn validate_key(key: Option<String>) -> Result<String, ApiError> {
    let key = key.unwrap_or_default();
    if key.trim().is_empty() {
        return Err(ApiError::invalid_key("key must not be empty"));
    }
    if key == HEALTH_KEY || key.ends_with(":info") || key.contains(":chunk:") {
        return Err(ApiError::invalid_key(format!("'{}' is a reserved key", key))
            .with_details(serde_json::json!({ "key": key })));
    }
    Ok(key)
}

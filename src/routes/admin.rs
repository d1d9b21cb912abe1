use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::search::{SearchConfig, SearchEngine};

/// Outcome of a cache reset.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ResetCacheResponse {
    pub message: String,
}

/// Delete the on-disk index cache and rebuild the index from the export.
#[openapi(tag = "Admin")]
#[post("/reset-cache")]
pub async fn reset_cache(
    engine: &State<RwLock<SearchEngine>>,
    config: &State<SearchConfig>,
) -> Result<Json<ResetCacheResponse>, ApiError> {
    log::info!("cache reset requested");

    let mut engine = engine.write().await;
    engine
        .rebuild(config)
        .await
        .map_err(|err| ApiError::InternalError(err.to_string()))?;

    Ok(Json(ResetCacheResponse {
        message: format!(
            "Cache cleared and index rebuilt over {} threads.",
            engine.threads().len()
        ),
    }))
}

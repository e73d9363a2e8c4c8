//! Axum request handlers for the HTTP API.
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::routes::AppState;
use crate::error::AppError;
use crate::history::{Preferences, PreferencesUpdate, StorageUsage};
use crate::prompt::catalog;
use crate::types::{Dimensions, GenerationRequest, HistoryEntry};

pub async fn root() -> &'static str {
    "AI Image Generation Proxy"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub image_url: String,
    /// The enhanced prompt actually sent upstream.
    pub prompt: String,
    pub style: String,
    pub dimensions: Dimensions,
    pub timestamp: DateTime<Utc>,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(mut request) = payload.map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?;
    if request.system_prompt.is_none() {
        request.system_prompt = Some(state.history.preferences().await.system_prompt);
    }

    let image = state.client.try_generate(&request).await?;
    state.history.save(HistoryEntry::from_generated(&request, &image)).await;

    Ok(Json(GenerateResponse {
        success: true,
        image_url: image.image_url,
        prompt: image.enhanced_prompt,
        style: request.style,
        dimensions: image.dimensions,
        timestamp: image.timestamp,
    }))
}

pub async fn capabilities() -> Json<catalog::Capabilities> {
    Json(catalog::capabilities())
}

pub async fn styles() -> Json<Vec<catalog::StyleOption>> {
    Json(catalog::style_options())
}

pub async fn presets() -> Json<Vec<catalog::PresetPrompt>> {
    Json(catalog::preset_prompts())
}

pub async fn dimensions() -> Json<Vec<catalog::DimensionPreset>> {
    Json(catalog::dimension_presets())
}

pub async fn list_history(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryEntry>> {
    Json(state.history.list().await)
}

pub async fn clear_history(State(state): State<Arc<AppState>>) -> StatusCode {
    state.history.clear().await;
    StatusCode::NO_CONTENT
}

pub async fn remove_history_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if state.history.remove(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": format!("No history entry '{}'", id) }))).into_response()
    }
}

pub async fn export_data(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], state.history.export().await)
}

pub async fn import_data(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    if state.history.import(&body).await {
        (StatusCode::OK, Json(json!({ "status": "success" })))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": "Failed to import data" })))
    }
}

pub async fn storage_usage(State(state): State<Arc<AppState>>) -> Json<StorageUsage> {
    Json(state.history.usage().await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupParams {
    pub max_age_days: Option<i64>,
}

pub async fn cleanup_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CleanupParams>,
) -> Result<Json<Value>, AppError> {
    let days = params.max_age_days.unwrap_or(30);
    if days < 0 {
        return Err(AppError::Validation("maxAgeDays must not be negative".to_string()));
    }
    let removed = state.history.cleanup_older_than_days(days).await;
    Ok(Json(json!({ "removed": removed })))
}

pub async fn get_preferences(State(state): State<Arc<AppState>>) -> Json<Preferences> {
    Json(state.history.preferences().await)
}

pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PreferencesUpdate>, JsonRejection>,
) -> Result<Json<Preferences>, AppError> {
    let Json(update) = payload.map_err(|e| AppError::Validation(format!("Invalid preferences: {}", e)))?;
    Ok(Json(state.history.update_preferences(update).await))
}

pub async fn reset_preferences(State(state): State<Arc<AppState>>) -> Json<Preferences> {
    state.history.reset_preferences().await;
    Json(state.history.preferences().await)
}

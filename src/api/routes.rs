use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::config::Config;
use crate::error::AppResult;
use crate::history::{FileStore, HistoryManager, Preferences};
use crate::upstream::client::GenerationClient;

pub struct AppState {
    pub client: GenerationClient,
    pub history: HistoryManager,
}

impl AppState {
    /// Wire the client and a file-backed history from configuration.
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let client = GenerationClient::new(config)?;
        let store = FileStore::new(&config.history_dir).await?;
        let defaults = Preferences { system_prompt: config.system_prompt.clone(), ..Preferences::default() };
        let history = HistoryManager::new(Arc::new(store), config.history_cap).with_default_preferences(defaults);
        Ok(AppState { client, history })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/generate", post(handlers::generate).get(handlers::capabilities))
        .route("/api/styles", get(handlers::styles))
        .route("/api/presets", get(handlers::presets))
        .route("/api/dimensions", get(handlers::dimensions))
        .route("/api/history", get(handlers::list_history).delete(handlers::clear_history))
        .route("/api/history/export", get(handlers::export_data))
        .route("/api/history/import", post(handlers::import_data))
        .route("/api/history/usage", get(handlers::storage_usage))
        .route("/api/history/cleanup", post(handlers::cleanup_history))
        .route("/api/history/:id", delete(handlers::remove_history_entry))
        .route(
            "/api/preferences",
            get(handlers::get_preferences)
                .put(handlers::update_preferences)
                .delete(handlers::reset_preferences),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

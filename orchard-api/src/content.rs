use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use orchard_core::content::{self, OrchardUpdate, SiteContent, ORCHARD_UPDATES};
use orchard_store::app_config::{Defaults, Features, Product};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/content",
            get(list_content).put(update_content).post(update_content),
        )
        .route("/api/content/{key}", get(get_content))
        .route("/api/config", get(site_config))
        .route("/api/products", get(list_products))
        .route("/api/updates", get(list_updates))
}

async fn list_content(State(state): State<AppState>) -> Result<Json<Vec<SiteContent>>, AppError> {
    let stored = state.content.list_content().await?;
    Ok(Json(content::merge_with_defaults(stored)))
}

async fn get_content(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SiteContent>, AppError> {
    if let Some(stored) = state.content.get_content(&key).await? {
        return Ok(Json(stored));
    }
    let default = content::default_for(&key)
        .ok_or_else(|| AppError::NotFoundError(format!("Unknown content key '{}'", key)))?;
    Ok(Json(SiteContent {
        key: default.key.to_string(),
        value: default.value.to_string(),
        label: default.label.to_string(),
        last_updated: None,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    pub key: String,
    pub value: String,
}

async fn update_content(
    State(state): State<AppState>,
    payload: Result<Json<UpdateContentRequest>, JsonRejection>,
) -> Result<Json<SiteContent>, AppError> {
    let Json(req) = payload?;
    let default = content::default_for(&req.key)
        .ok_or_else(|| AppError::ValidationError(format!("Unknown content key '{}'", req.key)))?;

    let updated = state
        .content
        .upsert_content(default.key, default.label, &req.value)
        .await?;
    info!(key = %updated.key, "Site content updated");
    Ok(Json(updated))
}

#[derive(Debug, Serialize)]
pub struct SiteConfig {
    pub features: Features,
    pub defaults: Defaults,
}

async fn site_config(State(state): State<AppState>) -> Json<SiteConfig> {
    Json(SiteConfig {
        features: state.config.features.clone(),
        defaults: state.config.defaults.clone(),
    })
}

async fn list_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.config.products.clone())
}

async fn list_updates() -> Json<&'static [OrchardUpdate]> {
    Json(ORCHARD_UPDATES)
}

use axum::{extract::State, http::Method, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod adoptions;
pub mod automation;
pub mod bookings;
pub mod content;
pub mod error;
pub mod export;
pub mod feedback;
pub mod middleware;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::USER_AGENT]);

    let mut router = Router::new()
        .route("/health", get(health))
        .merge(adoptions::routes())
        .merge(bookings::routes())
        .merge(feedback::routes())
        .merge(content::routes())
        .merge(admin::routes())
        .merge(export::routes());

    if let Some(dir) = &state.config.server.static_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let Some(db) = &state.db else {
        return (StatusCode::OK, Json(json!({ "status": "ok", "storage": "memory" })));
    };

    match db.health().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "storage": "postgres" }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "storage": "postgres" })),
            )
        }
    }
}

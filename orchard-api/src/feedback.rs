use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use orchard_core::feedback::{FeedbackStats, NewFeedback, SurveyType};
use orchard_shared::{ActivityEvent, Masked};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/feedback", post(submit_feedback))
        .route("/api/feedback/stats", get(feedback_stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub survey_type: String,
    pub rating: i32,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub highlight: String,
    #[serde(default)]
    pub improvement: String,
    #[serde(default)]
    pub would_recommend: bool,
    #[serde(default)]
    pub email: String,
}

async fn submit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.config.features.surveys_enabled {
        return Err(AppError::ServiceUnavailable("Surveys are currently disabled".to_string()));
    }
    let Json(req) = payload?;

    let feedback = NewFeedback {
        survey_type: req.survey_type.parse::<SurveyType>()?,
        rating: req.rating,
        experience: req.experience,
        highlight: req.highlight,
        improvement: req.improvement,
        would_recommend: req.would_recommend,
        email: req.email.trim().to_string(),
    };
    feedback.validate()?;

    let stored = state.feedback.create_feedback(&feedback).await?;
    state
        .notifier
        .notify(ActivityEvent::FeedbackReceived {
            survey_type: stored.survey_type.as_str().to_string(),
            rating: stored.rating,
            email: (!stored.email.is_empty()).then(|| Masked(stored.email.clone())),
        })
        .await;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Thank you for your feedback!",
        "id": stored.id,
    })))
}

async fn feedback_stats(State(state): State<AppState>) -> Result<Json<FeedbackStats>, AppError> {
    Ok(Json(state.feedback.feedback_stats().await?))
}

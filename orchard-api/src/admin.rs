//! Back-office endpoints. Unauthenticated; expected to sit behind the operator's own access control.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use orchard_catalog::{expand_schedule, Recurrence};
use orchard_core::activity::ActivityLogEntry;
use orchard_core::customer::{Customer, CustomerStats};
use orchard_core::feedback::{Feedback, FeedbackStats};
use orchard_core::inquiry::{Inquiry, InquiryStatus};
use orchard_core::newsletter::{NewNewsletter, Newsletter};
use orchard_core::promo::PromoCode;
use orchard_core::slot::{Booking, BookingStatus, NewSlot, Slot};
use orchard_shared::ActivityEvent;

use crate::bookings::advance_booking;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_ACTIVITY_LIMIT: i64 = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers))
        .route("/api/activity", get(list_activity))
        .route("/api/stats", get(dashboard_stats))
        .route("/api/admin/slots", get(list_slots).post(create_slots))
        .route("/api/admin/bookings", get(list_bookings))
        .route("/api/admin/bookings/{id}/confirm", post(confirm_booking))
        .route("/api/admin/promo-codes", get(list_promo_codes).post(create_promo_code))
        .route("/api/admin/inquiries", get(list_inquiries))
        .route("/api/admin/inquiries/{id}/status", post(set_inquiry_status))
        .route("/api/admin/newsletters", get(list_newsletters).post(send_newsletter))
        .route("/api/admin/feedback", get(list_feedback))
}

async fn list_customers(State(state): State<AppState>) -> Result<Json<Vec<Customer>>, AppError> {
    Ok(Json(state.customers.list_customers().await?))
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

async fn list_activity(
    State(state): State<AppState>,
    query: Result<Query<ActivityQuery>, QueryRejection>,
) -> Result<Json<Vec<ActivityLogEntry>>, AppError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT).clamp(1, 500);
    Ok(Json(state.activity.list_activity(limit).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub customers: CustomerStats,
    pub feedback: FeedbackStats,
    pub bookings: usize,
}

async fn dashboard_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let (customers, feedback, bookings) = futures_util::try_join!(
        state.customers.customer_stats(),
        state.feedback.feedback_stats(),
        state.slots.list_bookings(),
    )?;

    Ok(Json(DashboardStats {
        customers,
        feedback,
        bookings: bookings.len(),
    }))
}

async fn list_slots(State(state): State<AppState>) -> Result<Json<Vec<Slot>>, AppError> {
    Ok(Json(state.slots.list_slots(None, None).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotsRequest {
    pub activity: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub repeat: Option<Recurrence>,
}

async fn create_slots(
    State(state): State<AppState>,
    payload: Result<Json<CreateSlotsRequest>, JsonRejection>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let Json(req) = payload?;
    let activity = req.activity.trim();
    if activity.is_empty() {
        return Err(AppError::ValidationError("activity is required".to_string()));
    }
    if req.capacity <= 0 {
        return Err(AppError::ValidationError(format!(
            "capacity must be positive, got {}",
            req.capacity
        )));
    }

    let slots: Vec<NewSlot> = expand_schedule(req.start_time, req.end_time, req.repeat)?
        .into_iter()
        .map(|window| NewSlot {
            activity: activity.to_string(),
            start_time: window.start_time,
            end_time: window.end_time,
            capacity: req.capacity,
        })
        .collect();

    let created = state.slots.create_slots(&slots).await?;
    info!(activity, count = created.len(), "Slots created");
    Ok(Json(created))
}

async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.slots.list_bookings().await?))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .slots
        .get_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Booking {} not found", id)))?;

    let confirmed = advance_booking(&state, booking, BookingStatus::Confirmed).await?;

    info!(booking_id = id, "Booking confirmed");
    Ok(Json(confirmed))
}

async fn list_promo_codes(State(state): State<AppState>) -> Result<Json<Vec<PromoCode>>, AppError> {
    Ok(Json(state.promos.list_promo_codes().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromoRequest {
    pub code: String,
    pub discount_percent: i32,
    #[serde(default)]
    pub one_time: bool,
}

async fn create_promo_code(
    State(state): State<AppState>,
    payload: Result<Json<CreatePromoRequest>, JsonRejection>,
) -> Result<Json<PromoCode>, AppError> {
    let Json(req) = payload?;
    let promo = PromoCode::new(&req.code, req.discount_percent, req.one_time)?;
    let created = state.promos.create_promo_code(&promo).await?;
    info!(code = %created.code, discount = created.discount_percent, "Promo code created");
    Ok(Json(created))
}

async fn list_inquiries(State(state): State<AppState>) -> Result<Json<Vec<Inquiry>>, AppError> {
    Ok(Json(state.inquiries.list_inquiries().await?))
}

#[derive(Debug, Deserialize)]
pub struct InquiryStatusRequest {
    pub status: String,
}

async fn set_inquiry_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<InquiryStatusRequest>, JsonRejection>,
) -> Result<Json<Inquiry>, AppError> {
    let Json(req) = payload?;
    let status: InquiryStatus = req.status.parse()?;

    let inquiry = state
        .inquiries
        .set_inquiry_status(id, status)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Inquiry {} not found", id)))?;
    Ok(Json(inquiry))
}

async fn list_newsletters(State(state): State<AppState>) -> Result<Json<Vec<Newsletter>>, AppError> {
    Ok(Json(state.newsletters.list_newsletters().await?))
}

#[derive(Debug, Deserialize)]
pub struct SendNewsletterRequest {
    pub subject: String,
    pub body: String,
}

/// Mocked dispatch: records the newsletter and how many subscribers it would reach.
async fn send_newsletter(
    State(state): State<AppState>,
    payload: Result<Json<SendNewsletterRequest>, JsonRejection>,
) -> Result<Json<Newsletter>, AppError> {
    if !state.config.features.newsletter_enabled {
        return Err(AppError::ServiceUnavailable("Newsletters are currently disabled".to_string()));
    }
    let Json(req) = payload?;
    if req.subject.trim().is_empty() {
        return Err(AppError::ValidationError("subject is required".to_string()));
    }

    let recipients = state.customers.customer_stats().await?.newsletter_subscribers;
    let newsletter = state
        .newsletters
        .create_newsletter(&NewNewsletter {
            subject: req.subject,
            body: req.body,
            recipients,
        })
        .await?;

    state
        .notifier
        .notify(ActivityEvent::NewsletterSent {
            newsletter_id: newsletter.id,
            subject: newsletter.subject.clone(),
            recipients,
        })
        .await;

    Ok(Json(newsletter))
}

async fn list_feedback(State(state): State<AppState>) -> Result<Json<Vec<Feedback>>, AppError> {
    Ok(Json(state.feedback.list_feedback().await?))
}

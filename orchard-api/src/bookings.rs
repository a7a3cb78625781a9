use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use orchard_core::inquiry::{Inquiry, NewInquiry};
use orchard_core::slot::{Booking, BookingStatus, Slot};
use orchard_core::{Reservation, ReserveSlot};
use orchard_shared::{ActivityEvent, Masked};

use crate::automation::FollowUp;
use crate::error::{reason, AppError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/slots", get(list_open_slots))
        .route("/api/book-visit", post(book_visit))
        .route("/api/confirm-visit-payment", post(confirm_visit_payment))
        .route("/api/inquiry", post(submit_inquiry))
}

/// A slot as the booking page sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: Slot,
    pub remaining: i32,
}

impl From<Slot> for SlotView {
    fn from(slot: Slot) -> Self {
        Self {
            remaining: slot.remaining(),
            slot,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub activity: Option<String>,
}

async fn list_open_slots(
    State(state): State<AppState>,
    query: Result<Query<SlotQuery>, QueryRejection>,
) -> Result<Json<Vec<SlotView>>, AppError> {
    let Query(query) = query?;
    let slots = state
        .slots
        .list_slots(query.activity.as_deref(), Some(Utc::now()))
        .await?;
    Ok(Json(slots.into_iter().map(SlotView::from).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookVisitRequest {
    pub slot_id: i64,
    pub quantity: i32,
    pub customer_name: String,
    pub customer_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookVisitResponse {
    pub success: bool,
    pub booking: Booking,
}

async fn book_visit(
    State(state): State<AppState>,
    payload: Result<Json<BookVisitRequest>, JsonRejection>,
) -> Result<Json<BookVisitResponse>, AppError> {
    let Json(req) = payload?;
    let slot_id = req.slot_id;

    let outcome = state
        .ledger
        .reserve_slot(ReserveSlot {
            slot_id,
            quantity: req.quantity,
            customer_name: req.customer_name,
            customer_email: req.customer_email,
        })
        .await?;

    match outcome {
        Reservation::Reserved(booking) => {
            info!(
                booking_id = booking.id,
                slot_id,
                email = %Masked(booking.customer_email.as_str()),
                "Visit reserved"
            );
            Ok(Json(BookVisitResponse { success: true, booking }))
        }
        Reservation::CapacityExceeded { requested, remaining } => Err(AppError::conflict(
            reason::FULLY_BOOKED,
            format!("Only {} places left, {} requested", remaining, requested),
        )),
        Reservation::SlotNotFound => Err(AppError::NotFoundError(format!("Slot {} not found", slot_id))),
        Reservation::SlotClosed => Err(AppError::conflict(
            reason::SLOT_CLOSED,
            format!("Slot {} is no longer open for booking", slot_id),
        )),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmVisitPaymentRequest {
    pub payment_token: String,
}

async fn confirm_visit_payment(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmVisitPaymentRequest>, JsonRejection>,
) -> Result<Json<BookVisitResponse>, AppError> {
    let Json(req) = payload?;

    let booking = state
        .slots
        .get_booking_by_token(&req.payment_token)
        .await?
        .ok_or_else(|| AppError::NotFoundError("No booking for that payment token".to_string()))?;

    let booking = advance_booking(&state, booking, BookingStatus::Paid).await?;

    state
        .notifier
        .notify(ActivityEvent::VisitPaymentCompleted {
            booking_id: booking.id,
            slot_id: booking.slot_id,
        })
        .await;

    FollowUp::from_state(&state).after_visit_payment(booking.clone());

    Ok(Json(BookVisitResponse { success: true, booking }))
}

/// Moves a booking one step along pending → paid → confirmed.
///
/// The status update is conditional on the status read here, so a concurrent
/// confirmation loses with `invalid_transition` instead of applying twice.
pub(crate) async fn advance_booking(
    state: &AppState,
    booking: Booking,
    to: BookingStatus,
) -> Result<Booking, AppError> {
    let invalid = || {
        AppError::conflict(
            reason::INVALID_TRANSITION,
            format!("Booking {} is {}, cannot become {}", booking.id, booking.status, to),
        )
    };
    if !booking.status.can_transition_to(to) {
        return Err(invalid());
    }
    state
        .slots
        .transition_booking(booking.id, booking.status, to)
        .await?
        .ok_or_else(invalid)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRequest {
    pub name: String,
    pub email: String,
    pub activity: String,
    pub proposed_date: String,
    #[serde(default)]
    pub message: String,
}

async fn submit_inquiry(
    State(state): State<AppState>,
    payload: Result<Json<InquiryRequest>, JsonRejection>,
) -> Result<Json<Inquiry>, AppError> {
    let Json(req) = payload?;
    let inquiry = NewInquiry {
        name: req.name,
        email: req.email,
        activity: req.activity,
        proposed_date: req.proposed_date,
        message: req.message,
    };
    inquiry.validate()?;

    let inquiry = state.inquiries.create_inquiry(&inquiry).await?;
    state
        .notifier
        .notify(ActivityEvent::InquiryReceived {
            inquiry_id: inquiry.id,
            activity: inquiry.activity.clone(),
            proposed_date: inquiry.proposed_date.clone(),
        })
        .await;

    Ok(Json(inquiry))
}

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use orchard_catalog::apply_discount;
use orchard_core::customer::CustomerStatus;
use orchard_core::{NewAdoption, Redemption};
use orchard_shared::{format_cents, ActivityEvent, Masked};

use crate::automation::FollowUp;
use crate::error::{reason, AppError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/adopt", post(adopt))
        .route("/api/promo/validate", get(validate_promo))
        .route("/api/confirm-payment", post(confirm_payment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub country: String,
    pub tree_type: String,
    pub years: Option<i32>,
    pub promo_code: Option<String>,
    #[serde(default)]
    pub is_gift: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub name: String,
    pub tree_type: String,
    pub years: i32,
    pub base_price_cents: i64,
    pub amount_cents: i64,
    pub amount_display: String,
    pub promo: Option<Redemption>,
    pub gift_code: Option<String>,
}

async fn adopt(
    State(state): State<AppState>,
    payload: Result<Json<AdoptRequest>, JsonRejection>,
) -> Result<Json<AdoptResponse>, AppError> {
    if !state.config.features.adoptions_enabled {
        return Err(AppError::ServiceUnavailable("Adoptions are currently disabled".to_string()));
    }
    let Json(req) = payload?;

    let tree_types = &state.config.defaults.tree_types;
    if !tree_types.is_empty() && !tree_types.iter().any(|t| t.eq_ignore_ascii_case(req.tree_type.trim())) {
        return Err(AppError::ValidationError(format!(
            "Unknown tree type '{}', expected one of: {}",
            req.tree_type,
            tree_types.join(", ")
        )));
    }

    let years = req.years.unwrap_or(1);
    let base_price_cents = state.pricing.adoption_price(years)?;

    let receipt = state
        .ledger
        .sign_up_adoption(
            NewAdoption {
                name: req.name,
                email: req.email,
                country: req.country,
                tree_type: req.tree_type,
                years,
                promo_code: req.promo_code,
                is_gift: req.is_gift,
            },
            base_price_cents,
        )
        .await?;

    let customer = receipt.customer;
    info!(
        customer_id = customer.id,
        email = %Masked(customer.email.as_str()),
        amount = %format_cents(customer.amount_cents),
        "Adoption registered"
    );

    Ok(Json(AdoptResponse {
        success: true,
        message: "Interest registered! Proceeding to payment.".to_string(),
        id: customer.id,
        name: customer.name,
        tree_type: customer.tree_type,
        years: customer.years,
        base_price_cents,
        amount_cents: customer.amount_cents,
        amount_display: state.pricing.display(customer.amount_cents),
        promo: receipt.redemption,
        gift_code: receipt.gift_code.map(|gift| gift.code),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValidatePromoQuery {
    pub code: String,
    pub years: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoResponse {
    pub valid: bool,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Advisory only: nothing is consumed until the adoption is submitted.
async fn validate_promo(
    State(state): State<AppState>,
    query: Result<Query<ValidatePromoQuery>, QueryRejection>,
) -> Result<Json<ValidatePromoResponse>, AppError> {
    let Query(query) = query?;
    let base_price_cents = state.pricing.adoption_price(query.years.unwrap_or(1))?;

    let response = match state.promos.get_promo_code(&query.code).await? {
        None => ValidatePromoResponse {
            valid: false,
            code: query.code,
            discount_percent: None,
            final_price_cents: None,
            reason: Some("unknown_code"),
        },
        Some(promo) if !promo.is_redeemable() => ValidatePromoResponse {
            valid: false,
            code: promo.code,
            discount_percent: Some(promo.discount_percent),
            final_price_cents: None,
            reason: Some("already_used"),
        },
        Some(promo) => ValidatePromoResponse {
            valid: true,
            final_price_cents: Some(apply_discount(base_price_cents, promo.discount_percent)?),
            code: promo.code,
            discount_percent: Some(promo.discount_percent),
            reason: None,
        },
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub customer_id: i64,
}

async fn confirm_payment(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(req) = payload?;

    let customer = state
        .customers
        .get_customer(req.customer_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Customer {} not found", req.customer_id)))?;

    let customer = state
        .customers
        .transition_customer(customer.id, CustomerStatus::Interested, CustomerStatus::Paid, None)
        .await?
        .ok_or_else(|| {
            AppError::conflict(
                reason::INVALID_TRANSITION,
                format!("Customer {} is already {}", customer.id, customer.status),
            )
        })?;

    state
        .notifier
        .notify(ActivityEvent::PaymentCompleted {
            customer_id: customer.id,
            amount_cents: customer.amount_cents,
        })
        .await;

    FollowUp::from_state(&state).after_adoption_payment(customer);

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Payment confirmed!",
    })))
}

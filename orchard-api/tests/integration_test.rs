use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use serde_json::{json, Value};
use tower::ServiceExt;

use orchard_api::{app, AppState};
use orchard_core::promo::PromoCode;
use orchard_store::app_config::{AutomationConfig, Config};

fn test_config() -> Config {
    Config {
        automation: AutomationConfig {
            email_delay_ms: 0,
            newsletter_delay_ms: 0,
            ..AutomationConfig::default()
        },
        ..Config::default()
    }
}

fn test_app() -> Router {
    app(AppState::in_memory(test_config()))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_slot(app: &Router, starts_in: Duration, capacity: i32) -> i64 {
    let start = Utc::now() + starts_in;
    let (status, body) = call(
        app,
        "POST",
        "/api/admin/slots",
        Some(json!({
            "activity": "safari",
            "startTime": start,
            "endTime": start + Duration::hours(2),
            "capacity": capacity,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body[0]["id"].as_i64().unwrap()
}

fn visit(slot_id: i64, quantity: i32) -> Value {
    json!({
        "slotId": slot_id,
        "quantity": quantity,
        "customerName": "Ana",
        "customerEmail": "ana@example.com",
    })
}

#[tokio::test]
async fn test_health_reports_memory_storage() {
    let (status, body) = call(&test_app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_booking_beyond_capacity_is_fully_booked() {
    let app = test_app();
    let slot_id = create_slot(&app, Duration::days(2), 4).await;

    let (status, body) = call(&app, "POST", "/api/book-visit", Some(visit(slot_id, 3))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "pending");

    let (status, body) = call(&app, "POST", "/api/book-visit", Some(visit(slot_id, 2))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "fully_booked");

    let (_, slots) = call(&app, "GET", "/api/slots", None).await;
    assert_eq!(slots[0]["booked"], 3);
    assert_eq!(slots[0]["remaining"], 1);
}

#[tokio::test]
async fn test_booking_unknown_or_started_slot() {
    let app = test_app();

    let (status, _) = call(&app, "POST", "/api/book-visit", Some(visit(404, 1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let past = create_slot(&app, Duration::hours(-1), 10).await;
    let (status, body) = call(&app, "POST", "/api/book-visit", Some(visit(past, 1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "slot_closed");

    let (status, _) = call(&app, "POST", "/api/book-visit", Some(visit(past, 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_bookings_never_overbook() {
    let app = test_app();
    let slot_id = create_slot(&app, Duration::days(1), 10).await;

    let responses = join_all((0..10).map(|_| call(&app, "POST", "/api/book-visit", Some(visit(slot_id, 3))))).await;

    let accepted = responses.iter().filter(|(status, _)| *status == StatusCode::OK).count();
    let rejected = responses
        .iter()
        .filter(|(status, body)| *status == StatusCode::CONFLICT && body["reason"] == "fully_booked")
        .count();
    assert_eq!(accepted, 3);
    assert_eq!(rejected, 7);

    let (_, bookings) = call(&app, "GET", "/api/admin/bookings", None).await;
    assert_eq!(bookings.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_visit_payment_confirms_once() {
    let app = test_app();
    let slot_id = create_slot(&app, Duration::days(2), 5).await;
    let (_, body) = call(&app, "POST", "/api/book-visit", Some(visit(slot_id, 2))).await;
    let token = body["booking"]["paymentToken"].as_str().unwrap().to_string();
    let booking_id = body["booking"]["id"].as_i64().unwrap();

    let uri = format!("/api/admin/bookings/{}/confirm", booking_id);
    let (status, body) = call(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "invalid_transition");

    let confirm = json!({ "paymentToken": token });
    let (status, body) = call(&app, "POST", "/api/confirm-visit-payment", Some(confirm.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "paid");

    let (status, body) = call(&app, "POST", "/api/confirm-visit-payment", Some(confirm)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "invalid_transition");

    let (status, body) = call(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (status, body) = call(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "invalid_transition");
}

#[tokio::test]
async fn test_recurring_slots_are_spaced_by_frequency() {
    let app = test_app();
    let start = Utc::now() + Duration::days(1);

    let (status, body) = call(
        &app,
        "POST",
        "/api/admin/slots",
        Some(json!({
            "activity": "apple picking",
            "startTime": start,
            "endTime": start + Duration::hours(3),
            "capacity": 8,
            "repeat": { "frequency": "weekly", "count": 3 },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let starts: Vec<DateTime<Utc>> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|slot| serde_json::from_value(slot["startTime"].clone()).unwrap())
        .collect();
    assert_eq!(starts.len(), 3);
    assert_eq!(starts[1] - starts[0], Duration::weeks(1));
    assert_eq!(starts[2] - starts[1], Duration::weeks(1));

    let (_, filtered) = call(&app, "GET", "/api/slots?activity=safari", None).await;
    assert!(filtered.as_array().unwrap().is_empty());

    let (status, _) = call(
        &app,
        "POST",
        "/api/admin/slots",
        Some(json!({
            "activity": "apple picking",
            "startTime": start,
            "endTime": start,
            "capacity": 8,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_adoption_with_one_time_code_and_gift() {
    let app = test_app();
    let (status, _) = call(
        &app,
        "POST",
        "/api/admin/promo-codes",
        Some(json!({ "code": "half", "discountPercent": 50, "oneTime": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "POST",
        "/api/adopt",
        Some(json!({
            "name": "Ana",
            "email": "ana@example.com",
            "country": "FI",
            "treeType": "Amorosa",
            "promoCode": "HALF",
            "isGift": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["basePriceCents"], 5000);
    assert_eq!(body["amountCents"], 2500);
    assert_eq!(body["promo"]["status"], "applied");
    assert_eq!(body["promo"]["consumed"], true);
    let gift_code = body["giftCode"].as_str().unwrap().to_string();
    assert!(gift_code.starts_with(&format!("GIFT-{}-", body["id"])));

    let (_, check) = call(&app, "GET", "/api/promo/validate?code=HALF", None).await;
    assert_eq!(check["valid"], false);
    assert_eq!(check["reason"], "already_used");

    let (_, check) = call(&app, "GET", &format!("/api/promo/validate?code={}", gift_code), None).await;
    assert_eq!(check["valid"], true);
    assert_eq!(check["finalPriceCents"], 0);

    let (status, _) = call(
        &app,
        "POST",
        "/api/admin/promo-codes",
        Some(json!({ "code": "HALF", "discountPercent": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_gift_code_exhaustion_is_a_server_error() {
    let state = AppState::in_memory(test_config());
    for suffix in 100..1000 {
        state.promos.create_promo_code(&PromoCode::gift(1, suffix)).await.unwrap();
    }
    let app = app(state);

    let (status, body) = call(
        &app,
        "POST",
        "/api/adopt",
        Some(json!({
            "name": "Ana",
            "email": "ana@example.com",
            "treeType": "Amorosa",
            "isGift": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("reason").is_none());

    let (_, customers) = call(&app, "GET", "/api/customers", None).await;
    assert_eq!(customers.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_adoption_rejects_unknown_tree_and_disabled_feature() {
    let (status, _) = call(
        &test_app(),
        "POST",
        "/api/adopt",
        Some(json!({ "name": "Ana", "email": "ana@example.com", "treeType": "Banana" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut config = test_config();
    config.features.adoptions_enabled = false;
    let (status, body) = call(
        &app(AppState::in_memory(config)),
        "POST",
        "/api/adopt",
        Some(json!({ "name": "Ana", "email": "ana@example.com", "treeType": "Amorosa" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_payment_confirmation_is_single_shot() {
    let app = test_app();
    let (_, adopted) = call(
        &app,
        "POST",
        "/api/adopt",
        Some(json!({ "name": "Ana", "email": "ana@example.com", "treeType": "Collina", "years": 2 })),
    )
    .await;
    assert_eq!(adopted["amountCents"], 10000);
    let customer_id = adopted["id"].as_i64().unwrap();

    let confirm = json!({ "customerId": customer_id });
    let (status, body) = call(&app, "POST", "/api/confirm-payment", Some(confirm.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment confirmed!");

    let (status, body) = call(&app, "POST", "/api/confirm-payment", Some(confirm)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "invalid_transition");

    let (status, _) = call(&app, "POST", "/api/confirm-payment", Some(json!({ "customerId": 9999 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, stats) = call(&app, "GET", "/api/stats", None).await;
    assert_eq!(stats["totalCustomers"], 1);
    assert_eq!(stats["paidCustomers"], 1);
}

#[tokio::test]
async fn test_feedback_rating_is_validated() {
    let app = test_app();
    let feedback = |rating: i32| {
        json!({ "surveyType": "farmshop", "rating": rating, "highlight": "Cider" })
    };

    let (status, _) = call(&app, "POST", "/api/feedback", Some(feedback(0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/api/feedback",
        Some(json!({ "surveyType": "cafe", "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "POST", "/api/feedback", Some(feedback(4))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Thank you for your feedback!");

    let (_, stats) = call(&app, "GET", "/api/feedback/stats", None).await;
    assert_eq!(stats["totalFarmshop"], 1);
    assert_eq!(stats["avgFarmshop"], 4.0);
    assert_eq!(stats["totalExperience"], 0);
}

#[tokio::test]
async fn test_content_updates_only_known_keys() {
    let app = test_app();

    let (status, _) = call(
        &app,
        "PUT",
        "/api/content",
        Some(json!({ "key": "footer_html", "value": "<b>hi</b>" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "PUT",
        "/api/content",
        Some(json!({ "key": "hero_tagline", "value": "Apples by the sea" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "Hero Tagline");

    let (_, body) = call(&app, "GET", "/api/content/hero_tagline", None).await;
    assert_eq!(body["value"], "Apples by the sea");

    let (_, all) = call(&app, "GET", "/api/content", None).await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.iter().any(|c| c["key"] == "about_text" && c["lastUpdated"].is_null()));
}

#[tokio::test]
async fn test_newsletter_counts_subscribers() {
    let app = test_app();
    let (status, body) = call(
        &app,
        "POST",
        "/api/admin/newsletters",
        Some(json!({ "subject": "Spring blossom", "body": "The trees are waking up." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipients"], 0);

    let (_, activity) = call(&app, "GET", "/api/activity?limit=5", None).await;
    assert_eq!(activity[0]["action"], "newsletter_sent");
}

#[tokio::test]
async fn test_customer_export_is_csv() {
    let app = test_app();
    call(
        &app,
        "POST",
        "/api/adopt",
        Some(json!({ "name": "Smith, Jo", "email": "jo@example.com", "treeType": "Discovery" })),
    )
    .await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/export/customers")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=customers.csv"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("ID,Name,Email"));
    assert!(lines.next().unwrap().contains("\"Smith, Jo\""));

    let (status, _) = call(&app, "GET", "/api/export/passwords", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_config_and_catalog() {
    let app = test_app();

    let (_, config) = call(&app, "GET", "/api/config", None).await;
    assert_eq!(config["features"]["surveys_enabled"], true);
    assert_eq!(config["defaults"]["adoption_price_cents"], 5000);

    let (status, updates) = call(&app, "GET", "/api/updates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updates[0]["title"], "Winter Pruning Complete");

    let (status, products) = call(&app, "GET", "/api/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(products.as_array().unwrap().is_empty());
}

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures_util::future::join_all;

use orchard_core::notifier::NoopNotifier;
use orchard_core::promo::PromoCode;
use orchard_core::repository::{ActivityRepository, CustomerRepository, PromoRepository, SlotRepository};
use orchard_core::slot::{BookingStatus, NewSlot, Slot};
use orchard_core::{
    LedgerError, NewAdoption, NotAppliedReason, Redemption, Reservation, ReservationLedger, ReserveSlot,
};
use orchard_store::app_config::AutomationConfig;
use orchard_store::{ActivityNotifier, MemoryStore};

fn ledger(store: &MemoryStore) -> Arc<ReservationLedger> {
    Arc::new(ReservationLedger::new(Arc::new(store.clone()), Arc::new(NoopNotifier)))
}

async fn future_slot(store: &MemoryStore, capacity: i32) -> Slot {
    let start = Utc::now() + Duration::days(3);
    store
        .create_slots(&[NewSlot {
            activity: "safari".to_string(),
            start_time: start,
            end_time: start + Duration::hours(2),
            capacity,
        }])
        .await
        .unwrap()
        .remove(0)
}

fn request(slot_id: i64, quantity: i32, who: usize) -> ReserveSlot {
    ReserveSlot {
        slot_id,
        quantity,
        customer_name: format!("Visitor {}", who),
        customer_email: format!("visitor{}@example.com", who),
    }
}

fn adoption(promo_code: Option<&str>, is_gift: bool) -> NewAdoption {
    NewAdoption {
        name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        country: "FI".to_string(),
        tree_type: "Amorosa".to_string(),
        years: 1,
        promo_code: promo_code.map(str::to_string),
        is_gift,
    }
}

#[tokio::test]
async fn test_two_concurrent_reservations_exactly_one_fits() {
    let store = MemoryStore::new();
    let slot = future_slot(&store, 10).await;
    let slot_id = slot.id;
    let ledger = ledger(&store);

    let handles: Vec<_> = (0..2)
        .map(|who| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.reserve_slot(request(slot_id, 6, who)).await })
        })
        .collect();

    let outcomes: Vec<Reservation> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let reserved = outcomes.iter().filter(|o| matches!(o, Reservation::Reserved(_))).count();
    assert_eq!(reserved, 1);
    assert!(outcomes.iter().any(|o| matches!(
        o,
        Reservation::CapacityExceeded { requested: 6, remaining: 4 }
    )));
    assert_eq!(store.get_slot(slot.id).await.unwrap().unwrap().booked, 6);
}

#[tokio::test]
async fn test_many_reservers_never_overbook() {
    let store = MemoryStore::new();
    let slot = future_slot(&store, 25).await;
    let slot_id = slot.id;
    let ledger = ledger(&store);

    let handles: Vec<_> = (0..40)
        .map(|who| {
            let ledger = ledger.clone();
            let quantity = (who % 3) as i32 + 1;
            tokio::spawn(async move { ledger.reserve_slot(request(slot_id, quantity, who)).await })
        })
        .collect();

    for joined in join_all(handles).await {
        let outcome = joined.unwrap().unwrap();
        assert!(matches!(
            outcome,
            Reservation::Reserved(_) | Reservation::CapacityExceeded { .. }
        ));
    }

    let booked = store.get_slot(slot.id).await.unwrap().unwrap().booked;
    let total: i32 = store
        .list_bookings()
        .await
        .unwrap()
        .iter()
        .filter(|b| b.slot_id == slot.id)
        .map(|b| b.quantity)
        .sum();

    assert!(booked <= 25);
    assert_eq!(total, booked);
}

#[tokio::test]
async fn test_reservation_creates_pending_booking() {
    let store = MemoryStore::new();
    let slot = future_slot(&store, 10).await;

    let outcome = ledger(&store).reserve_slot(request(slot.id, 3, 1)).await.unwrap();
    let booking = match outcome {
        Reservation::Reserved(booking) => booking,
        other => panic!("expected a booking, got {:?}", other),
    };

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.quantity, 3);
    assert!(!booking.payment_token.is_empty());
    assert_eq!(
        store.get_booking_by_token(&booking.payment_token).await.unwrap(),
        Some(booking)
    );
}

#[tokio::test]
async fn test_quantity_must_be_positive() {
    let store = MemoryStore::new();
    let slot = future_slot(&store, 10).await;
    let ledger = ledger(&store);

    for quantity in [0, -1] {
        let result = ledger.reserve_slot(request(slot.id, quantity, 1)).await;
        assert!(matches!(result, Err(LedgerError::InvalidQuantity(_))));
    }
    assert!(store.list_bookings().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_and_started_slots() {
    let store = MemoryStore::new();
    let ledger = ledger(&store);

    assert_eq!(
        ledger.reserve_slot(request(999, 1, 1)).await.unwrap(),
        Reservation::SlotNotFound
    );

    let start = Utc::now() - Duration::hours(1);
    let past = store
        .create_slots(&[NewSlot {
            activity: "safari".to_string(),
            start_time: start,
            end_time: start + Duration::hours(2),
            capacity: 10,
        }])
        .await
        .unwrap()
        .remove(0);

    assert_eq!(
        ledger.reserve_slot(request(past.id, 1, 1)).await.unwrap(),
        Reservation::SlotClosed
    );
    assert_eq!(store.get_slot(past.id).await.unwrap().unwrap().booked, 0);
}

#[tokio::test]
async fn test_repeatable_code_is_never_used_up() {
    let store = MemoryStore::new();
    store.create_promo_code(&PromoCode::new("SAVE10", 10, false).unwrap()).await.unwrap();
    let ledger = ledger(&store);

    for _ in 0..3 {
        let redemption = ledger.redeem_promo_code("save10", 6000).await.unwrap();
        assert_eq!(
            redemption,
            Redemption::Applied {
                code: "SAVE10".to_string(),
                discount_percent: 10,
                base_price_cents: 6000,
                final_price_cents: 5400,
                consumed: false,
            }
        );
    }

    assert!(!store.get_promo_code("SAVE10").await.unwrap().unwrap().used);
}

#[tokio::test]
async fn test_gift_code_applies_once() {
    let store = MemoryStore::new();
    store.create_promo_code(&PromoCode::gift(42, 103)).await.unwrap();
    let ledger = ledger(&store);

    let first = ledger.redeem_promo_code("GIFT-42-103", 12000).await.unwrap();
    assert_eq!(first.final_price_cents(), 0);
    assert!(store.get_promo_code("GIFT-42-103").await.unwrap().unwrap().used);

    let second = ledger.redeem_promo_code("GIFT-42-103", 12000).await.unwrap();
    assert_eq!(
        second,
        Redemption::NotApplied {
            reason: NotAppliedReason::AlreadyUsed,
            price_cents: 12000,
        }
    );
}

#[tokio::test]
async fn test_unknown_code_is_a_no_op() {
    let store = MemoryStore::new();
    let ledger = ledger(&store);

    let redemption = ledger.redeem_promo_code("NOPE", 6000).await.unwrap();
    assert_eq!(
        redemption,
        Redemption::NotApplied {
            reason: NotAppliedReason::UnknownCode,
            price_cents: 6000,
        }
    );
    assert!(store.list_promo_codes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_one_time_redemptions_apply_once() {
    let store = MemoryStore::new();
    store.create_promo_code(&PromoCode::new("WELCOME", 25, true).unwrap()).await.unwrap();
    let ledger = ledger(&store);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.redeem_promo_code("WELCOME", 8000).await })
        })
        .collect();

    let redemptions: Vec<Redemption> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(redemptions.iter().filter(|r| r.is_applied()).count(), 1);
    assert!(redemptions
        .iter()
        .filter(|r| !r.is_applied())
        .all(|r| r.final_price_cents() == 8000));
}

#[tokio::test]
async fn test_adoption_consumes_one_time_code_with_customer() {
    let store = MemoryStore::new();
    store.create_promo_code(&PromoCode::new("HALF", 50, true).unwrap()).await.unwrap();
    let ledger = ledger(&store);

    let first = ledger.sign_up_adoption(adoption(Some("half"), false), 5000).await.unwrap();
    assert_eq!(first.customer.amount_cents, 2500);
    assert_eq!(first.customer.promo_code.as_deref(), Some("HALF"));
    assert!(first.gift_code.is_none());

    let second = ledger.sign_up_adoption(adoption(Some("HALF"), false), 5000).await.unwrap();
    assert_eq!(second.customer.amount_cents, 5000);
    assert_eq!(second.customer.promo_code, None);
    assert_eq!(
        second.redemption.map(|r| r.final_price_cents()),
        Some(5000)
    );

    assert_eq!(store.list_customers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_adoptions_share_one_time_code_once() {
    let store = MemoryStore::new();
    store.create_promo_code(&PromoCode::new("ONCE", 50, true).unwrap()).await.unwrap();
    let ledger = ledger(&store);

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.sign_up_adoption(adoption(Some("ONCE"), false), 5000).await })
        })
        .collect();
    for joined in join_all(handles).await {
        joined.unwrap().unwrap();
    }

    let customers = store.list_customers().await.unwrap();
    assert_eq!(customers.len(), 12);
    let discounted: Vec<_> = customers.iter().filter(|c| c.promo_code.is_some()).collect();
    assert_eq!(discounted.len(), 1);
    assert_eq!(discounted[0].promo_code.as_deref(), Some("ONCE"));
    assert_eq!(discounted[0].amount_cents, 2500);
    assert!(customers
        .iter()
        .filter(|c| c.promo_code.is_none())
        .all(|c| c.amount_cents == 5000));

    assert!(store.get_promo_code("ONCE").await.unwrap().unwrap().used);
}

#[tokio::test]
async fn test_gift_adoption_issues_one_unused_code() {
    let store = MemoryStore::new();
    let ledger = ledger(&store);

    let receipt = ledger.sign_up_adoption(adoption(None, true), 5000).await.unwrap();
    let gift = receipt.gift_code.unwrap();

    assert!(gift.code.starts_with(&format!("GIFT-{}-", receipt.customer.id)));
    let stored = store.get_promo_code(&gift.code).await.unwrap().unwrap();
    assert_eq!(stored.discount_percent, 100);
    assert!(stored.one_time);
    assert!(!stored.used);
    assert_eq!(store.list_promo_codes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_activity_notifier_records_ledger_events() {
    let store = MemoryStore::new();
    let slot = future_slot(&store, 4).await;
    let notifier = Arc::new(ActivityNotifier::new(Arc::new(store.clone()), AutomationConfig::default()));
    let ledger = ReservationLedger::new(Arc::new(store.clone()), notifier);

    ledger.reserve_slot(request(slot.id, 2, 7)).await.unwrap();
    ledger.sign_up_adoption(adoption(None, false), 5000).await.unwrap();

    let actions: Vec<String> = store
        .list_activity(10)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(actions, vec!["adoption_started", "visit_booked"]);
}

//! Process-local store used by tests and by `storage.backend = "memory"`.
//!
//! There are no row locks here, so the ledger's exclusivity requirement is met
//! with one async mutex per slot id and per promo code. A transaction holds the
//! guards it acquired until it commits or is dropped, stages its writes, and
//! applies them in one step under the table lock at commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use orchard_core::activity::{ActivityLogEntry, NewActivity};
use orchard_core::content::SiteContent;
use orchard_core::customer::{Customer, CustomerStats, CustomerStatus, NewCustomer, NewsletterStage};
use orchard_core::feedback::{Feedback, FeedbackStats, NewFeedback};
use orchard_core::inquiry::{Inquiry, InquiryStatus, NewInquiry};
use orchard_core::newsletter::{NewNewsletter, Newsletter};
use orchard_core::promo::{normalize_code, PromoCode};
use orchard_core::repository::{
    ActivityRepository, ContentRepository, CustomerRepository, FeedbackRepository, InquiryRepository,
    LedgerStore, LedgerTransaction, NewsletterRepository, PromoRepository, SlotRepository,
};
use orchard_core::slot::{Booking, BookingStatus, NewBooking, NewSlot, Slot};
use orchard_core::{StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    customers: BTreeMap<i64, Customer>,
    activity: BTreeMap<i64, ActivityLogEntry>,
    slots: BTreeMap<i64, Slot>,
    bookings: BTreeMap<i64, Booking>,
    promo_codes: BTreeMap<String, PromoCode>,
    feedback: BTreeMap<i64, Feedback>,
    content: BTreeMap<String, SiteContent>,
    inquiries: BTreeMap<i64, Inquiry>,
    newsletters: BTreeMap<i64, Newsletter>,
}

#[derive(Default)]
struct Sequences {
    customers: AtomicI64,
    activity: AtomicI64,
    slots: AtomicI64,
    bookings: AtomicI64,
    feedback: AtomicI64,
    inquiries: AtomicI64,
    newsletters: AtomicI64,
}

fn next(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Slot(i64),
    Promo(String),
}

type KeyLocks = Arc<StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>>;

#[derive(Default)]
struct Inner {
    tables: RwLock<Tables>,
    sequences: Sequences,
    key_locks: KeyLocks,
}

impl Inner {
    async fn lock_key(&self, key: LockKey) -> KeyGuard {
        let lock = {
            let mut locks = lock_map(&self.key_locks);
            locks.entry(key.clone()).or_default().clone()
        };
        KeyGuard {
            guard: Some(lock.lock_owned().await),
            key,
            locks: self.key_locks.clone(),
        }
    }
}

fn lock_map(locks: &KeyLocks) -> MutexGuard<'_, HashMap<LockKey, Arc<Mutex<()>>>> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive hold on one key. The map entry goes away with the last holder or waiter.
struct KeyGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: LockKey,
    locks: KeyLocks,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        let mut locks = lock_map(&self.locks);
        // Waiters clone the Arc under the map lock, so map + this guard means nobody else.
        if locks.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 2) {
            locks.remove(&self.key);
        }
        self.guard.take();
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for MemoryStore {
    async fn get_customer(&self, id: i64) -> StoreResult<Option<Customer>> {
        Ok(self.inner.tables.read().await.customers.get(&id).cloned())
    }

    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        Ok(self.inner.tables.read().await.customers.values().rev().cloned().collect())
    }

    async fn transition_customer(
        &self,
        id: i64,
        from: CustomerStatus,
        to: CustomerStatus,
        stage: Option<NewsletterStage>,
    ) -> StoreResult<Option<Customer>> {
        let mut tables = self.inner.tables.write().await;
        match tables.customers.get_mut(&id) {
            Some(customer) if customer.status == from => {
                customer.status = to;
                if let Some(stage) = stage {
                    customer.newsletter_stage = stage;
                }
                Ok(Some(customer.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn customer_stats(&self) -> StoreResult<CustomerStats> {
        let tables = self.inner.tables.read().await;
        let customers: Vec<Customer> = tables.customers.values().cloned().collect();
        Ok(CustomerStats::from_customers(&customers))
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn record_activity(&self, activity: &NewActivity) -> StoreResult<ActivityLogEntry> {
        let entry = ActivityLogEntry {
            id: next(&self.inner.sequences.activity),
            customer_id: activity.customer_id,
            action: activity.action.clone(),
            message: activity.message.clone(),
            created_at: Utc::now(),
        };
        self.inner.tables.write().await.activity.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn list_activity(&self, limit: i64) -> StoreResult<Vec<ActivityLogEntry>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .inner
            .tables
            .read()
            .await
            .activity
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SlotRepository for MemoryStore {
    async fn create_slots(&self, slots: &[NewSlot]) -> StoreResult<Vec<Slot>> {
        for slot in slots {
            if slot.capacity < 0 {
                return Err(StoreError::InvalidRow(format!("capacity cannot be negative: {}", slot.capacity)));
            }
            if slot.end_time <= slot.start_time {
                return Err(StoreError::InvalidRow("slot must end after it starts".to_string()));
            }
        }

        let now = Utc::now();
        let created: Vec<Slot> = slots
            .iter()
            .map(|slot| Slot {
                id: next(&self.inner.sequences.slots),
                activity: slot.activity.clone(),
                start_time: slot.start_time,
                end_time: slot.end_time,
                capacity: slot.capacity,
                booked: 0,
                created_at: now,
            })
            .collect();

        let mut tables = self.inner.tables.write().await;
        for slot in &created {
            tables.slots.insert(slot.id, slot.clone());
        }
        Ok(created)
    }

    async fn list_slots(
        &self,
        activity: Option<&str>,
        starting_after: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Slot>> {
        let tables = self.inner.tables.read().await;
        let mut slots: Vec<Slot> = tables
            .slots
            .values()
            .filter(|slot| activity.map_or(true, |a| slot.activity == a))
            .filter(|slot| starting_after.map_or(true, |t| slot.start_time > t))
            .cloned()
            .collect();
        slots.sort_by_key(|slot| (slot.start_time, slot.id));
        Ok(slots)
    }

    async fn get_slot(&self, id: i64) -> StoreResult<Option<Slot>> {
        Ok(self.inner.tables.read().await.slots.get(&id).cloned())
    }

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        Ok(self.inner.tables.read().await.bookings.values().rev().cloned().collect())
    }

    async fn get_booking(&self, id: i64) -> StoreResult<Option<Booking>> {
        Ok(self.inner.tables.read().await.bookings.get(&id).cloned())
    }

    async fn get_booking_by_token(&self, payment_token: &str) -> StoreResult<Option<Booking>> {
        Ok(self
            .inner
            .tables
            .read()
            .await
            .bookings
            .values()
            .find(|b| b.payment_token == payment_token)
            .cloned())
    }

    async fn transition_booking(
        &self,
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Option<Booking>> {
        let mut tables = self.inner.tables.write().await;
        match tables.bookings.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl PromoRepository for MemoryStore {
    async fn create_promo_code(&self, promo: &PromoCode) -> StoreResult<PromoCode> {
        let mut tables = self.inner.tables.write().await;
        if tables.promo_codes.contains_key(&promo.code) {
            return Err(StoreError::Duplicate(format!("promo code {}", promo.code)));
        }
        let stored = PromoCode {
            used: false,
            created_at: Utc::now(),
            ..promo.clone()
        };
        tables.promo_codes.insert(stored.code.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_promo_code(&self, code: &str) -> StoreResult<Option<PromoCode>> {
        let code = normalize_code(code);
        Ok(self.inner.tables.read().await.promo_codes.get(&code).cloned())
    }

    async fn list_promo_codes(&self) -> StoreResult<Vec<PromoCode>> {
        let mut codes: Vec<PromoCode> = self.inner.tables.read().await.promo_codes.values().cloned().collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.code.cmp(&b.code)));
        Ok(codes)
    }
}

#[async_trait]
impl FeedbackRepository for MemoryStore {
    async fn create_feedback(&self, feedback: &NewFeedback) -> StoreResult<Feedback> {
        let stored = Feedback {
            id: next(&self.inner.sequences.feedback),
            survey_type: feedback.survey_type,
            rating: feedback.rating,
            experience: feedback.experience.clone(),
            highlight: feedback.highlight.clone(),
            improvement: feedback.improvement.clone(),
            would_recommend: feedback.would_recommend,
            email: feedback.email.clone(),
            created_at: Utc::now(),
        };
        self.inner.tables.write().await.feedback.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_feedback(&self) -> StoreResult<Vec<Feedback>> {
        Ok(self.inner.tables.read().await.feedback.values().rev().cloned().collect())
    }

    async fn feedback_stats(&self) -> StoreResult<FeedbackStats> {
        let tables = self.inner.tables.read().await;
        let feedback: Vec<Feedback> = tables.feedback.values().cloned().collect();
        Ok(FeedbackStats::from_feedback(&feedback))
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn list_content(&self) -> StoreResult<Vec<SiteContent>> {
        Ok(self.inner.tables.read().await.content.values().cloned().collect())
    }

    async fn get_content(&self, key: &str) -> StoreResult<Option<SiteContent>> {
        Ok(self.inner.tables.read().await.content.get(key).cloned())
    }

    async fn upsert_content(&self, key: &str, label: &str, value: &str) -> StoreResult<SiteContent> {
        let mut tables = self.inner.tables.write().await;
        let row = tables.content.entry(key.to_string()).or_insert_with(|| SiteContent {
            key: key.to_string(),
            value: String::new(),
            label: label.to_string(),
            last_updated: None,
        });
        row.value = value.to_string();
        row.last_updated = Some(Utc::now());
        Ok(row.clone())
    }
}

#[async_trait]
impl InquiryRepository for MemoryStore {
    async fn create_inquiry(&self, inquiry: &NewInquiry) -> StoreResult<Inquiry> {
        let stored = Inquiry {
            id: next(&self.inner.sequences.inquiries),
            name: inquiry.name.clone(),
            email: inquiry.email.clone(),
            activity: inquiry.activity.clone(),
            proposed_date: inquiry.proposed_date.clone(),
            message: inquiry.message.clone(),
            status: InquiryStatus::Pending,
            created_at: Utc::now(),
        };
        self.inner.tables.write().await.inquiries.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_inquiries(&self) -> StoreResult<Vec<Inquiry>> {
        Ok(self.inner.tables.read().await.inquiries.values().rev().cloned().collect())
    }

    async fn set_inquiry_status(&self, id: i64, status: InquiryStatus) -> StoreResult<Option<Inquiry>> {
        let mut tables = self.inner.tables.write().await;
        Ok(tables.inquiries.get_mut(&id).map(|inquiry| {
            inquiry.status = status;
            inquiry.clone()
        }))
    }
}

#[async_trait]
impl NewsletterRepository for MemoryStore {
    async fn create_newsletter(&self, newsletter: &NewNewsletter) -> StoreResult<Newsletter> {
        let stored = Newsletter {
            id: next(&self.inner.sequences.newsletters),
            subject: newsletter.subject.clone(),
            body: newsletter.body.clone(),
            recipients: newsletter.recipients,
            created_at: Utc::now(),
        };
        self.inner.tables.write().await.newsletters.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_newsletters(&self) -> StoreResult<Vec<Newsletter>> {
        Ok(self.inner.tables.read().await.newsletters.values().rev().cloned().collect())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTransaction>> {
        Ok(Box::new(MemoryTransaction {
            store: self.inner.clone(),
            guards: HashMap::new(),
            booked: HashMap::new(),
            bookings: Vec::new(),
            used_codes: Vec::new(),
            customers: Vec::new(),
        }))
    }

    async fn insert_promo_code(&self, promo: &PromoCode) -> StoreResult<bool> {
        let mut tables = self.inner.tables.write().await;
        if tables.promo_codes.contains_key(&promo.code) {
            return Ok(false);
        }
        tables.promo_codes.insert(promo.code.clone(), promo.clone());
        Ok(true)
    }
}

/// Staged ledger writes plus the key guards that make them exclusive.
pub struct MemoryTransaction {
    store: Arc<Inner>,
    guards: HashMap<LockKey, KeyGuard>,
    booked: HashMap<i64, i32>,
    bookings: Vec<Booking>,
    used_codes: Vec<String>,
    customers: Vec<Customer>,
}

impl MemoryTransaction {
    async fn hold(&mut self, key: LockKey) {
        if !self.guards.contains_key(&key) {
            let guard = self.store.lock_key(key.clone()).await;
            self.guards.insert(key, guard);
        }
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn lock_slot(&mut self, slot_id: i64) -> StoreResult<Option<Slot>> {
        self.hold(LockKey::Slot(slot_id)).await;

        let tables = self.store.tables.read().await;
        Ok(tables.slots.get(&slot_id).map(|slot| Slot {
            booked: slot.booked + self.booked.get(&slot_id).copied().unwrap_or(0),
            ..slot.clone()
        }))
    }

    async fn add_booked(&mut self, slot_id: i64, quantity: i32) -> StoreResult<()> {
        self.hold(LockKey::Slot(slot_id)).await;

        if !self.store.tables.read().await.slots.contains_key(&slot_id) {
            return Err(StoreError::NotFound(format!("slot {}", slot_id)));
        }
        *self.booked.entry(slot_id).or_insert(0) += quantity;
        Ok(())
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> StoreResult<Booking> {
        let stored = Booking {
            id: next(&self.store.sequences.bookings),
            slot_id: booking.slot_id,
            customer_name: booking.customer_name.clone(),
            customer_email: booking.customer_email.clone(),
            quantity: booking.quantity,
            status: BookingStatus::Pending,
            payment_token: booking.payment_token.clone(),
            created_at: Utc::now(),
        };
        self.bookings.push(stored.clone());
        Ok(stored)
    }

    async fn lock_promo(&mut self, code: &str) -> StoreResult<Option<PromoCode>> {
        self.hold(LockKey::Promo(code.to_string())).await;

        let tables = self.store.tables.read().await;
        Ok(tables.promo_codes.get(code).map(|promo| PromoCode {
            used: promo.used || self.used_codes.iter().any(|c| c == code),
            ..promo.clone()
        }))
    }

    async fn mark_promo_used(&mut self, code: &str) -> StoreResult<()> {
        self.hold(LockKey::Promo(code.to_string())).await;

        if !self.store.tables.read().await.promo_codes.contains_key(code) {
            return Err(StoreError::NotFound(format!("promo code {}", code)));
        }
        self.used_codes.push(code.to_string());
        Ok(())
    }

    async fn insert_customer(&mut self, customer: &NewCustomer) -> StoreResult<Customer> {
        let stored = Customer {
            id: next(&self.store.sequences.customers),
            name: customer.name.clone(),
            email: customer.email.clone(),
            country: customer.country.clone(),
            tree_type: customer.tree_type.clone(),
            years: customer.years,
            promo_code: customer.promo_code.clone(),
            is_gift: customer.is_gift,
            amount_cents: customer.amount_cents,
            status: CustomerStatus::Interested,
            newsletter_stage: NewsletterStage::None,
            created_at: Utc::now(),
        };
        self.customers.push(stored.clone());
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        let mut tables = this.store.tables.write().await;

        // Same guarantee as the Postgres CHECK (booked <= capacity).
        for (slot_id, delta) in &this.booked {
            let slot = tables
                .slots
                .get(slot_id)
                .ok_or_else(|| StoreError::NotFound(format!("slot {}", slot_id)))?;
            if slot.booked + delta > slot.capacity {
                return Err(StoreError::Conflict(format!(
                    "slot {} would exceed its capacity of {}",
                    slot_id, slot.capacity
                )));
            }
        }

        for (slot_id, delta) in this.booked {
            if let Some(slot) = tables.slots.get_mut(&slot_id) {
                slot.booked += delta;
            }
        }
        for booking in this.bookings {
            tables.bookings.insert(booking.id, booking);
        }
        for code in this.used_codes {
            if let Some(promo) = tables.promo_codes.get_mut(&code) {
                promo.used = true;
            }
        }
        for customer in this.customers {
            tables.customers.insert(customer.id, customer);
        }

        drop(tables);
        drop(this.guards);
        Ok(())
    }
}

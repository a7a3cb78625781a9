use std::error::Error;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::activity::{ActivityLogEntry, NewActivity};
use crate::content::SiteContent;
use crate::customer::{Customer, CustomerStats, CustomerStatus, NewCustomer, NewsletterStage};
use crate::feedback::{Feedback, FeedbackStats, NewFeedback};
use crate::inquiry::{Inquiry, InquiryStatus, NewInquiry};
use crate::newsletter::{NewNewsletter, Newsletter};
use crate::promo::PromoCode;
use crate::slot::{Booking, BookingStatus, NewBooking, NewSlot, Slot};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    /// A unique key already holds this value.
    #[error("{0} already exists")]
    Duplicate(String),
    /// A write would break a stored invariant.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid row: {0}")]
    InvalidRow(String),
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        StoreError::Backend(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Adopters. Rows are created by the ledger, inside its transaction.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn get_customer(&self, id: i64) -> StoreResult<Option<Customer>>;

    async fn list_customers(&self) -> StoreResult<Vec<Customer>>;

    /// Compare-and-set on `status`. `None` when the customer is not currently in `from`.
    async fn transition_customer(
        &self,
        id: i64,
        from: CustomerStatus,
        to: CustomerStatus,
        stage: Option<NewsletterStage>,
    ) -> StoreResult<Option<Customer>>;

    async fn customer_stats(&self) -> StoreResult<CustomerStats>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn record_activity(&self, activity: &NewActivity) -> StoreResult<ActivityLogEntry>;

    /// Newest first.
    async fn list_activity(&self, limit: i64) -> StoreResult<Vec<ActivityLogEntry>>;
}

/// Slots and bookings outside the reservation path. `booked` is never written here.
#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// All-or-nothing.
    async fn create_slots(&self, slots: &[NewSlot]) -> StoreResult<Vec<Slot>>;

    /// Ordered by start time.
    async fn list_slots(
        &self,
        activity: Option<&str>,
        starting_after: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Slot>>;

    async fn get_slot(&self, id: i64) -> StoreResult<Option<Slot>>;

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>>;

    async fn get_booking(&self, id: i64) -> StoreResult<Option<Booking>>;

    async fn get_booking_by_token(&self, payment_token: &str) -> StoreResult<Option<Booking>>;

    /// Compare-and-set on `status`. `None` when the booking is not currently in `from`.
    async fn transition_booking(
        &self,
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Option<Booking>>;
}

#[async_trait]
pub trait PromoRepository: Send + Sync {
    /// `StoreError::Duplicate` if the code exists.
    async fn create_promo_code(&self, promo: &PromoCode) -> StoreResult<PromoCode>;

    async fn get_promo_code(&self, code: &str) -> StoreResult<Option<PromoCode>>;

    async fn list_promo_codes(&self) -> StoreResult<Vec<PromoCode>>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn create_feedback(&self, feedback: &NewFeedback) -> StoreResult<Feedback>;

    async fn list_feedback(&self) -> StoreResult<Vec<Feedback>>;

    async fn feedback_stats(&self) -> StoreResult<FeedbackStats>;
}

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Stored rows only; callers merge with the defaults.
    async fn list_content(&self) -> StoreResult<Vec<SiteContent>>;

    async fn get_content(&self, key: &str) -> StoreResult<Option<SiteContent>>;

    async fn upsert_content(&self, key: &str, label: &str, value: &str) -> StoreResult<SiteContent>;
}

#[async_trait]
pub trait InquiryRepository: Send + Sync {
    async fn create_inquiry(&self, inquiry: &NewInquiry) -> StoreResult<Inquiry>;

    async fn list_inquiries(&self) -> StoreResult<Vec<Inquiry>>;

    async fn set_inquiry_status(&self, id: i64, status: InquiryStatus) -> StoreResult<Option<Inquiry>>;
}

#[async_trait]
pub trait NewsletterRepository: Send + Sync {
    async fn create_newsletter(&self, newsletter: &NewNewsletter) -> StoreResult<Newsletter>;

    async fn list_newsletters(&self) -> StoreResult<Vec<Newsletter>>;
}

/// What the reservation ledger needs from a store.
///
/// Every `lock_*` call must give the transaction exclusive access to that row
/// until commit or drop, so that a read-check-write sequence on one slot or one
/// promo code is indivisible for concurrent callers. Postgres does this with
/// `SELECT ... FOR UPDATE`; stores without row locks hold a per-key mutex.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTransaction>>;

    /// Inserts the code unless one with the same text exists. Returns whether it was inserted.
    async fn insert_promo_code(&self, promo: &PromoCode) -> StoreResult<bool>;
}

/// An open ledger transaction. Dropping it without `commit` discards every write.
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn lock_slot(&mut self, slot_id: i64) -> StoreResult<Option<Slot>>;

    async fn add_booked(&mut self, slot_id: i64, quantity: i32) -> StoreResult<()>;

    async fn insert_booking(&mut self, booking: &NewBooking) -> StoreResult<Booking>;

    async fn lock_promo(&mut self, code: &str) -> StoreResult<Option<PromoCode>>;

    async fn mark_promo_used(&mut self, code: &str) -> StoreResult<()>;

    async fn insert_customer(&mut self, customer: &NewCustomer) -> StoreResult<Customer>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

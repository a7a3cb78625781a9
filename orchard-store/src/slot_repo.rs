use async_trait::async_trait;
use chrono::{DateTime, Utc};

use orchard_core::inquiry::{Inquiry, InquiryStatus, NewInquiry};
use orchard_core::repository::{InquiryRepository, SlotRepository};
use orchard_core::slot::{Booking, BookingStatus, NewSlot, Slot};
use orchard_core::StoreResult;

use crate::database::{map_sqlx, parse_column, PgStore};

pub(crate) const SLOT_COLUMNS: &str = "id, activity, start_time, end_time, capacity, booked, created_at";
pub(crate) const BOOKING_COLUMNS: &str =
    "id, slot_id, customer_name, customer_email, quantity, status, payment_token, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct SlotRow {
    id: i64,
    activity: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    capacity: i32,
    booked: i32,
    created_at: DateTime<Utc>,
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Self {
            id: row.id,
            activity: row.activity,
            start_time: row.start_time,
            end_time: row.end_time,
            capacity: row.capacity,
            booked: row.booked,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    id: i64,
    slot_id: i64,
    customer_name: String,
    customer_email: String,
    quantity: i32,
    status: String,
    payment_token: String,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    pub(crate) fn into_booking(self) -> StoreResult<Booking> {
        Ok(Booking {
            id: self.id,
            slot_id: self.slot_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            quantity: self.quantity,
            status: parse_column(&self.status)?,
            payment_token: self.payment_token,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InquiryRow {
    id: i64,
    name: String,
    email: String,
    activity: String,
    proposed_date: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl InquiryRow {
    fn into_inquiry(self) -> StoreResult<Inquiry> {
        Ok(Inquiry {
            id: self.id,
            name: self.name,
            email: self.email,
            activity: self.activity,
            proposed_date: self.proposed_date,
            message: self.message,
            status: parse_column(&self.status)?,
            created_at: self.created_at,
        })
    }
}

const INQUIRY_COLUMNS: &str = "id, name, email, activity, proposed_date, message, status, created_at";

#[async_trait]
impl SlotRepository for PgStore {
    async fn create_slots(&self, slots: &[NewSlot]) -> StoreResult<Vec<Slot>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let mut created = Vec::with_capacity(slots.len());

        for slot in slots {
            let row: SlotRow = sqlx::query_as(&format!(
                r#"
                INSERT INTO slots (activity, start_time, end_time, capacity)
                VALUES ($1, $2, $3, $4)
                RETURNING {}
                "#,
                SLOT_COLUMNS
            ))
            .bind(&slot.activity)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(slot.capacity)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx)?;
            created.push(row.into());
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(created)
    }

    async fn list_slots(
        &self,
        activity: Option<&str>,
        starting_after: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Slot>> {
        let rows: Vec<SlotRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM slots
            WHERE ($1::TEXT IS NULL OR activity = $1)
              AND ($2::TIMESTAMPTZ IS NULL OR start_time > $2)
            ORDER BY start_time, id
            "#,
            SLOT_COLUMNS
        ))
        .bind(activity)
        .bind(starting_after)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(Slot::from).collect())
    }

    async fn get_slot(&self, id: i64) -> StoreResult<Option<Slot>> {
        let row: Option<SlotRow> =
            sqlx::query_as(&format!("SELECT {} FROM slots WHERE id = $1", SLOT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        Ok(row.map(Slot::from))
    }

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings ORDER BY created_at DESC, id DESC",
            BOOKING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn get_booking(&self, id: i64) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn get_booking_by_token(&self, payment_token: &str) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE payment_token = $1",
            BOOKING_COLUMNS
        ))
        .bind(payment_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn transition_booking(
        &self,
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "UPDATE bookings SET status = $3 WHERE id = $1 AND status = $2 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(BookingRow::into_booking).transpose()
    }
}

#[async_trait]
impl InquiryRepository for PgStore {
    async fn create_inquiry(&self, inquiry: &NewInquiry) -> StoreResult<Inquiry> {
        let row: InquiryRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO inquiries (name, email, activity, proposed_date, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            INQUIRY_COLUMNS
        ))
        .bind(&inquiry.name)
        .bind(&inquiry.email)
        .bind(&inquiry.activity)
        .bind(&inquiry.proposed_date)
        .bind(&inquiry.message)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.into_inquiry()
    }

    async fn list_inquiries(&self) -> StoreResult<Vec<Inquiry>> {
        let rows: Vec<InquiryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM inquiries ORDER BY created_at DESC, id DESC",
            INQUIRY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(InquiryRow::into_inquiry).collect()
    }

    async fn set_inquiry_status(&self, id: i64, status: InquiryStatus) -> StoreResult<Option<Inquiry>> {
        let row: Option<InquiryRow> = sqlx::query_as(&format!(
            "UPDATE inquiries SET status = $2 WHERE id = $1 RETURNING {}",
            INQUIRY_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(InquiryRow::into_inquiry).transpose()
    }
}

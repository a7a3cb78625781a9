use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use orchard_core::customer::{Customer, NewCustomer};
use orchard_core::promo::PromoCode;
use orchard_core::repository::{LedgerStore, LedgerTransaction};
use orchard_core::slot::{Booking, NewBooking, Slot};
use orchard_core::{StoreError, StoreResult};

use crate::customer_repo::{CustomerRow, CUSTOMER_COLUMNS};
use crate::database::{map_sqlx, PgStore};
use crate::promo_repo::{PromoRow, PROMO_COLUMNS};
use crate::slot_repo::{BookingRow, SlotRow, BOOKING_COLUMNS, SLOT_COLUMNS};

#[async_trait]
impl LedgerStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx)?;
        Ok(Box::new(PgLedgerTransaction { tx }))
    }

    async fn insert_promo_code(&self, promo: &PromoCode) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO promo_codes (code, discount_percent, one_time, used)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(&promo.code)
        .bind(promo.discount_percent)
        .bind(promo.one_time)
        .bind(promo.used)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.rows_affected() == 1)
    }
}

/// Row locks are taken with `FOR UPDATE` and held until commit or rollback.
pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn lock_slot(&mut self, slot_id: i64) -> StoreResult<Option<Slot>> {
        let row: Option<SlotRow> = sqlx::query_as(&format!(
            "SELECT {} FROM slots WHERE id = $1 FOR UPDATE",
            SLOT_COLUMNS
        ))
        .bind(slot_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(Slot::from))
    }

    async fn add_booked(&mut self, slot_id: i64, quantity: i32) -> StoreResult<()> {
        let result = sqlx::query("UPDATE slots SET booked = booked + $2 WHERE id = $1")
            .bind(slot_id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("slot {}", slot_id)));
        }
        Ok(())
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> StoreResult<Booking> {
        let row: BookingRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO bookings (slot_id, customer_name, customer_email, quantity, status, payment_token)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking.slot_id)
        .bind(&booking.customer_name)
        .bind(&booking.customer_email)
        .bind(booking.quantity)
        .bind(&booking.payment_token)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        row.into_booking()
    }

    async fn lock_promo(&mut self, code: &str) -> StoreResult<Option<PromoCode>> {
        let row: Option<PromoRow> = sqlx::query_as(&format!(
            "SELECT {} FROM promo_codes WHERE code = $1 FOR UPDATE",
            PROMO_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(PromoCode::from))
    }

    async fn mark_promo_used(&mut self, code: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE promo_codes SET used = TRUE WHERE code = $1")
            .bind(code)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("promo code {}", code)));
        }
        Ok(())
    }

    async fn insert_customer(&mut self, customer: &NewCustomer) -> StoreResult<Customer> {
        let row: CustomerRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO customers
                (name, email, country, tree_type, years, promo_code, is_gift, amount_cents, status, newsletter_stage)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'interested', 'none')
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.country)
        .bind(&customer.tree_type)
        .bind(customer.years)
        .bind(&customer.promo_code)
        .bind(customer.is_gift)
        .bind(customer.amount_cents)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        row.into_customer()
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx)
    }
}

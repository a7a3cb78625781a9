use async_trait::async_trait;
use chrono::{DateTime, Utc};

use orchard_core::promo::{normalize_code, PromoCode};
use orchard_core::repository::PromoRepository;
use orchard_core::{StoreError, StoreResult};

use crate::database::{map_sqlx, PgStore};

pub(crate) const PROMO_COLUMNS: &str = "code, discount_percent, one_time, used, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PromoRow {
    code: String,
    discount_percent: i32,
    one_time: bool,
    used: bool,
    created_at: DateTime<Utc>,
}

impl From<PromoRow> for PromoCode {
    fn from(row: PromoRow) -> Self {
        Self {
            code: row.code,
            discount_percent: row.discount_percent,
            one_time: row.one_time,
            used: row.used,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PromoRepository for PgStore {
    async fn create_promo_code(&self, promo: &PromoCode) -> StoreResult<PromoCode> {
        let row: PromoRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO promo_codes (code, discount_percent, one_time, used)
            VALUES ($1, $2, $3, FALSE)
            RETURNING {}
            "#,
            PROMO_COLUMNS
        ))
        .bind(&promo.code)
        .bind(promo.discount_percent)
        .bind(promo.one_time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx(e) {
            StoreError::Duplicate(_) => StoreError::Duplicate(format!("promo code {}", promo.code)),
            other => other,
        })?;

        Ok(row.into())
    }

    async fn get_promo_code(&self, code: &str) -> StoreResult<Option<PromoCode>> {
        let row: Option<PromoRow> =
            sqlx::query_as(&format!("SELECT {} FROM promo_codes WHERE code = $1", PROMO_COLUMNS))
                .bind(normalize_code(code))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        Ok(row.map(PromoCode::from))
    }

    async fn list_promo_codes(&self) -> StoreResult<Vec<PromoCode>> {
        let rows: Vec<PromoRow> = sqlx::query_as(&format!(
            "SELECT {} FROM promo_codes ORDER BY created_at DESC, code",
            PROMO_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(PromoCode::from).collect())
    }
}

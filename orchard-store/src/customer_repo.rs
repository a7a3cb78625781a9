use async_trait::async_trait;
use chrono::{DateTime, Utc};

use orchard_core::activity::{ActivityLogEntry, NewActivity};
use orchard_core::customer::{Customer, CustomerStats, CustomerStatus, NewsletterStage};
use orchard_core::repository::{ActivityRepository, CustomerRepository};
use orchard_core::StoreResult;

use crate::database::{map_sqlx, parse_column, PgStore};

pub(crate) const CUSTOMER_COLUMNS: &str = "id, name, email, country, tree_type, years, promo_code, is_gift, \
     amount_cents, status, newsletter_stage, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct CustomerRow {
    id: i64,
    name: String,
    email: String,
    country: String,
    tree_type: String,
    years: i32,
    promo_code: Option<String>,
    is_gift: bool,
    amount_cents: i64,
    status: String,
    newsletter_stage: String,
    created_at: DateTime<Utc>,
}

impl CustomerRow {
    pub(crate) fn into_customer(self) -> StoreResult<Customer> {
        Ok(Customer {
            id: self.id,
            name: self.name,
            email: self.email,
            country: self.country,
            tree_type: self.tree_type,
            years: self.years,
            promo_code: self.promo_code,
            is_gift: self.is_gift,
            amount_cents: self.amount_cents,
            status: parse_column(&self.status)?,
            newsletter_stage: parse_column(&self.newsletter_stage)?,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: i64,
    customer_id: Option<i64>,
    action: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl From<ActivityRow> for ActivityLogEntry {
    fn from(row: ActivityRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            action: row.action,
            message: row.message,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CustomerRepository for PgStore {
    async fn get_customer(&self, id: i64) -> StoreResult<Option<Customer>> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(CustomerRow::into_customer).transpose()
    }

    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customers ORDER BY created_at DESC, id DESC",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(CustomerRow::into_customer).collect()
    }

    async fn transition_customer(
        &self,
        id: i64,
        from: CustomerStatus,
        to: CustomerStatus,
        stage: Option<NewsletterStage>,
    ) -> StoreResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            r#"
            UPDATE customers
            SET status = $3, newsletter_stage = COALESCE($4, newsletter_stage)
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(stage.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(CustomerRow::into_customer).transpose()
    }

    async fn customer_stats(&self) -> StoreResult<CustomerStats> {
        let (total_customers, paid_customers, newsletter_subscribers): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status IN ('paid', 'email_sent', 'subscribed')),
                COUNT(*) FILTER (WHERE newsletter_stage <> 'none')
            FROM customers
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(CustomerStats {
            total_customers,
            paid_customers,
            newsletter_subscribers,
        })
    }
}

#[async_trait]
impl ActivityRepository for PgStore {
    async fn record_activity(&self, activity: &NewActivity) -> StoreResult<ActivityLogEntry> {
        let row: ActivityRow = sqlx::query_as(
            r#"
            INSERT INTO activity_log (customer_id, action, message)
            VALUES ($1, $2, $3)
            RETURNING id, customer_id, action, message, created_at
            "#,
        )
        .bind(activity.customer_id)
        .bind(&activity.action)
        .bind(&activity.message)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.into())
    }

    async fn list_activity(&self, limit: i64) -> StoreResult<Vec<ActivityLogEntry>> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, action, message, created_at
            FROM activity_log
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(ActivityLogEntry::from).collect())
    }
}

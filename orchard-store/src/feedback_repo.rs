use async_trait::async_trait;
use chrono::{DateTime, Utc};

use orchard_core::content::SiteContent;
use orchard_core::feedback::{Feedback, FeedbackStats, NewFeedback};
use orchard_core::newsletter::{NewNewsletter, Newsletter};
use orchard_core::repository::{ContentRepository, FeedbackRepository, NewsletterRepository};
use orchard_core::StoreResult;

use crate::database::{map_sqlx, parse_column, PgStore};

const FEEDBACK_COLUMNS: &str =
    "id, survey_type, rating, experience, highlight, improvement, would_recommend, email, created_at";

#[derive(sqlx::FromRow)]
struct FeedbackRow {
    id: i64,
    survey_type: String,
    rating: i32,
    experience: String,
    highlight: String,
    improvement: String,
    would_recommend: bool,
    email: String,
    created_at: DateTime<Utc>,
}

impl FeedbackRow {
    fn into_feedback(self) -> StoreResult<Feedback> {
        Ok(Feedback {
            id: self.id,
            survey_type: parse_column(&self.survey_type)?,
            rating: self.rating,
            experience: self.experience,
            highlight: self.highlight,
            improvement: self.improvement,
            would_recommend: self.would_recommend,
            email: self.email,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ContentRow {
    key: String,
    value: String,
    label: String,
    last_updated: Option<DateTime<Utc>>,
}

impl From<ContentRow> for SiteContent {
    fn from(row: ContentRow) -> Self {
        Self {
            key: row.key,
            value: row.value,
            label: row.label,
            last_updated: row.last_updated,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NewsletterRow {
    id: i64,
    subject: String,
    body: String,
    recipients: i64,
    created_at: DateTime<Utc>,
}

impl From<NewsletterRow> for Newsletter {
    fn from(row: NewsletterRow) -> Self {
        Self {
            id: row.id,
            subject: row.subject,
            body: row.body,
            recipients: row.recipients,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl FeedbackRepository for PgStore {
    async fn create_feedback(&self, feedback: &NewFeedback) -> StoreResult<Feedback> {
        let row: FeedbackRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO feedback (survey_type, rating, experience, highlight, improvement, would_recommend, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            FEEDBACK_COLUMNS
        ))
        .bind(feedback.survey_type.as_str())
        .bind(feedback.rating)
        .bind(&feedback.experience)
        .bind(&feedback.highlight)
        .bind(&feedback.improvement)
        .bind(feedback.would_recommend)
        .bind(&feedback.email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.into_feedback()
    }

    async fn list_feedback(&self) -> StoreResult<Vec<Feedback>> {
        let rows: Vec<FeedbackRow> = sqlx::query_as(&format!(
            "SELECT {} FROM feedback ORDER BY created_at DESC, id DESC",
            FEEDBACK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(FeedbackRow::into_feedback).collect()
    }

    async fn feedback_stats(&self) -> StoreResult<FeedbackStats> {
        let (total_farmshop, total_experience, avg_farmshop, avg_experience): (i64, i64, f64, f64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*) FILTER (WHERE survey_type = 'farmshop'),
                    COUNT(*) FILTER (WHERE survey_type = 'experience'),
                    COALESCE(AVG(rating) FILTER (WHERE survey_type = 'farmshop'), 0)::FLOAT8,
                    COALESCE(AVG(rating) FILTER (WHERE survey_type = 'experience'), 0)::FLOAT8
                FROM feedback
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(FeedbackStats {
            total_farmshop,
            total_experience,
            avg_farmshop,
            avg_experience,
        })
    }
}

#[async_trait]
impl ContentRepository for PgStore {
    async fn list_content(&self) -> StoreResult<Vec<SiteContent>> {
        let rows: Vec<ContentRow> =
            sqlx::query_as("SELECT key, value, label, last_updated FROM site_content ORDER BY key")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(SiteContent::from).collect())
    }

    async fn get_content(&self, key: &str) -> StoreResult<Option<SiteContent>> {
        let row: Option<ContentRow> =
            sqlx::query_as("SELECT key, value, label, last_updated FROM site_content WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        Ok(row.map(SiteContent::from))
    }

    async fn upsert_content(&self, key: &str, label: &str, value: &str) -> StoreResult<SiteContent> {
        let row: ContentRow = sqlx::query_as(
            r#"
            INSERT INTO site_content (key, value, label, last_updated)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, last_updated = EXCLUDED.last_updated
            RETURNING key, value, label, last_updated
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(label)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.into())
    }
}

#[async_trait]
impl NewsletterRepository for PgStore {
    async fn create_newsletter(&self, newsletter: &NewNewsletter) -> StoreResult<Newsletter> {
        let row: NewsletterRow = sqlx::query_as(
            r#"
            INSERT INTO newsletters (subject, body, recipients)
            VALUES ($1, $2, $3)
            RETURNING id, subject, body, recipients, created_at
            "#,
        )
        .bind(&newsletter.subject)
        .bind(&newsletter.body)
        .bind(newsletter.recipients)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.into())
    }

    async fn list_newsletters(&self) -> StoreResult<Vec<Newsletter>> {
        let rows: Vec<NewsletterRow> = sqlx::query_as(
            "SELECT id, subject, body, recipients, created_at FROM newsletters ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(Newsletter::from).collect())
    }
}

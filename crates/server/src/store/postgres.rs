use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

use super::{ResponseStore, StoreError, SubscriberStore};
use crate::models::{Category, PendingSignup, QuizResponse, QuizStats, Subscriber};

const SUBSCRIBER_COLUMNS: &str = "id, email, status, confirm_token, categories, consent_at, \
                                  subscribed_at, unsubscribed_at";

/// Same tables as the PostgREST backend, reached directly.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    status: String,
    confirm_token: String,
    categories: Option<Vec<String>>,
    consent_at: DateTime<Utc>,
    subscribed_at: Option<DateTime<Utc>>,
    unsubscribed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = StoreError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let categories = row
            .categories
            .map(|labels| {
                labels
                    .iter()
                    .map(|l| l.parse::<Category>())
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(StoreError::Decode)?;

        Ok(Subscriber {
            id: row.id,
            email: row.email,
            status: row.status.parse().map_err(StoreError::Decode)?,
            confirm_token: row.confirm_token,
            categories,
            consent_at: row.consent_at,
            subscribed_at: row.subscribed_at,
            unsubscribed_at: row.unsubscribed_at,
        })
    }
}

impl PgStore {
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect(database_url)
            .await?;
        Ok(Self { db })
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Subscriber>, StoreError> {
        let sql = format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE {column} = $1 LIMIT 1");
        let row: Option<SubscriberRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        row.map(Subscriber::try_from).transpose()
    }
}

impl SubscriberStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, StoreError> {
        self.find_one("email", email).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Subscriber>, StoreError> {
        self.find_one("confirm_token", token).await
    }

    async fn upsert_pending(&self, signup: &PendingSignup) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO subscribers (id, email, status, confirm_token, consent_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (email)
             DO UPDATE SET status = $3, confirm_token = $4, consent_at = $5,
                           subscribed_at = NULL, unsubscribed_at = NULL",
        )
        .bind(Uuid::new_v4())
        .bind(&signup.email)
        .bind(signup.status.as_str())
        .bind(&signup.confirm_token)
        .bind(signup.consent_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn mark_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE subscribers SET status = 'active', subscribed_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn mark_unsubscribed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE subscribers SET status = 'unsubscribed', unsubscribed_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        let sql = format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE status = 'active'");
        let rows: Vec<SubscriberRow> = sqlx::query_as(&sql).fetch_all(&self.db).await?;
        rows.into_iter().map(Subscriber::try_from).collect()
    }
}

impl ResponseStore for PgStore {
    async fn record_response(&self, response: &QuizResponse) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO quiz_responses (quiz_slug, anonymous_id, selected_index, is_correct, responded_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (quiz_slug, anonymous_id) DO NOTHING",
        )
        .bind(&response.quiz_slug)
        .bind(&response.anonymous_id)
        .bind(response.selected_index)
        .bind(response.is_correct)
        .bind(response.responded_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn quiz_stats(&self, slug: &str) -> Result<QuizStats, StoreError> {
        let selections: Vec<i32> =
            sqlx::query_scalar("SELECT selected_index FROM quiz_responses WHERE quiz_slug = $1")
                .bind(slug)
                .fetch_all(&self.db)
                .await?;
        Ok(QuizStats::from_selections(selections))
    }
}

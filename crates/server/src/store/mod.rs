//! Record store collaborator. Handlers and controllers only see the traits;
//! the concrete backend is picked once from configuration.

mod memory;
mod postgres;
mod rest;

use std::fmt;
use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{AppConfig, StoreConfig};
use crate::models::{PendingSignup, QuizResponse, QuizStats, Subscriber};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use rest::RestStore;

#[derive(Debug)]
pub enum StoreError {
    Http(reqwest::Error),
    Status { status: u16, body: String },
    Database(sqlx::Error),
    Decode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Http(err) => write!(f, "store request failed: {err}"),
            StoreError::Status { status, body } => write!(f, "store returned {status}: {body}"),
            StoreError::Database(err) => write!(f, "database error: {err}"),
            StoreError::Decode(msg) => write!(f, "could not decode store record: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Http(err) => Some(err),
            StoreError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Http(err)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

pub trait SubscriberStore: Send + Sync {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Subscriber>, StoreError>> + Send;

    fn find_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<Subscriber>, StoreError>> + Send;

    /// Insert, or overwrite status/token/consent of the row with this email.
    fn upsert_pending(
        &self,
        signup: &PendingSignup,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn mark_active(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn mark_unsubscribed(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn active_subscribers(&self) -> impl Future<Output = Result<Vec<Subscriber>, StoreError>> + Send;
}

pub trait ResponseStore: Send + Sync {
    /// Duplicate (quiz_slug, anonymous_id) pairs are ignored.
    fn record_response(
        &self,
        response: &QuizResponse,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Recomputed from stored responses on every read.
    fn quiz_stats(&self, slug: &str) -> impl Future<Output = Result<QuizStats, StoreError>> + Send;
}

/// Backend chosen at startup.
#[derive(Clone)]
pub enum Store {
    Rest(RestStore),
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let store = match &config.store {
            StoreConfig::Rest { url, service_key } => {
                tracing::info!(url = %url, "using PostgREST record store");
                Store::Rest(RestStore::new(url, service_key, config.store_timeout)?)
            }
            StoreConfig::Postgres { database_url } => {
                tracing::info!("using Postgres record store");
                Store::Postgres(PgStore::connect(database_url, config.store_timeout).await?)
            }
            StoreConfig::Demo => {
                tracing::warn!("no store configured, running with in-memory demo data");
                Store::Memory(MemoryStore::demo())
            }
        };
        Ok(store)
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Store::Rest(_) => "rest",
            Store::Postgres(_) => "postgres",
            Store::Memory(_) => "memory",
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Store::Rest(s) => s.ping().await,
            Store::Postgres(s) => s.ping().await,
            Store::Memory(_) => Ok(()),
        }
    }
}

impl SubscriberStore for Store {
    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, StoreError> {
        match self {
            Store::Rest(s) => s.find_by_email(email).await,
            Store::Postgres(s) => s.find_by_email(email).await,
            Store::Memory(s) => s.find_by_email(email).await,
        }
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Subscriber>, StoreError> {
        match self {
            Store::Rest(s) => s.find_by_token(token).await,
            Store::Postgres(s) => s.find_by_token(token).await,
            Store::Memory(s) => s.find_by_token(token).await,
        }
    }

    async fn upsert_pending(&self, signup: &PendingSignup) -> Result<(), StoreError> {
        match self {
            Store::Rest(s) => s.upsert_pending(signup).await,
            Store::Postgres(s) => s.upsert_pending(signup).await,
            Store::Memory(s) => s.upsert_pending(signup).await,
        }
    }

    async fn mark_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        match self {
            Store::Rest(s) => s.mark_active(id, at).await,
            Store::Postgres(s) => s.mark_active(id, at).await,
            Store::Memory(s) => s.mark_active(id, at).await,
        }
    }

    async fn mark_unsubscribed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        match self {
            Store::Rest(s) => s.mark_unsubscribed(id, at).await,
            Store::Postgres(s) => s.mark_unsubscribed(id, at).await,
            Store::Memory(s) => s.mark_unsubscribed(id, at).await,
        }
    }

    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        match self {
            Store::Rest(s) => s.active_subscribers().await,
            Store::Postgres(s) => s.active_subscribers().await,
            Store::Memory(s) => s.active_subscribers().await,
        }
    }
}

impl ResponseStore for Store {
    async fn record_response(&self, response: &QuizResponse) -> Result<(), StoreError> {
        match self {
            Store::Rest(s) => s.record_response(response).await,
            Store::Postgres(s) => s.record_response(response).await,
            Store::Memory(s) => s.record_response(response).await,
        }
    }

    async fn quiz_stats(&self, slug: &str) -> Result<QuizStats, StoreError> {
        match self {
            Store::Rest(s) => s.quiz_stats(slug).await,
            Store::Postgres(s) => s.quiz_stats(slug).await,
            Store::Memory(s) => s.quiz_stats(slug).await,
        }
    }
}

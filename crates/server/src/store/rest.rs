use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::{ResponseStore, StoreError, SubscriberStore};
use crate::models::{PendingSignup, QuizResponse, QuizStats, Subscriber, SubscriberStatus};

const SUBSCRIBERS: &str = "subscribers";
const QUIZ_RESPONSES: &str = "quiz_responses";

/// PostgREST over HTTP: filter-by-field GET, POST insert, PATCH by filter.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Deserialize)]
struct SelectedIndex {
    selected_index: i32,
}

impl RestStore {
    pub fn new(url: &str, service_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        })
    }

    fn table(&self, method: reqwest::Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn check(resp: Response) -> Result<Response, StoreError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::error!(status, "PostgREST error: {body}");
        Err(StoreError::Status { status, body })
    }

    async fn select_subscribers(&self, filter: (&str, String)) -> Result<Vec<Subscriber>, StoreError> {
        let resp = self
            .table(reqwest::Method::GET, SUBSCRIBERS)
            .query(&[filter, ("select", "*".to_string())])
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        resp.json::<Vec<Subscriber>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn patch_subscriber(&self, id: Uuid, body: serde_json::Value) -> Result<(), StoreError> {
        let resp = self
            .table(reqwest::Method::PATCH, SUBSCRIBERS)
            .query(&[("id", format!("eq.{id}"))])
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let resp = self
            .table(reqwest::Method::GET, SUBSCRIBERS)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

impl SubscriberStore for RestStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, StoreError> {
        let rows = self.select_subscribers(("email", format!("eq.{email}"))).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Subscriber>, StoreError> {
        let rows = self
            .select_subscribers(("confirm_token", format!("eq.{token}")))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_pending(&self, signup: &PendingSignup) -> Result<(), StoreError> {
        let resp = self
            .table(reqwest::Method::POST, SUBSCRIBERS)
            .query(&[("on_conflict", "email")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&serde_json::json!({
                "email": signup.email,
                "status": signup.status,
                "confirm_token": signup.confirm_token,
                "consent_at": signup.consent_at,
                "subscribed_at": null,
                "unsubscribed_at": null,
            }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn mark_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.patch_subscriber(
            id,
            serde_json::json!({ "status": SubscriberStatus::Active, "subscribed_at": at }),
        )
        .await
    }

    async fn mark_unsubscribed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.patch_subscriber(
            id,
            serde_json::json!({ "status": SubscriberStatus::Unsubscribed, "unsubscribed_at": at }),
        )
        .await
    }

    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        self.select_subscribers(("status", "eq.active".to_string())).await
    }
}

impl ResponseStore for RestStore {
    async fn record_response(&self, response: &QuizResponse) -> Result<(), StoreError> {
        let resp = self
            .table(reqwest::Method::POST, QUIZ_RESPONSES)
            .query(&[("on_conflict", "quiz_slug,anonymous_id")])
            .header("Prefer", "resolution=ignore-duplicates")
            .json(response)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn quiz_stats(&self, slug: &str) -> Result<QuizStats, StoreError> {
        let resp = self
            .table(reqwest::Method::GET, QUIZ_RESPONSES)
            .query(&[
                ("quiz_slug", format!("eq.{slug}")),
                ("select", "selected_index".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<SelectedIndex> = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(QuizStats::from_selections(
            rows.into_iter().map(|r| r.selected_index),
        ))
    }
}

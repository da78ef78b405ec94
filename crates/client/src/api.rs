use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{COOKIE, SET_COOKIE};

use crate::models::{ArchiveFilter, Quiz, QuizResponseRequest, QuizStats, QuizSummary};

const ANON_COOKIE: &str = "anon_id";

/// Where answered quizzes are reported and aggregate stats come from.
pub trait ResultReporter {
    fn report(
        &self,
        slug: &str,
        choice: usize,
        is_correct: bool,
    ) -> impl Future<Output = Result<()>>;

    fn stats(&self, slug: &str) -> impl Future<Output = Result<QuizStats>>;
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    anon_id: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: &str, anon_id: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_id: Mutex::new(anon_id),
        })
    }

    /// The anonymous id the server assigned to this device, once known.
    pub fn anon_id(&self) -> Option<String> {
        self.anon_id.lock().ok().and_then(|id| id.clone())
    }

    fn archive_request(&self, filter: &ArchiveFilter) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/api/quizzes", self.base_url))
            .query(filter)
    }

    pub async fn archive(&self, filter: &ArchiveFilter) -> Result<Vec<QuizSummary>> {
        let response = self.archive_request(filter).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            anyhow::bail!("API error ({}): {}", status, text);
        }

        Ok(response.json().await?)
    }

    pub async fn quiz(&self, slug: &str) -> Result<Quiz> {
        let response = self
            .client
            .get(format!("{}/api/quizzes/{}", self.base_url, slug))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            anyhow::bail!("API error ({}): {}", status, text);
        }

        Ok(response.json().await?)
    }

    fn remember_anon_id(&self, set_cookie: &str) {
        let Some(value) = set_cookie
            .split(';')
            .next()
            .and_then(|pair| pair.trim().strip_prefix(ANON_COOKIE))
            .and_then(|rest| rest.strip_prefix('='))
        else {
            return;
        };
        if let Ok(mut id) = self.anon_id.lock() {
            *id = Some(value.to_string());
        }
    }
}

impl ResultReporter for ApiClient {
    async fn report(&self, slug: &str, choice: usize, is_correct: bool) -> Result<()> {
        let body = QuizResponseRequest {
            quiz_slug: slug,
            selected_index: choice,
            is_correct,
        };

        let mut request = self
            .client
            .post(format!("{}/api/quiz-response", self.base_url))
            .json(&body);
        if let Some(id) = self.anon_id() {
            request = request.header(COOKIE, format!("{ANON_COOKIE}={id}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            anyhow::bail!("Report failed ({}): {}", status, text);
        }

        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(cookie) = value.to_str() {
                self.remember_anon_id(cookie);
            }
        }
        Ok(())
    }

    async fn stats(&self, slug: &str) -> Result<QuizStats> {
        let response = self
            .client
            .get(format!("{}/api/quiz-stats", self.base_url))
            .query(&[("slug", slug)])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Stats unavailable ({})", response.status());
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_id_is_taken_from_set_cookie() {
        let api = ApiClient::new("http://localhost:3000/", None).unwrap();
        assert_eq!(api.base_url, "http://localhost:3000");

        api.remember_anon_id("session=abc; Path=/");
        assert_eq!(api.anon_id(), None);

        api.remember_anon_id("anon_id=7f1c; Path=/; SameSite=Lax");
        assert_eq!(api.anon_id().as_deref(), Some("7f1c"));
    }

    #[test]
    fn archive_filter_becomes_query_params() {
        let api = ApiClient::new("http://localhost:3000", None).unwrap();

        let request = api.archive_request(&ArchiveFilter::default()).build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:3000/api/quizzes");

        let filter = ArchiveFilter {
            category: Some("과학/기술".into()),
            difficulty: Some(3),
            q: Some("블랙홀".into()),
        };
        let request = api.archive_request(&filter).build().unwrap();
        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("category".to_string(), "과학/기술".to_string()),
                ("difficulty".to_string(), "3".to_string()),
                ("q".to_string(), "블랙홀".to_string()),
            ]
        );
    }
}

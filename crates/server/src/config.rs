use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::generation::ContentPolicy;

/// Which record store backs subscribers and quiz responses.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// PostgREST endpoint (Supabase style).
    Rest { url: String, service_key: String },
    Postgres { database_url: String },
    /// Nothing configured: in-memory store with synthesized stats.
    Demo,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub cheap: String,
    pub expensive: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            cheap: "claude-haiku-4-5-20251001".to_string(),
            expensive: "claude-sonnet-4-20250514".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub models: ModelSettings,
    pub timeout: Duration,
    pub policy: ContentPolicy,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
}

/// Built once per binary and handed to every constructor.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub site_url: String,
    pub store: StoreConfig,
    pub store_timeout: Duration,
    pub mail: MailConfig,
    pub generation: GenerationConfig,
    pub content_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let store = match (
            non_empty("SUPABASE_URL"),
            non_empty("SUPABASE_SERVICE_KEY"),
            non_empty("DATABASE_URL"),
        ) {
            (Some(url), Some(service_key), _) => StoreConfig::Rest { url, service_key },
            (_, _, Some(database_url)) => StoreConfig::Postgres { database_url },
            _ => StoreConfig::Demo,
        };

        let policy = match non_empty("CONTENT_POLICY_PATH") {
            Some(path) => ContentPolicy::load(&path)
                .with_context(|| format!("Failed to load content policy from {path}"))?,
            None => ContentPolicy::default(),
        };

        let defaults = ModelSettings::default();

        Ok(Self {
            bind_address: non_empty("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            site_url: non_empty("SITE_URL")
                .unwrap_or_else(|| "https://brain-snack.vercel.app".to_string())
                .trim_end_matches('/')
                .to_string(),
            store,
            store_timeout: secs("STORE_TIMEOUT_SECS", 5)?,
            mail: MailConfig {
                resend_api_key: non_empty("RESEND_API_KEY"),
                from: non_empty("MAIL_FROM")
                    .unwrap_or_else(|| "뇌간식 <noreply@brainsnack.kr>".to_string()),
            },
            generation: GenerationConfig {
                api_key: non_empty("ANTHROPIC_API_KEY"),
                base_url: non_empty("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|| "https://api.anthropic.com".to_string()),
                models: ModelSettings {
                    cheap: non_empty("CHEAP_MODEL").unwrap_or(defaults.cheap),
                    expensive: non_empty("EXPENSIVE_MODEL").unwrap_or(defaults.expensive),
                },
                timeout: secs("GENERATION_TIMEOUT_SECS", 10)?,
                policy,
            },
            content_dir: non_empty("CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("content/quizzes")),
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    dotenv::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn secs(key: &str, default: u64) -> Result<Duration> {
    match non_empty(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .with_context(|| format!("{key} must be a number of seconds")),
        None => Ok(Duration::from_secs(default)),
    }
}

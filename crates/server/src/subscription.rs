use std::fmt;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::mailer::{BestEffort, Email, Mailer};
use crate::models::{PendingSignup, Subscriber, SubscriberStatus};
use crate::store::{StoreError, SubscriberStore};
use crate::templates::{self, EmailTemplate};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug)]
pub enum SubscriptionError {
    InvalidEmail,
    AlreadySubscribed,
    InvalidToken,
    Store(StoreError),
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::InvalidEmail => f.write_str("invalid email address"),
            SubscriptionError::AlreadySubscribed => f.write_str("email is already subscribed"),
            SubscriptionError::InvalidToken => f.write_str("invalid or expired token"),
            SubscriptionError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SubscriptionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubscriptionError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SubscriptionError {
    fn from(err: StoreError) -> Self {
        SubscriptionError::Store(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Activated,
    AlreadyConfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsubscribe {
    Unsubscribed,
    AlreadyUnsubscribed,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Moves subscribers through pending → active → unsubscribed.
///
/// Store failures propagate; outbound mail is best-effort.
pub struct SubscriptionController<S, M> {
    store: S,
    mailer: BestEffort<M>,
    site_url: String,
}

impl<S: SubscriberStore, M: Mailer> SubscriptionController<S, M> {
    pub fn new(store: S, mailer: M, site_url: impl Into<String>) -> Self {
        Self {
            store,
            mailer: BestEffort(mailer),
            site_url: site_url.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn mailer(&self) -> &M {
        self.mailer.inner()
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Returns the new confirm token.
    pub async fn subscribe(&self, email: &str) -> Result<String, SubscriptionError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(SubscriptionError::InvalidEmail);
        }

        let existing = self.store.find_by_email(email).await?;
        if existing.is_some_and(|s| s.status == SubscriberStatus::Active) {
            return Err(SubscriptionError::AlreadySubscribed);
        }

        let token = Uuid::new_v4().to_string();
        let signup = PendingSignup {
            email: email.to_string(),
            status: SubscriberStatus::Pending,
            confirm_token: token.clone(),
            consent_at: Utc::now(),
        };
        self.store.upsert_pending(&signup).await?;
        info!(email, "subscriber pending confirmation");

        let mail = templates::confirmation_email(&self.site_url, &token);
        self.deliver(email, mail).await;

        Ok(token)
    }

    pub async fn confirm(&self, token: &str) -> Result<Confirmation, SubscriptionError> {
        let subscriber = self.lookup(token).await?;

        match subscriber.status {
            SubscriberStatus::Pending => {
                self.store.mark_active(subscriber.id, Utc::now()).await?;
                info!(email = %subscriber.email, "subscription confirmed");
                let mail = templates::welcome_email(&self.site_url);
                self.deliver(&subscriber.email, mail).await;
                Ok(Confirmation::Activated)
            }
            SubscriberStatus::Active | SubscriberStatus::Paused => {
                Ok(Confirmation::AlreadyConfirmed)
            }
            // An old confirm link must not revive an unsubscribed address.
            SubscriberStatus::Unsubscribed => {
                warn!(email = %subscriber.email, "confirm link used after unsubscribe");
                Err(SubscriptionError::InvalidToken)
            }
        }
    }

    pub async fn unsubscribe(&self, token: &str) -> Result<Unsubscribe, SubscriptionError> {
        let subscriber = self.lookup(token).await?;

        if subscriber.status == SubscriberStatus::Unsubscribed {
            return Ok(Unsubscribe::AlreadyUnsubscribed);
        }

        self.store.mark_unsubscribed(subscriber.id, Utc::now()).await?;
        info!(email = %subscriber.email, "unsubscribed");
        Ok(Unsubscribe::Unsubscribed)
    }

    /// Follow-up message for `day` days after confirmation, if one exists.
    pub fn welcome_sequence(&self, day: u32) -> Option<EmailTemplate> {
        templates::welcome_sequence(day, &self.site_url)
    }

    /// Best-effort send of a rendered template.
    pub async fn deliver(&self, to: &str, template: EmailTemplate) -> bool {
        let email = Email {
            to: to.to_string(),
            subject: template.subject,
            html: template.html,
        };
        self.mailer.send(&email).await
    }

    async fn lookup(&self, token: &str) -> Result<Subscriber, SubscriptionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SubscriptionError::InvalidToken);
        }
        self.store
            .find_by_token(token)
            .await?
            .ok_or(SubscriptionError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_email;

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@mail.example.kr"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email(""));
    }
}

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use uuid::Uuid;

use super::{ResponseStore, StoreError, SubscriberStore};
use crate::models::{
    PendingSignup, QuizResponse, QuizStats, Subscriber, SubscriberStatus,
};

#[derive(Default)]
struct Tables {
    subscribers: Vec<Subscriber>,
    responses: Vec<QuizResponse>,
    writes: usize,
}

/// In-process store for tests and for running without a backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    demo: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`MemoryStore::new`], but a quiz nobody answered yet reports
    /// plausible synthetic stats instead of zeros.
    pub fn demo() -> Self {
        Self {
            demo: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means a test panicked mid-write.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribers(&self) -> Vec<Subscriber> {
        self.lock().subscribers.clone()
    }

    pub fn responses(&self) -> Vec<QuizResponse> {
        self.lock().responses.clone()
    }

    /// Number of mutating calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn insert_subscriber(&self, subscriber: Subscriber) {
        self.lock().subscribers.push(subscriber);
    }

    fn update(&self, id: Uuid, apply: impl FnOnce(&mut Subscriber)) {
        let mut tables = self.lock();
        tables.writes += 1;
        if let Some(subscriber) = tables.subscribers.iter_mut().find(|s| s.id == id) {
            apply(subscriber);
        }
    }
}

fn synthetic_stats(slug: &str) -> QuizStats {
    let mut hasher = DefaultHasher::new();
    slug.hash(&mut hasher);
    let seed = hasher.finish();
    let mut rng = StdRng::seed_from_u64(seed);

    let total: u64 = rng.gen_range(100..600);
    let leading = (seed % 4) as usize;
    let leading_rate: f64 = rng.gen_range(0.3..0.7);

    let mut distribution = [0u64; 4];
    distribution[leading] = (total as f64 * leading_rate).round() as u64;
    let remaining = total - distribution[leading];
    let others: Vec<usize> = (0..4).filter(|&i| i != leading).collect();
    distribution[others[0]] = (remaining as f64 * 0.35).round() as u64;
    distribution[others[1]] = (remaining as f64 * 0.35).round() as u64;
    distribution[others[2]] = remaining - distribution[others[0]] - distribution[others[1]];

    QuizStats {
        total,
        distribution,
    }
}

impl SubscriberStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>, StoreError> {
        Ok(self
            .lock()
            .subscribers
            .iter()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Subscriber>, StoreError> {
        Ok(self
            .lock()
            .subscribers
            .iter()
            .find(|s| s.confirm_token == token)
            .cloned())
    }

    async fn upsert_pending(&self, signup: &PendingSignup) -> Result<(), StoreError> {
        let mut tables = self.lock();
        tables.writes += 1;
        match tables.subscribers.iter_mut().find(|s| s.email == signup.email) {
            Some(existing) => {
                existing.status = signup.status;
                existing.confirm_token = signup.confirm_token.clone();
                existing.consent_at = signup.consent_at;
                existing.subscribed_at = None;
                existing.unsubscribed_at = None;
            }
            None => tables.subscribers.push(Subscriber {
                id: Uuid::new_v4(),
                email: signup.email.clone(),
                status: signup.status,
                confirm_token: signup.confirm_token.clone(),
                categories: None,
                consent_at: signup.consent_at,
                subscribed_at: None,
                unsubscribed_at: None,
            }),
        }
        Ok(())
    }

    async fn mark_active(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(id, |s| {
            s.status = SubscriberStatus::Active;
            s.subscribed_at = Some(at);
        });
        Ok(())
    }

    async fn mark_unsubscribed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(id, |s| {
            s.status = SubscriberStatus::Unsubscribed;
            s.unsubscribed_at = Some(at);
        });
        Ok(())
    }

    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        Ok(self
            .lock()
            .subscribers
            .iter()
            .filter(|s| s.status == SubscriberStatus::Active)
            .cloned()
            .collect())
    }
}

impl ResponseStore for MemoryStore {
    async fn record_response(&self, response: &QuizResponse) -> Result<(), StoreError> {
        let mut tables = self.lock();
        tables.writes += 1;
        let duplicate = tables.responses.iter().any(|r| {
            r.quiz_slug == response.quiz_slug && r.anonymous_id == response.anonymous_id
        });
        if !duplicate {
            tables.responses.push(response.clone());
        }
        Ok(())
    }

    async fn quiz_stats(&self, slug: &str) -> Result<QuizStats, StoreError> {
        let stats = QuizStats::from_selections(
            self.lock()
                .responses
                .iter()
                .filter(|r| r.quiz_slug == slug)
                .map(|r| r.selected_index),
        );
        if self.demo && stats.total == 0 {
            return Ok(synthetic_stats(slug));
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(slug: &str, anon: &str, index: i32) -> QuizResponse {
        QuizResponse {
            quiz_slug: slug.into(),
            anonymous_id: anon.into(),
            selected_index: index,
            is_correct: index == 1,
            responded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn one_response_per_player_and_quiz() {
        let store = MemoryStore::new();
        store.record_response(&response("q1", "anon-1", 1)).await.unwrap();
        store.record_response(&response("q1", "anon-1", 3)).await.unwrap();
        store.record_response(&response("q1", "anon-2", 3)).await.unwrap();
        store.record_response(&response("q2", "anon-1", 0)).await.unwrap();

        let stats = store.quiz_stats("q1").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.distribution, [0, 1, 0, 1]);
    }

    #[tokio::test]
    async fn demo_stats_are_stable_and_consistent() {
        let store = MemoryStore::demo();
        let first = store.quiz_stats("2026-10-16-01").await.unwrap();
        let second = store.quiz_stats("2026-10-16-01").await.unwrap();
        assert_eq!(first, second);
        assert!(first.total >= 100);
        assert_eq!(first.total, first.distribution.iter().sum::<u64>());

        // Real answers replace the synthetic numbers.
        store.record_response(&response("2026-10-16-01", "a", 2)).await.unwrap();
        let real = store.quiz_stats("2026-10-16-01").await.unwrap();
        assert_eq!(real.total, 1);
        assert_eq!(real.distribution, [0, 0, 1, 0]);
    }
}

//! The per-quiz answer state machine.
//!
//! `Unsolved → Solving → Correct | Wrong`. The terminal states are sticky:
//! once a result is stored for this device, the quiz cannot be re-scored.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::ResultReporter;
use crate::models::{AnswerResult, CHOICE_COUNT, Quiz, QuizResult, QuizState, QuizStats};
use crate::storage::KeyValueStore;

pub fn storage_key(slug: &str) -> String {
    format!("quiz_{slug}")
}

/// Stored result for `slug`, if one exists and still makes sense.
pub fn stored_result(storage: &impl KeyValueStore, slug: &str) -> Option<QuizResult> {
    let raw = storage.get(&storage_key(slug))?;
    match serde_json::from_str::<QuizResult>(&raw) {
        Ok(result) if result.choice < CHOICE_COUNT => Some(result),
        Ok(result) => {
            warn!(slug, choice = result.choice, "ignoring stored result with invalid choice");
            None
        }
        Err(err) => {
            warn!(slug, "ignoring unreadable stored result: {err}");
            None
        }
    }
}

pub struct QuizSession<'a, S> {
    quiz: Quiz,
    storage: &'a mut S,
    state: QuizState,
    selected: Option<usize>,
    stats: Option<QuizStats>,
}

impl<'a, S: KeyValueStore> QuizSession<'a, S> {
    /// Starts in the stored terminal state when this device already answered.
    pub fn restore(quiz: Quiz, storage: &'a mut S) -> Self {
        let (state, selected) = match stored_result(&*storage, &quiz.slug) {
            Some(result) => {
                debug!(slug = %quiz.slug, ?result, "restored answered quiz");
                (QuizState::from(result.result), Some(result.choice))
            }
            None => (QuizState::Unsolved, None),
        };
        Self {
            quiz,
            storage,
            state,
            selected,
            stats: None,
        }
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn stats(&self) -> Option<&QuizStats> {
        self.stats.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Returns `false` when the choice was ignored.
    pub fn select_choice(&mut self, index: usize) -> bool {
        if self.is_finished() || index >= CHOICE_COUNT {
            return false;
        }
        self.selected = Some(index);
        self.state = QuizState::Solving;
        true
    }

    /// Scores the tentative choice. `None` if there was nothing to submit.
    pub fn submit(&mut self) -> Option<QuizResult> {
        if self.is_finished() {
            return None;
        }
        let choice = self.selected?;

        let result = if choice == self.quiz.correct_index {
            AnswerResult::Correct
        } else {
            AnswerResult::Wrong
        };
        self.state = result.into();

        let record = QuizResult {
            choice,
            result,
            timestamp: Utc::now().timestamp_millis(),
        };
        info!(slug = %self.quiz.slug, choice, ?result, "quiz answered");

        match serde_json::to_string(&record) {
            Ok(json) => {
                if let Err(err) = self.storage.set(&storage_key(&self.quiz.slug), json) {
                    warn!(slug = %self.quiz.slug, "could not persist result: {err:#}");
                }
            }
            Err(err) => warn!(slug = %self.quiz.slug, "could not encode result: {err}"),
        }

        Some(record)
    }

    /// Reports the answer, then fetches fresh stats. Best-effort: failures
    /// only leave `stats` empty.
    pub async fn sync_stats<R: ResultReporter>(&mut self, reporter: &R) {
        let (Some(choice), true) = (self.selected, self.is_finished()) else {
            return;
        };
        let is_correct = self.state == QuizState::Correct;
        if let Err(err) = reporter.report(&self.quiz.slug, choice, is_correct).await {
            warn!(slug = %self.quiz.slug, "result not reported: {err:#}");
        }
        self.refresh_stats(reporter).await;
    }

    pub async fn refresh_stats<R: ResultReporter>(&mut self, reporter: &R) {
        match reporter.stats(&self.quiz.slug).await {
            Ok(stats) => self.stats = Some(stats),
            Err(err) => {
                warn!(slug = %self.quiz.slug, "stats unavailable: {err:#}");
                self.stats = None;
            }
        }
    }

    /// Share of players who picked `index`, rounded. `None` when unknown or zero.
    pub fn percent(&self, index: usize) -> Option<u32> {
        let stats = self.stats.as_ref()?;
        let count = *stats.distribution.get(index)?;
        if count == 0 || stats.total == 0 {
            return None;
        }
        Some((count as f64 / stats.total as f64 * 100.0).round() as u32)
    }

    pub fn correct_rate(&self) -> Option<u32> {
        self.percent(self.quiz.correct_index)
    }

    pub fn share_text(&self, site_url: &str) -> String {
        let line = if self.state == QuizState::Correct {
            "✅ 맞혔습니다!"
        } else {
            "도전해보세요!"
        };
        format!(
            "🧠 뇌간식 — \"{}\"\n{}\n{}/quiz/{}",
            self.quiz.title,
            line,
            site_url.trim_end_matches('/'),
            self.quiz.slug
        )
    }
}

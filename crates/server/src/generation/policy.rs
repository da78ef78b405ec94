use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::GeneratedQuiz;
use crate::models::{ANSWER_LETTERS, CHOICE_COUNT, EXPLANATION_CHARS, SUMMARY_MARKERS};

/// Editorial rules every generated explanation must satisfy.
///
/// The phrase lists are product decisions, so they live in data: the defaults
/// below can be replaced wholesale by a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPolicy {
    pub min_explanation_chars: usize,
    pub max_explanation_chars: usize,
    /// Any one of these must appear in the explanation.
    pub summary_markers: Vec<String>,
    pub banned_phrases: Vec<String>,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            min_explanation_chars: *EXPLANATION_CHARS.start(),
            max_explanation_chars: *EXPLANATION_CHARS.end(),
            summary_markers: SUMMARY_MARKERS.iter().map(|m| m.to_string()).collect(),
            banned_phrases: vec![
                "살펴보겠습니다".to_string(),
                "알아봅시다".to_string(),
                "알아보겠습니다".to_string(),
            ],
        }
    }
}

impl ContentPolicy {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        serde_json::from_str(&raw).context("parsing content policy")
    }

    /// Returns the first violated rule.
    pub fn check(&self, quiz: &GeneratedQuiz) -> Result<(), String> {
        if quiz.title.trim().is_empty()
            || quiz.question.trim().is_empty()
            || quiz.explanation.trim().is_empty()
        {
            return Err("missing required fields (title, question, explanation)".to_string());
        }

        if quiz.choices.len() != CHOICE_COUNT {
            return Err(format!(
                "must have exactly {CHOICE_COUNT} choices, got {}",
                quiz.choices.len()
            ));
        }

        if quiz.answer_index().is_none() {
            return Err(format!(
                "correct_answer must be one of {:?}, got {:?}",
                ANSWER_LETTERS, quiz.correct_answer
            ));
        }

        let chars = quiz.explanation.chars().count();
        if chars < self.min_explanation_chars || chars > self.max_explanation_chars {
            return Err(format!(
                "explanation length {chars} outside {}..={}",
                self.min_explanation_chars, self.max_explanation_chars
            ));
        }

        if !self
            .summary_markers
            .iter()
            .any(|marker| quiz.explanation.contains(marker.as_str()))
        {
            return Err("explanation is missing the one-line summary block".to_string());
        }

        if let Some(phrase) = self
            .banned_phrases
            .iter()
            .find(|phrase| quiz.explanation.contains(phrase.as_str()))
        {
            return Err(format!("banned expression found: {phrase}"));
        }

        Ok(())
    }
}

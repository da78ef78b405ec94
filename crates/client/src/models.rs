use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

pub const CHOICE_COUNT: usize = 4;
pub const ANSWER_LETTERS: [char; CHOICE_COUNT] = ['A', 'B', 'C', 'D'];
pub const CATEGORIES: [&str; 10] = [
    "경제/경영",
    "한국사",
    "과학/기술",
    "법/사회",
    "심리/교육",
    "IT/디지털",
    "지리/환경",
    "건강/의학",
    "문학/예술",
    "스페셜",
];

// ===== API payloads =====

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizMetadata {
    pub concept: Option<String>,
    pub one_liner: Option<String>,
    pub plus_one: Option<String>,
    pub share_hook: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub slug: String,
    pub title: String,
    pub question: String,
    pub choices: [String; CHOICE_COUNT],
    #[serde(deserialize_with = "choice_index")]
    pub correct_index: usize,
    pub explanation: String,
    pub category: String,
    pub difficulty: u8,
    pub published_at: NaiveDate,
    #[serde(default)]
    pub metadata: Option<QuizMetadata>,
}

impl Quiz {
    pub fn answer_letter(&self) -> Option<char> {
        ANSWER_LETTERS.get(self.correct_index).copied()
    }
}

fn choice_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let index = usize::deserialize(deserializer)?;
    if index >= CHOICE_COUNT {
        return Err(serde::de::Error::custom(format!(
            "correctIndex must be below {CHOICE_COUNT}, got {index}"
        )));
    }
    Ok(index)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub slug: String,
    pub title: String,
    pub category: String,
    pub difficulty: u8,
    pub published_at: NaiveDate,
    #[serde(default)]
    pub hook: Option<String>,
}

/// Archive query parameters. Unset fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

impl ArchiveFilter {
    /// Builds a filter from the player's answers: a 1-based category number,
    /// a difficulty of 1 to 3 and free search text. Blank or out-of-range
    /// answers leave that filter unset.
    pub fn from_answers(category: &str, difficulty: &str, search: &str) -> Self {
        let category = category
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| CATEGORIES.get(i))
            .map(|c| c.to_string());
        let difficulty = difficulty
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|d| (1..=3).contains(d));
        let q = Some(search.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        Self {
            category,
            difficulty,
            q,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.difficulty.is_none() && self.q.is_none()
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(category) = &self.category {
            parts.push(category.clone());
        }
        if let Some(difficulty) = self.difficulty {
            parts.push(stars(difficulty));
        }
        if let Some(q) = &self.q {
            parts.push(format!("\"{q}\""));
        }
        parts.join(" · ")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct QuizStats {
    pub total: u64,
    pub distribution: [u64; CHOICE_COUNT],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponseRequest<'a> {
    pub quiz_slug: &'a str,
    pub selected_index: usize,
    pub is_correct: bool,
}

// ===== Local state =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizState {
    Unsolved,
    Solving,
    Correct,
    Wrong,
}

impl QuizState {
    pub fn is_finished(self) -> bool {
        matches!(self, QuizState::Correct | QuizState::Wrong)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerResult {
    Correct,
    Wrong,
}

impl From<AnswerResult> for QuizState {
    fn from(result: AnswerResult) -> Self {
        match result {
            AnswerResult::Correct => QuizState::Correct,
            AnswerResult::Wrong => QuizState::Wrong,
        }
    }
}

/// What this device remembers about an answered quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub choice: usize,
    pub result: AnswerResult,
    /// Unix milliseconds.
    pub timestamp: i64,
}

pub fn stars(difficulty: u8) -> String {
    let filled = usize::from(difficulty.min(3));
    format!("{}{}", "★".repeat(filled), "☆".repeat(3 - filled))
}

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CHOICE_COUNT: usize = 4;
pub const ANSWER_LETTERS: [char; CHOICE_COUNT] = ['A', 'B', 'C', 'D'];
/// Allowed explanation length, in characters.
pub const EXPLANATION_CHARS: RangeInclusive<usize> = 100..=2000;
/// Either spelling opens the one-line summary block of an explanation.
pub const SUMMARY_MARKERS: [&str; 2] = ["한 줄 정리", "한줄정리"];

// ===== Quiz =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "경제/경영")]
    Economy,
    #[serde(rename = "한국사")]
    KoreanHistory,
    #[serde(rename = "과학/기술")]
    Science,
    #[serde(rename = "법/사회")]
    LawSociety,
    #[serde(rename = "심리/교육")]
    Psychology,
    #[serde(rename = "IT/디지털")]
    Digital,
    #[serde(rename = "지리/환경")]
    Geography,
    #[serde(rename = "건강/의학")]
    Health,
    #[serde(rename = "문학/예술")]
    Arts,
    #[serde(rename = "스페셜")]
    Special,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Economy,
        Category::KoreanHistory,
        Category::Science,
        Category::LawSociety,
        Category::Psychology,
        Category::Digital,
        Category::Geography,
        Category::Health,
        Category::Arts,
        Category::Special,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Economy => "경제/경영",
            Category::KoreanHistory => "한국사",
            Category::Science => "과학/기술",
            Category::LawSociety => "법/사회",
            Category::Psychology => "심리/교육",
            Category::Digital => "IT/디지털",
            Category::Geography => "지리/환경",
            Category::Health => "건강/의학",
            Category::Arts => "문학/예술",
            Category::Special => "스페셜",
        }
    }

    /// Badge colour used by the newsletter templates.
    pub fn color(self) -> &'static str {
        match self {
            Category::Economy => "#6C5CE7",
            Category::KoreanHistory => "#E17055",
            Category::Science => "#00B894",
            Category::LawSociety => "#0984E3",
            Category::Psychology => "#E84393",
            Category::Digital => "#00D2D3",
            Category::Geography => "#55A3A4",
            Category::Health => "#FF6B6B",
            Category::Arts => "#FECA57",
            Category::Special => "#A29BFE",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Difficulty {
    Easy = 1,
    Normal = 2,
    Hard = 3,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "쉬움",
            Difficulty::Normal => "보통",
            Difficulty::Hard => "어려움",
        }
    }

    /// `★★☆` style rating.
    pub fn stars(self) -> String {
        let filled = self as usize;
        format!("{}{}", "★".repeat(filled), "☆".repeat(3 - filled))
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Difficulty::Easy),
            2 => Ok(Difficulty::Normal),
            3 => Ok(Difficulty::Hard),
            other => Err(format!("difficulty must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_liner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus_one: Option<String>,
    /// 1..=100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viral_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_hook: Option<String>,
}

/// A published quiz. Written once to the content directory and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub slug: String,
    pub title: String,
    pub question: String,
    pub choices: [String; CHOICE_COUNT],
    pub correct_index: usize,
    pub explanation: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub published_at: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<QuizMetadata>,
}

impl Quiz {
    pub fn answer_letter(&self) -> Option<char> {
        ANSWER_LETTERS.get(self.correct_index).copied()
    }

    /// Checks the invariants every published quiz holds. Returns the first
    /// violated one.
    pub fn validate(&self) -> Result<(), String> {
        if self.slug.trim().is_empty()
            || self.title.trim().is_empty()
            || self.question.trim().is_empty()
        {
            return Err("missing required fields (slug, title, question)".to_string());
        }
        if self.correct_index >= CHOICE_COUNT {
            return Err(format!(
                "correctIndex must be below {CHOICE_COUNT}, got {}",
                self.correct_index
            ));
        }
        let chars = self.explanation.chars().count();
        if !EXPLANATION_CHARS.contains(&chars) {
            return Err(format!(
                "explanation length {chars} outside {}..={}",
                EXPLANATION_CHARS.start(),
                EXPLANATION_CHARS.end()
            ));
        }
        if !SUMMARY_MARKERS.iter().any(|m| self.explanation.contains(m)) {
            return Err("explanation is missing the one-line summary block".to_string());
        }
        Ok(())
    }

    pub fn concept(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.concept.as_deref())
    }
}

/// Archive card: everything but the answer and explanation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub slug: String,
    pub title: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub published_at: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        Self {
            slug: quiz.slug.clone(),
            title: quiz.title.clone(),
            category: quiz.category,
            difficulty: quiz.difficulty,
            published_at: quiz.published_at,
            hook: quiz.metadata.as_ref().and_then(|m| m.hook.clone()),
        }
    }
}

// ===== Generation =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub concept: String,
    pub category: Category,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub season_context: Option<String>,
    #[serde(default)]
    pub avoid_topics: BTreeSet<String>,
}

// ===== Responses & stats =====

/// One stored answer, keyed by (quiz_slug, anonymous_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResponse {
    pub quiz_slug: String,
    pub anonymous_id: String,
    pub selected_index: i32,
    pub is_correct: bool,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizStats {
    pub total: u64,
    pub distribution: [u64; CHOICE_COUNT],
}

impl QuizStats {
    /// Counts in-range selections; anything outside 0..4 is dropped so that
    /// `total` always equals the sum of the distribution.
    pub fn from_selections(selections: impl IntoIterator<Item = i32>) -> Self {
        let mut distribution = [0u64; CHOICE_COUNT];
        for index in selections {
            if let Some(slot) = usize::try_from(index)
                .ok()
                .and_then(|i| distribution.get_mut(i))
            {
                *slot += 1;
            }
        }
        Self {
            total: distribution.iter().sum(),
            distribution,
        }
    }
}

// ===== Subscribers =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    Pending,
    Active,
    Paused,
    Unsubscribed,
}

impl SubscriberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriberStatus::Pending => "pending",
            SubscriberStatus::Active => "active",
            SubscriberStatus::Paused => "paused",
            SubscriberStatus::Unsubscribed => "unsubscribed",
        }
    }
}

impl FromStr for SubscriberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubscriberStatus::Pending),
            "active" => Ok(SubscriberStatus::Active),
            "paused" => Ok(SubscriberStatus::Paused),
            "unsubscribed" => Ok(SubscriberStatus::Unsubscribed),
            other => Err(format!("unknown subscriber status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub status: SubscriberStatus,
    pub confirm_token: String,
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
    pub consent_at: DateTime<Utc>,
    #[serde(default)]
    pub subscribed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl Subscriber {
    /// No category preference means every quiz.
    pub fn wants(&self, category: Category) -> bool {
        match &self.categories {
            Some(categories) if !categories.is_empty() => categories.contains(&category),
            _ => true,
        }
    }
}

/// Fields written when an address (re)enters the pending state.
#[derive(Debug, Clone, Serialize)]
pub struct PendingSignup {
    pub email: String,
    pub status: SubscriberStatus,
    pub confirm_token: String,
    pub consent_at: DateTime<Utc>,
}

// ===== HTTP payloads =====

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponseRequest {
    pub quiz_slug: Option<String>,
    pub selected_index: Option<i32>,
    pub is_correct: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TokenParams {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub slug: Option<String>,
}

//! Quiz generation: prompt construction, provider call, strict parsing and
//! policy validation. Escalation across model tiers lives in [`escalation`].

pub mod escalation;
pub mod policy;
pub mod prompts;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ModelSettings;
use crate::llm::{ProviderError, TextGenerator};
use crate::models::{
    ANSWER_LETTERS, Category, Difficulty, GenerationRequest, Quiz, QuizMetadata,
};

pub use escalation::AcceptedQuiz;
pub use policy::ContentPolicy;

const GENERATION_MAX_TOKENS: u32 = 2000;
const CROSS_CHECK_MAX_TOKENS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Cheap,
    Expensive,
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTier::Cheap => f.write_str("cheap"),
            ModelTier::Expensive => f.write_str("expensive"),
        }
    }
}

#[derive(Debug)]
pub enum GenerationError {
    /// Provider text did not parse as the quiz schema.
    MalformedOutput(String),
    ValidationFailed(String),
    /// The expensive tier's quiz still disagreed with an independent answer.
    CrossValidationFailed,
    Provider(ProviderError),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::MalformedOutput(err) => write!(f, "malformed model output: {err}"),
            GenerationError::ValidationFailed(reason) => write!(f, "validation failed: {reason}"),
            GenerationError::CrossValidationFailed => {
                f.write_str("cross validation failed even with the expensive tier")
            }
            GenerationError::Provider(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Provider(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProviderError> for GenerationError {
    fn from(err: ProviderError) -> Self {
        GenerationError::Provider(err)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMetadata {
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub one_liner: Option<String>,
    #[serde(default)]
    pub plus_one: Option<String>,
    #[serde(default)]
    pub viral_score: Option<i64>,
    #[serde(default)]
    pub share_hook: Option<String>,
}

/// The provider's output schema, before it becomes a published [`Quiz`].
///
/// Required fields default to empty so that a missing field is reported by
/// the policy check rather than as a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub metadata: Option<GeneratedMetadata>,
}

impl GeneratedQuiz {
    pub fn answer_index(&self) -> Option<usize> {
        let mut chars = self.correct_answer.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => ANSWER_LETTERS.iter().position(|&l| l == letter),
            _ => None,
        }
    }

    /// Only valid for a candidate that passed [`ContentPolicy::check`].
    pub fn into_quiz(
        self,
        slug: String,
        category: Category,
        difficulty: Difficulty,
        published_at: NaiveDate,
    ) -> Result<Quiz, GenerationError> {
        let correct_index = self.answer_index().ok_or_else(|| {
            GenerationError::ValidationFailed(format!(
                "correct_answer {:?} is not a letter A-D",
                self.correct_answer
            ))
        })?;
        let choices: [String; 4] = self.choices.try_into().map_err(|c: Vec<String>| {
            GenerationError::ValidationFailed(format!("expected 4 choices, got {}", c.len()))
        })?;

        let metadata = self.metadata.map(|m| QuizMetadata {
            concept: m.concept,
            hook: m.hook,
            one_liner: m.one_liner,
            plus_one: m.plus_one,
            viral_score: m.viral_score.map(|s| s.clamp(1, 100) as u8),
            share_hook: m.share_hook,
        });

        Ok(Quiz {
            slug,
            title: self.title,
            question: self.question,
            choices,
            correct_index,
            explanation: self.explanation,
            category,
            difficulty,
            published_at,
            metadata,
        })
    }
}

/// Builds prompts, calls the provider and validates what comes back.
pub struct QuizGenerator<G> {
    provider: G,
    models: ModelSettings,
    policy: ContentPolicy,
}

impl<G: TextGenerator> QuizGenerator<G> {
    pub fn new(provider: G, models: ModelSettings, policy: ContentPolicy) -> Self {
        Self {
            provider,
            models,
            policy,
        }
    }

    fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Cheap => &self.models.cheap,
            ModelTier::Expensive => &self.models.expensive,
        }
    }

    /// One provider call; any schema or policy violation aborts the attempt.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        tier: ModelTier,
    ) -> Result<GeneratedQuiz, GenerationError> {
        let model = self.model(tier);
        info!(concept = %request.concept, %tier, model, "generating quiz");

        let prompt = prompts::generation_prompt(request);
        let text = self
            .provider
            .complete(&prompt, model, GENERATION_MAX_TOKENS)
            .await?;

        let quiz: GeneratedQuiz = serde_json::from_str(text.trim())
            .map_err(|e| GenerationError::MalformedOutput(e.to_string()))?;

        if let Err(reason) = self.policy.check(&quiz) {
            warn!(concept = %request.concept, %tier, %reason, "generated quiz rejected");
            return Err(GenerationError::ValidationFailed(reason));
        }

        Ok(quiz)
    }

    /// Asks the cheap model to answer the question blind and compares letters.
    pub async fn cross_validate(&self, quiz: &GeneratedQuiz) -> Result<bool, GenerationError> {
        let prompt = prompts::cross_validation_prompt(quiz);
        let reply = self
            .provider
            .complete(&prompt, &self.models.cheap, CROSS_CHECK_MAX_TOKENS)
            .await?;

        let answer = reply.trim().chars().next();
        let matches = answer.is_some_and(|a| a.to_string() == quiz.correct_answer);
        debug!(?answer, declared = %quiz.correct_answer, matches, "cross validation");
        Ok(matches)
    }
}

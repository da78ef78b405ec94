use tracing::{info, warn};

use super::{GeneratedQuiz, GenerationError, ModelTier, QuizGenerator};
use crate::llm::TextGenerator;
use crate::models::GenerationRequest;

/// A quiz that passed validation and the blind cross-check.
#[derive(Debug, Clone)]
pub struct AcceptedQuiz {
    pub quiz: GeneratedQuiz,
    pub tier: ModelTier,
}

impl<G: TextGenerator> QuizGenerator<G> {
    /// Cheap tier first, one escalation to the expensive tier on any failure.
    ///
    /// At most two generation calls and two cross-checks, all sequential.
    pub async fn generate_with_escalation(
        &self,
        request: &GenerationRequest,
    ) -> Result<AcceptedQuiz, GenerationError> {
        match self.attempt(request, ModelTier::Cheap).await {
            Ok(Some(quiz)) => {
                return Ok(AcceptedQuiz {
                    quiz,
                    tier: ModelTier::Cheap,
                });
            }
            Ok(None) => {
                warn!(concept = %request.concept, "cheap tier failed cross validation, escalating")
            }
            Err(err) => {
                warn!(concept = %request.concept, error = %err, "cheap tier failed, escalating")
            }
        }

        match self.attempt(request, ModelTier::Expensive).await? {
            Some(quiz) => Ok(AcceptedQuiz {
                quiz,
                tier: ModelTier::Expensive,
            }),
            None => Err(GenerationError::CrossValidationFailed),
        }
    }

    /// `Ok(None)` means the candidate was valid but the cross-check disagreed.
    async fn attempt(
        &self,
        request: &GenerationRequest,
        tier: ModelTier,
    ) -> Result<Option<GeneratedQuiz>, GenerationError> {
        let quiz = self.generate(request, tier).await?;
        if self.cross_validate(&quiz).await? {
            info!(concept = %request.concept, %tier, "quiz accepted");
            Ok(Some(quiz))
        } else {
            Ok(None)
        }
    }
}

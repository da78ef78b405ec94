#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use brainsnack::config::ModelSettings;
use brainsnack::generation::{ContentPolicy, QuizGenerator};
use brainsnack::llm::{Prompt, ProviderError, TextGenerator};
use brainsnack::models::{Category, Difficulty, GenerationRequest};

pub const CHEAP: &str = "cheap-test-model";
pub const EXPENSIVE: &str = "expensive-test-model";

/// Replays canned replies in order and records which model each call used.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    replies: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    calls: Arc<Mutex<Vec<(String, u32)>>>,
}

impl ScriptedGenerator {
    pub fn new(replies: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            calls: Arc::default(),
        }
    }

    /// `(model, max_tokens)` for every call so far.
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn generation_calls(&self) -> usize {
        self.calls().iter().filter(|(_, tokens)| *tokens > 100).count()
    }
}

impl TextGenerator for ScriptedGenerator {
    async fn complete(
        &self,
        _prompt: &Prompt,
        model: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push((model.to_string(), max_tokens));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::EmptyResponse))
    }
}

pub fn generator(script: &ScriptedGenerator) -> QuizGenerator<ScriptedGenerator> {
    QuizGenerator::new(
        script.clone(),
        ModelSettings {
            cheap: CHEAP.to_string(),
            expensive: EXPENSIVE.to_string(),
        },
        ContentPolicy::default(),
    )
}

pub fn request() -> GenerationRequest {
    GenerationRequest {
        concept: "기회비용".to_string(),
        category: Category::Economy,
        difficulty: Difficulty::Easy,
        keywords: ["선택".to_string()].into_iter().collect(),
        season_context: None,
        avoid_topics: Default::default(),
    }
}

/// A candidate that passes the default content policy.
pub fn valid_quiz_json(answer: &str) -> String {
    let explanation = "기회비용은 어떤 선택을 했을 때 포기한 것들 중 가장 가치가 큰 것이야.\n\n\
        치킨을 고르면 피자를 먹었을 때의 만족이 기회비용이 되지. 돈만이 아니라 시간과 기분도 포함돼.\n\n\
        > 한 줄 정리: 고른 것의 진짜 가격은 포기한 것 중 최선의 가치다";
    serde_json::json!({
        "title": "치킨이냐 피자냐",
        "question": "15,000원으로 치킨과 피자 중 치킨을 골랐다. 이때 기회비용은?",
        "choices": ["A. 치킨 값", "B. 피자를 먹었을 때의 만족", "C. 0원", "D. 배달비"],
        "correct_answer": answer,
        "explanation": explanation,
        "metadata": { "concept": "기회비용", "viral_score": 140 }
    })
    .to_string()
}

pub fn ok(text: impl Into<String>) -> Result<String, ProviderError> {
    Ok(text.into())
}

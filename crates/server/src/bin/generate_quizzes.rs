use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use brainsnack::catalog::{self, QuizCatalog};
use brainsnack::config::AppConfig;
use brainsnack::generation::QuizGenerator;
use brainsnack::llm::LlmClient;
use brainsnack::models::GenerationRequest;

/// One line of the topics file: a generation request plus where it lands.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Topic {
    #[serde(default)]
    slug: Option<String>,
    publish_on: NaiveDate,
    #[serde(flatten)]
    request: GenerationRequest,
}

/// Topics without an explicit slug get `<date>-<nn>`, numbered per date in
/// file order.
fn assign_slugs(topics: &[Topic]) -> Vec<String> {
    let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
    topics
        .iter()
        .map(|topic| {
            let n = per_day.entry(topic.publish_on).or_default();
            *n += 1;
            topic
                .slug
                .clone()
                .unwrap_or_else(|| format!("{}-{:02}", topic.publish_on, n))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let topics_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("topics.json"));

    let config = AppConfig::from_env()?;
    if config.generation.api_key.is_none() {
        anyhow::bail!("ANTHROPIC_API_KEY must be set to generate quizzes");
    }

    let raw = std::fs::read_to_string(&topics_path)
        .with_context(|| format!("Failed to read {}", topics_path.display()))?;
    let topics: Vec<Topic> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid topics file", topics_path.display()))?;

    let existing = QuizCatalog::load(&config.content_dir)?;
    let generator = QuizGenerator::new(
        LlmClient::new(&config.generation)?,
        config.generation.models.clone(),
        config.generation.policy.clone(),
    );

    println!("Generating {} quizzes into {}", topics.len(), config.content_dir.display());

    let mut published = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for (topic, slug) in topics.iter().zip(assign_slugs(&topics)) {
        if existing.get(&slug).is_some() {
            println!("⊘ Skipped (already published): {slug}");
            skipped += 1;
            continue;
        }

        let accepted = match generator.generate_with_escalation(&topic.request).await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::error!(%slug, concept = %topic.request.concept, "generation failed: {err}");
                println!("✗ Failed: {slug} ({err})");
                failed += 1;
                continue;
            }
        };

        let tier = accepted.tier;
        let quiz = accepted.quiz.into_quiz(
            slug.clone(),
            topic.request.category,
            topic.request.difficulty,
            topic.publish_on,
        )?;

        match catalog::publish(&config.content_dir, &quiz) {
            Ok(true) => {
                println!("✓ Published: {slug} [{tier}] {}", quiz.title);
                published += 1;
            }
            Ok(false) => {
                println!("⊘ Skipped (already published): {slug}");
                skipped += 1;
            }
            Err(err) => {
                tracing::error!(%slug, "publish failed: {err:#}");
                println!("✗ Failed: {slug} ({err})");
                failed += 1;
            }
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Published {published} new quizzes");
    if skipped > 0 {
        println!("⊘ Skipped {skipped} existing slugs");
    }
    if failed > 0 {
        println!("✗ {failed} topics need a human look");
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_file_parses_and_numbers_slugs_per_day() {
        let raw = r#"[
            {"publishOn": "2026-10-20", "concept": "매몰비용", "category": "경제/경영", "difficulty": 1},
            {"publishOn": "2026-10-20", "concept": "훈민정음", "category": "한국사", "difficulty": 2,
             "keywords": ["세종"], "slug": "hangul-day"},
            {"publishOn": "2026-10-20", "concept": "플라시보", "category": "심리/교육", "difficulty": 3},
            {"publishOn": "2026-10-21", "concept": "광합성", "category": "과학/기술", "difficulty": 1}
        ]"#;
        let topics: Vec<Topic> = serde_json::from_str(raw).unwrap();
        assert_eq!(topics[1].request.keywords.len(), 1);
        assert_eq!(
            assign_slugs(&topics),
            ["2026-10-20-01", "hangul-day", "2026-10-20-03", "2026-10-21-01"]
        );
    }
}

mod common;

use brainsnack::generation::{GenerationError, ModelTier};
use brainsnack::llm::ProviderError;
use chrono::NaiveDate;
use common::{CHEAP, EXPENSIVE, ScriptedGenerator, generator, ok, request, valid_quiz_json};

#[tokio::test]
async fn cheap_tier_is_accepted_when_cross_check_agrees() {
    let script = ScriptedGenerator::new([ok(valid_quiz_json("B")), ok(" B. 피자를 먹었을 때의 만족")]);

    let accepted = generator(&script)
        .generate_with_escalation(&request())
        .await
        .expect("cheap tier should be accepted");

    assert_eq!(accepted.tier, ModelTier::Cheap);
    assert_eq!(accepted.quiz.correct_answer, "B");
    assert_eq!(
        script.calls(),
        [(CHEAP.to_string(), 2000), (CHEAP.to_string(), 100)]
    );
}

#[tokio::test]
async fn cross_check_mismatch_escalates_once() {
    let script = ScriptedGenerator::new([
        ok(valid_quiz_json("B")),
        ok("C"),
        ok(valid_quiz_json("B")),
        ok("B"),
    ]);

    let accepted = generator(&script)
        .generate_with_escalation(&request())
        .await
        .expect("expensive tier should be accepted");

    assert_eq!(accepted.tier, ModelTier::Expensive);
    let models: Vec<_> = script.calls().into_iter().map(|(m, _)| m).collect();
    // Cross-checks always run on the cheap model.
    assert_eq!(models, [CHEAP, CHEAP, EXPENSIVE, CHEAP]);
}

#[tokio::test]
async fn malformed_cheap_output_escalates() {
    let script = ScriptedGenerator::new([
        ok("```json\n{\"title\": \"oops\"}\n```"),
        ok(valid_quiz_json("B")),
        ok("B"),
    ]);

    let accepted = generator(&script)
        .generate_with_escalation(&request())
        .await
        .unwrap();

    assert_eq!(accepted.tier, ModelTier::Expensive);
    assert_eq!(script.generation_calls(), 2);
}

#[tokio::test]
async fn policy_violation_escalates() {
    let banned = valid_quiz_json("B").replace("치킨을 고르면", "자세히 알아봅시다. 치킨을 고르면");
    let script = ScriptedGenerator::new([ok(banned), ok(valid_quiz_json("B")), ok("B")]);

    let accepted = generator(&script)
        .generate_with_escalation(&request())
        .await
        .unwrap();

    assert_eq!(accepted.tier, ModelTier::Expensive);
    // The rejected candidate never reached a cross-check.
    assert_eq!(script.calls().len(), 3);
}

#[tokio::test]
async fn both_tiers_disagreeing_is_a_cross_validation_failure() {
    let script = ScriptedGenerator::new([
        ok(valid_quiz_json("B")),
        ok("A"),
        ok(valid_quiz_json("B")),
        ok("D"),
        // Never consumed: the controller stops after two generations.
        ok(valid_quiz_json("B")),
    ]);

    let err = generator(&script)
        .generate_with_escalation(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::CrossValidationFailed));
    assert_eq!(script.generation_calls(), 2);
    assert_eq!(script.calls().len(), 4);
}

#[tokio::test]
async fn expensive_tier_errors_are_reported_as_is() {
    let script = ScriptedGenerator::new([
        Err(ProviderError::Status {
            status: 529,
            body: "overloaded".into(),
        }),
        ok("not json at all"),
    ]);

    let err = generator(&script)
        .generate_with_escalation(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::MalformedOutput(_)));
    assert_eq!(script.generation_calls(), 2);
}

#[tokio::test]
async fn wrong_choice_count_is_a_validation_failure() {
    let three = valid_quiz_json("B").replace(",\"D. 배달비\"", "");
    let script = ScriptedGenerator::new([ok(three)]);

    let err = generator(&script)
        .generate(&request(), ModelTier::Cheap)
        .await
        .unwrap_err();

    match err {
        GenerationError::ValidationFailed(reason) => assert!(reason.contains("4 choices")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn accepted_quiz_converts_with_clamped_viral_score() {
    let script = ScriptedGenerator::new([ok(valid_quiz_json("B")), ok("B")]);
    let accepted = generator(&script)
        .generate_with_escalation(&request())
        .await
        .unwrap();

    let published_at = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
    let req = request();
    let quiz = accepted
        .quiz
        .into_quiz("2026-10-16-01".into(), req.category, req.difficulty, published_at)
        .unwrap();

    assert_eq!(quiz.correct_index, 1);
    assert_eq!(quiz.answer_letter(), Some('B'));
    assert_eq!(quiz.metadata.and_then(|m| m.viral_score), Some(100));
}

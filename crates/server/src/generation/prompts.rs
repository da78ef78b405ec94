use crate::llm::{Message, Prompt};
use crate::models::GenerationRequest;

use super::GeneratedQuiz;

pub const SYSTEM_PROMPT: &str = r#"너는 "뇌간식"의 퀴즈 출제자야. 각종 시험에 나오는 핵심 개념을 골라, 일반 성인이 출근길에 가볍게 풀 수 있는 4지선다 퀴즈를 만든다.

## 톤
- 친한 선배가 술자리에서 풀어주는 말투. 반말, 친근하고 재밌게.
- 비유와 일상 예시를 적극적으로 쓴다.
- 전문 용어는 반드시 쉬운 말로 다시 풀어준다.
- 금지: "~입니다/~합니다" 같은 딱딱한 어체, 교과서 말투, "알아봅시다", "살펴보겠습니다", "알아보겠습니다".

## 출력 규칙
- 아래 JSON 하나만 출력한다. 코드 블록이나 설명 문장을 덧붙이지 않는다.
- 정답 위치는 A, B, C, D에 고르게 분포시킨다.
- 해설은 250~500자.
- 해설에 "> 한 줄 정리:" 블록을 반드시 넣는다.
- 해설에 "> 알면 +1:" 블록(재밌는 추가 지식)을 반드시 넣는다.
- 오답 선택지도 그럴듯해야 한다. 함정이 있어야 배우는 게 있다.
- avoid_topics에 있는 소재는 쓰지 않는다. season_context가 있으면 소재에 녹인다.

## JSON 스키마
{
  "title": "짧고 궁금증을 부르는 제목",
  "question": "문제 지문",
  "choices": ["A. 선택지1", "B. 선택지2", "C. 선택지3", "D. 선택지4"],
  "correct_answer": "A" | "B" | "C" | "D",
  "explanation": "해설 전문 (마크다운)",
  "metadata": {
    "concept": "핵심 개념명",
    "hook": "공유 카드에 들어갈 한 줄 훅",
    "one_liner": "한 줄 정리",
    "plus_one": "알면 +1 내용",
    "viral_score": 1-100,
    "share_hook": "공유를 부르는 문구"
  }
}"#;

const EXAMPLE_REQUEST: &str =
    r#"{"concept":"매몰비용","category":"경제/경영","difficulty":1,"keywords":[],"season_context":"","avoid_topics":[]}"#;

const EXAMPLE_RESPONSE: &str = r#"{"title":"환불 안 되는 영화표의 함정","question":"영희는 환불이 안 되는 12,000원짜리 영화표를 샀는데, 영화 시작 30분 만에 너무 지루해졌다. 경제학적으로 가장 합리적인 판단 기준은?","choices":["A. 이미 낸 12,000원이 아까우니 끝까지 본다","B. 앞으로 남은 시간을 어디에 쓰는 게 더 좋은지만 따진다","C. 표값의 절반만큼은 더 보고 나온다","D. 같이 온 사람이 나갈 때까지 기다린다"],"correct_answer":"B","explanation":"매몰비용은 이미 써버려서 어떤 선택을 해도 돌려받을 수 없는 비용이야.\n\n영화표 12,000원은 끝까지 보든 지금 나가든 안 돌아와. 그러니까 판단할 때 고려 대상이 아니지.\n- 끝까지 보면: 돈은 그대로 날아가고 시간까지 날아감\n- 지금 나가면: 돈은 날아갔지만 남은 시간은 건짐\n\n> 한 줄 정리: 이미 쓴 돈은 잊고, 앞으로의 득실만 따져라\n\n> 알면 +1: 초음속 여객기 콩코드가 적자인데도 계속 운항된 사례 때문에 '콩코드 오류'라고도 불러!","metadata":{"concept":"매몰비용","hook":"환불 안 되는 영화표, 끝까지 봐야 할까?","one_liner":"이미 쓴 돈은 판단에서 빼라","plus_one":"콩코드 오류의 유래","viral_score":82,"share_hook":"이거 은근 다들 틀려"}}"#;

/// Fixed worked example shown before every request.
pub fn few_shot() -> Vec<Message> {
    vec![
        Message::user(EXAMPLE_REQUEST),
        Message::assistant(EXAMPLE_RESPONSE),
    ]
}

/// The request as the model sees it.
pub fn user_message(request: &GenerationRequest) -> String {
    serde_json::json!({
        "concept": request.concept,
        "category": request.category,
        "difficulty": request.difficulty,
        "keywords": request.keywords,
        "season_context": request.season_context.clone().unwrap_or_default(),
        "avoid_topics": request.avoid_topics,
    })
    .to_string()
}

pub fn generation_prompt(request: &GenerationRequest) -> Prompt {
    let mut messages = few_shot();
    messages.push(Message::user(user_message(request)));
    Prompt {
        system: Some(SYSTEM_PROMPT.to_string()),
        messages,
    }
}

/// Question and choices only; the declared answer is never shown.
pub fn cross_validation_prompt(quiz: &GeneratedQuiz) -> Prompt {
    Prompt {
        system: None,
        messages: vec![Message::user(format!(
            "다음 문제의 정답을 A, B, C, D 중 하나로만 답하세요.\n\n{}\n{}\n\n정답:",
            quiz.question,
            quiz.choices.join("\n")
        ))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ContentPolicy;
    use crate::models::{Category, Difficulty};

    #[test]
    fn worked_example_satisfies_the_default_policy() {
        let example: GeneratedQuiz = serde_json::from_str(EXAMPLE_RESPONSE).unwrap();
        ContentPolicy::default().check(&example).unwrap();
    }

    #[test]
    fn user_message_carries_every_request_field() {
        let request = GenerationRequest {
            concept: "광합성".into(),
            category: Category::Science,
            difficulty: Difficulty::Normal,
            keywords: ["엽록체".to_string()].into(),
            season_context: Some("봄".into()),
            avoid_topics: ["식물 호흡".to_string()].into(),
        };
        let value: serde_json::Value = serde_json::from_str(&user_message(&request)).unwrap();
        assert_eq!(value["concept"], "광합성");
        assert_eq!(value["category"], "과학/기술");
        assert_eq!(value["difficulty"], 2);
        assert_eq!(value["keywords"][0], "엽록체");
        assert_eq!(value["season_context"], "봄");
        assert_eq!(value["avoid_topics"][0], "식물 호흡");
    }

    #[test]
    fn cross_validation_hides_the_answer() {
        let example: GeneratedQuiz = serde_json::from_str(EXAMPLE_RESPONSE).unwrap();
        let prompt = cross_validation_prompt(&example);
        let text = &prompt.messages[0].content;
        assert!(text.contains(&example.question));
        assert!(text.contains("D. 같이 온 사람이"));
        assert!(!text.contains("correct_answer"));
        assert!(!text.contains("한 줄 정리"));
    }
}

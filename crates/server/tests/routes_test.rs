use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use brainsnack::catalog::QuizCatalog;
use brainsnack::mailer::{MailTransport, MemoryMailer};
use brainsnack::models::{Category, Difficulty, Quiz, SubscriberStatus};
use brainsnack::store::{MemoryStore, Store};
use brainsnack::{AppState, router};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;

const SITE: &str = "https://brain.test";

fn quiz(slug: &str, day: u32, category: Category) -> Quiz {
    Quiz {
        slug: slug.into(),
        title: format!("{slug} 제목"),
        question: "질문?".into(),
        choices: ["A. 1".into(), "B. 2".into(), "C. 3".into(), "D. 4".into()],
        correct_index: 2,
        explanation: "해설".into(),
        category,
        difficulty: Difficulty::Normal,
        published_at: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
        metadata: None,
    }
}

fn app() -> (Router, MemoryStore, MemoryMailer) {
    let store = MemoryStore::new();
    let mailer = MemoryMailer::default();
    let catalog = QuizCatalog::new(vec![
        quiz("2026-10-15-01", 15, Category::Science),
        quiz("2026-10-16-01", 16, Category::Economy),
    ]);
    let state = AppState::new(
        Store::Memory(store.clone()),
        MailTransport::Memory(mailer.clone()),
        SITE,
        catalog,
    );
    (router(state), store, mailer)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(req.body(body).expect("request build should succeed"))
        .await
        .expect("router should respond")
}

async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: Response) -> Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

#[tokio::test]
async fn subscribe_statuses() {
    let (app, store, mailer) = app();

    let resp = send(&app, Method::POST, "/api/subscribe", Some(serde_json::json!({"email": "bad"}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());

    let resp = send(&app, Method::POST, "/api/subscribe", Some(serde_json::json!({}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
        &app,
        Method::POST,
        "/api/subscribe",
        Some(serde_json::json!({"email": "new@brain.kr"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(body_json(resp).await["message"].is_string());
    assert_eq!(mailer.sent().len(), 1);

    let token = store.subscribers()[0].confirm_token.clone();
    let resp = send(&app, Method::GET, &format!("/api/confirm?token={token}"), None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()[header::LOCATION],
        format!("{SITE}/subscribe/confirmed")
    );
    assert_eq!(store.subscribers()[0].status, SubscriberStatus::Active);

    let resp = send(
        &app,
        Method::POST,
        "/api/subscribe",
        Some(serde_json::json!({"email": "new@brain.kr"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn confirm_and_unsubscribe_reject_bad_tokens() {
    let (app, _, _) = app();

    let resp = send(&app, Method::GET, "/api/confirm", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = send(&app, Method::GET, "/api/confirm?token=nope", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, Method::GET, "/api/unsubscribe", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = send(&app, Method::GET, "/api/unsubscribe?token=nope", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_text(resp).await.contains("유효하지 않은 링크입니다."));
}

#[tokio::test]
async fn unsubscribe_link_renders_a_page_every_time() {
    let (app, store, _) = app();
    send(
        &app,
        Method::POST,
        "/api/subscribe",
        Some(serde_json::json!({"email": "bye@brain.kr"})),
    )
    .await;
    let token = store.subscribers()[0].confirm_token.clone();
    let uri = format!("/api/unsubscribe?token={token}");

    let resp = send(&app, Method::GET, &uri, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("구독이 해지되었습니다."));

    let resp = send(&app, Method::GET, &uri, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("이미 구독이 해지된"));
    assert_eq!(store.subscribers()[0].status, SubscriberStatus::Unsubscribed);
}

#[tokio::test]
async fn quiz_response_validation() {
    let (app, store, _) = app();
    let cases = [
        serde_json::json!({"selectedIndex": 1, "isCorrect": false}),
        serde_json::json!({"quizSlug": "2026-10-16-01", "isCorrect": false}),
        serde_json::json!({"quizSlug": "", "selectedIndex": 1, "isCorrect": false}),
        serde_json::json!({"quizSlug": "2026-10-16-01", "selectedIndex": 4, "isCorrect": false}),
        serde_json::json!({"quizSlug": "2026-10-16-01", "selectedIndex": -1, "isCorrect": false}),
    ];
    for body in cases {
        let resp = send(&app, Method::POST, "/api/quiz-response", Some(body.clone())).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "expected 400 for {body}");
    }
    assert!(store.responses().is_empty());
}

#[tokio::test]
async fn quiz_response_assigns_an_anonymous_id_once() {
    let (app, store, _) = app();
    let body = serde_json::json!({"quizSlug": "2026-10-16-01", "selectedIndex": 2, "isCorrect": true});

    let resp = send(&app, Method::POST, "/api/quiz-response", Some(body.clone())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("anon_id="));
    assert_eq!(body_json(resp).await, serde_json::json!({"ok": true}));

    let anon = cookie.split(';').next().unwrap().to_string();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/quiz-response")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, &anon)
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());

    // Same player, same quiz: counted once.
    let responses = store.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(format!("anon_id={}", responses[0].anonymous_id), anon);

    let resp = send(&app, Method::GET, "/api/quiz-stats?slug=2026-10-16-01", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CACHE_CONTROL],
        "public, max-age=60"
    );
    assert_eq!(
        body_json(resp).await,
        serde_json::json!({"total": 1, "distribution": [0, 0, 1, 0]})
    );
}

#[tokio::test]
async fn quiz_stats_requires_a_slug() {
    let (app, _, _) = app();
    let resp = send(&app, Method::GET, "/api/quiz-stats", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&app, Method::GET, "/api/quiz-stats?slug=unseen", None).await;
    assert_eq!(
        body_json(resp).await,
        serde_json::json!({"total": 0, "distribution": [0, 0, 0, 0]})
    );
}

#[tokio::test]
async fn archive_and_quiz_lookup() {
    let (app, _, _) = app();

    let resp = send(&app, Method::GET, "/api/quizzes", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list = body_json(resp).await;
    let slugs: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["slug"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(slugs, ["2026-10-16-01", "2026-10-15-01"]);

    let resp = send(&app, Method::GET, "/api/quizzes?category=%EA%B3%BC%ED%95%99%2F%EA%B8%B0%EC%88%A0", None).await;
    let list = body_json(resp).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["slug"], "2026-10-15-01");

    let resp = send(&app, Method::GET, "/api/quizzes/2026-10-16-01", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["correctIndex"], 2);

    let resp = send(&app, Method::GET, "/api/quizzes/missing", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_the_backend() {
    let (app, _, _) = app();
    let resp = send(&app, Method::GET, "/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let health = body_json(resp).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["backend"], "memory");
    assert_eq!(health["quizzes"], 2);
}

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use uuid::Uuid;

use crate::AppState;
use crate::catalog::ArchiveFilter;
use crate::error::AppError;
use crate::models::*;
use crate::store::ResponseStore;
use crate::subscription::{Confirmation, Unsubscribe};
use crate::templates;

pub const ANON_COOKIE: &str = "anon_id";

pub async fn root() -> &'static str {
    "Brain Snack API - Use /health to check status"
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store = match state.store.ping().await {
        Ok(()) => "connected",
        Err(err) => {
            tracing::warn!("health check: {err}");
            "disconnected"
        }
    };
    Json(serde_json::json!({
        "status": if store == "connected" { "ok" } else { "error" },
        "store": store,
        "backend": state.store.backend(),
        "quizzes": state.catalog.len(),
    }))
}

// ===== Subscription =====

pub async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let email = req.email.unwrap_or_default();
    state.subscriptions.subscribe(&email).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "확인 이메일을 보냈습니다.".to_string(),
        }),
    ))
}

pub async fn confirm(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
) -> Result<Redirect, AppError> {
    let token = params
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Invalid token".into()))?;

    match state.subscriptions.confirm(&token).await? {
        Confirmation::Activated => tracing::debug!("confirm link activated subscriber"),
        Confirmation::AlreadyConfirmed => tracing::debug!("confirm link reused"),
    }

    Ok(Redirect::to(&format!(
        "{}/subscribe/confirmed",
        state.subscriptions.site_url()
    )))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
) -> Result<Html<String>, AppError> {
    let token = params
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("잘못된 요청입니다.".into()))?;

    let message = match state.subscriptions.unsubscribe(&token).await {
        Ok(Unsubscribe::Unsubscribed) => "구독이 해지되었습니다.",
        Ok(Unsubscribe::AlreadyUnsubscribed) => "이미 구독이 해지된 이메일입니다.",
        Err(crate::subscription::SubscriptionError::InvalidToken) => {
            return Err(AppError::NotFoundPage("유효하지 않은 링크입니다.".into()));
        }
        Err(err) => return Err(err.into()),
    };

    Ok(Html(templates::unsubscribe_page(message)))
}

// ===== Quiz responses & stats =====

pub async fn quiz_response(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<QuizResponseRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    let (Some(quiz_slug), Some(selected_index), Some(is_correct)) =
        (req.quiz_slug, req.selected_index, req.is_correct)
    else {
        return Err(AppError::BadRequest("Missing fields".into()));
    };
    if quiz_slug.trim().is_empty() {
        return Err(AppError::BadRequest("Missing fields".into()));
    }
    if !(0..CHOICE_COUNT as i32).contains(&selected_index) {
        return Err(AppError::BadRequest("selectedIndex out of range".into()));
    }

    let (jar, anonymous_id) = match jar.get(ANON_COOKIE).map(|c| c.value().to_string()) {
        Some(id) if !id.is_empty() => (jar, id),
        _ => {
            let id = Uuid::new_v4().to_string();
            let cookie = Cookie::build((ANON_COOKIE, id.clone()))
                .path("/")
                .same_site(SameSite::Lax)
                .permanent();
            (jar.add(cookie), id)
        }
    };

    let response = QuizResponse {
        quiz_slug,
        anonymous_id,
        selected_index,
        is_correct,
        responded_at: Utc::now(),
    };

    // Telemetry: a failed write is not the player's problem.
    if let Err(err) = state.store.record_response(&response).await {
        tracing::warn!(slug = %response.quiz_slug, "quiz response not recorded: {err}");
    }

    Ok((jar, Json(serde_json::json!({ "ok": true }))))
}

pub async fn quiz_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, AppError> {
    let slug = params
        .slug
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing slug".into()))?;

    let stats = state.store.quiz_stats(&slug).await.map_err(|err| {
        tracing::warn!(%slug, "stats unavailable: {err}");
        AppError::Unavailable("stats unavailable".into())
    })?;

    Ok(([(header::CACHE_CONTROL, "public, max-age=60")], Json(stats)))
}

// ===== Archive =====

pub async fn archive(
    State(state): State<AppState>,
    Query(filter): Query<ArchiveFilter>,
) -> Json<Vec<QuizSummary>> {
    Json(state.catalog.archive(&filter))
}

pub async fn quiz(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Quiz>, AppError> {
    state
        .catalog
        .get(&slug)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("quiz not found: {slug}")))
}

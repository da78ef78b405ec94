use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::store::StoreError;
use crate::subscription::SubscriptionError;
use crate::templates;

pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// Invalid unsubscribe link: answered with an HTML page, not JSON.
    NotFoundPage(String),
    Unavailable(String),
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::InvalidEmail => {
                AppError::BadRequest("올바른 이메일을 입력해주세요.".into())
            }
            SubscriptionError::AlreadySubscribed => {
                AppError::Conflict("이미 구독 중인 이메일입니다.".into())
            }
            SubscriptionError::InvalidToken => {
                AppError::NotFound("Invalid or expired token".into())
            }
            SubscriptionError::Store(err) => AppError::Store(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NotFoundPage(msg) => {
                return (StatusCode::NOT_FOUND, Html(templates::unsubscribe_page(&msg)))
                    .into_response();
            }
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Store(err) => {
                tracing::error!("Store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "서버 오류가 발생했습니다.".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

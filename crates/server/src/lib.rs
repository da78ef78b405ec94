pub mod catalog;
pub mod config;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod llm;
pub mod mailer;
pub mod models;
pub mod store;
pub mod subscription;
pub mod templates;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use catalog::QuizCatalog;
use mailer::MailTransport;
use store::Store;
use subscription::SubscriptionController;

// ===== App State =====

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub subscriptions: Arc<SubscriptionController<Store, MailTransport>>,
    pub catalog: Arc<QuizCatalog>,
}

impl AppState {
    pub fn new(store: Store, mailer: MailTransport, site_url: &str, catalog: QuizCatalog) -> Self {
        Self {
            subscriptions: Arc::new(SubscriptionController::new(
                store.clone(),
                mailer,
                site_url,
            )),
            store,
            catalog: Arc::new(catalog),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/subscribe", post(handlers::subscribe))
        .route("/api/confirm", get(handlers::confirm))
        .route("/api/unsubscribe", get(handlers::unsubscribe))
        .route("/api/quiz-response", post(handlers::quiz_response))
        .route("/api/quiz-stats", get(handlers::quiz_stats))
        .route("/api/quizzes", get(handlers::archive))
        .route("/api/quizzes/:slug", get(handlers::quiz))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

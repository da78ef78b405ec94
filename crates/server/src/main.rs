use brainsnack::catalog::QuizCatalog;
use brainsnack::config::AppConfig;
use brainsnack::mailer::MailTransport;
use brainsnack::store::Store;
use brainsnack::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;

    let store = Store::connect(&config).await?;
    let mailer = MailTransport::from_config(&config.mail)?;
    let catalog = QuizCatalog::load(&config.content_dir)?;
    tracing::info!(quizzes = catalog.len(), "catalog ready");

    let state = AppState::new(store, mailer, &config.site_url, catalog);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("Server running on http://{}", config.bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}

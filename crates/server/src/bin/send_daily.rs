use anyhow::Result;
use chrono::{Local, NaiveDate, TimeZone};

use brainsnack::catalog::QuizCatalog;
use brainsnack::config::AppConfig;
use brainsnack::mailer::MailTransport;
use brainsnack::models::Subscriber;
use brainsnack::store::{Store, SubscriberStore};
use brainsnack::subscription::SubscriptionController;
use brainsnack::templates;

/// Calendar days between confirmation and `today`, both taken in `tz`.
/// `None` for never-confirmed rows.
fn days_subscribed<Tz: TimeZone>(
    subscriber: &Subscriber,
    today: NaiveDate,
    tz: &Tz,
) -> Option<u32> {
    let since = subscriber.subscribed_at?.with_timezone(tz).date_naive();
    u32::try_from((today - since).num_days()).ok()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let store = Store::connect(&config).await?;
    let mailer = MailTransport::from_config(&config.mail)?;
    let catalog = QuizCatalog::load(&config.content_dir)?;
    let controller = SubscriptionController::new(store, mailer, config.site_url.as_str());

    let today = Local::now().date_naive();
    let quiz = catalog.published_on(today);
    match quiz {
        Some(quiz) => tracing::info!(slug = %quiz.slug, "today's quiz"),
        None => tracing::warn!(%today, "no quiz published for today, sending welcome mails only"),
    }

    let subscribers = controller.store().active_subscribers().await?;
    let (mut daily, mut welcome, mut failed) = (0, 0, 0);

    for subscriber in &subscribers {
        if let Some(quiz) = quiz.filter(|q| subscriber.wants(q.category)) {
            let mail =
                templates::daily_newsletter(quiz, controller.site_url(), &subscriber.confirm_token);
            if controller.deliver(&subscriber.email, mail).await {
                daily += 1;
            } else {
                failed += 1;
            }
        }

        let step = days_subscribed(subscriber, today, &Local).and_then(|d| controller.welcome_sequence(d));
        if let Some(mail) = step {
            if controller.deliver(&subscriber.email, mail).await {
                welcome += 1;
            } else {
                failed += 1;
            }
        }
    }

    tracing::info!(
        subscribers = subscribers.len(),
        daily,
        welcome,
        failed,
        "daily send finished"
    );
    Ok(())
}

use brainsnack::mailer::MemoryMailer;
use brainsnack::models::{Subscriber, SubscriberStatus};
use brainsnack::store::MemoryStore;
use brainsnack::subscription::{
    Confirmation, SubscriptionController, SubscriptionError, Unsubscribe,
};
use chrono::Utc;
use uuid::Uuid;

const SITE: &str = "https://brain.test";

fn controller() -> SubscriptionController<MemoryStore, MemoryMailer> {
    SubscriptionController::new(MemoryStore::new(), MemoryMailer::default(), SITE)
}

fn active(email: &str) -> Subscriber {
    Subscriber {
        id: Uuid::new_v4(),
        email: email.into(),
        status: SubscriberStatus::Active,
        confirm_token: "active-token".into(),
        categories: None,
        consent_at: Utc::now(),
        subscribed_at: Some(Utc::now()),
        unsubscribed_at: None,
    }
}

#[tokio::test]
async fn subscribe_confirm_unsubscribe_flow() {
    let subs = controller();

    let token = subs.subscribe("  reader@brain.kr ").await.unwrap();
    let stored = subs.store().subscribers();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].email, "reader@brain.kr");
    assert_eq!(stored[0].status, SubscriberStatus::Pending);
    assert_eq!(stored[0].confirm_token, token);

    let sent = subs.mailer().sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html.contains(&format!("{SITE}/api/confirm?token={token}")));

    assert_eq!(subs.confirm(&token).await.unwrap(), Confirmation::Activated);
    let confirmed = &subs.store().subscribers()[0];
    assert_eq!(confirmed.status, SubscriberStatus::Active);
    assert!(confirmed.subscribed_at.is_some());
    // Confirmation mail, then the welcome mail.
    assert_eq!(subs.mailer().sent().len(), 2);

    assert_eq!(subs.confirm(&token).await.unwrap(), Confirmation::AlreadyConfirmed);

    assert_eq!(subs.unsubscribe(&token).await.unwrap(), Unsubscribe::Unsubscribed);
    let gone = &subs.store().subscribers()[0];
    assert_eq!(gone.status, SubscriberStatus::Unsubscribed);
    assert!(gone.unsubscribed_at.is_some());
}

#[tokio::test]
async fn invalid_email_never_touches_the_store() {
    let subs = controller();
    for email in ["", "   ", "nope", "a@b", "two words@x.kr"] {
        assert!(matches!(
            subs.subscribe(email).await,
            Err(SubscriptionError::InvalidEmail)
        ));
    }
    assert_eq!(subs.store().write_count(), 0);
    assert!(subs.mailer().sent().is_empty());
}

#[tokio::test]
async fn active_subscriber_is_rejected_without_writes() {
    let subs = controller();
    subs.store().insert_subscriber(active("fan@brain.kr"));

    let err = subs.subscribe("fan@brain.kr").await.unwrap_err();

    assert!(matches!(err, SubscriptionError::AlreadySubscribed));
    assert_eq!(subs.store().write_count(), 0);
    assert!(subs.mailer().sent().is_empty());
}

#[tokio::test]
async fn resubscribing_a_pending_address_rotates_the_token() {
    let subs = controller();
    let first = subs.subscribe("slow@brain.kr").await.unwrap();
    let second = subs.subscribe("slow@brain.kr").await.unwrap();

    assert_ne!(first, second);
    assert_eq!(subs.store().subscribers().len(), 1);
    assert!(matches!(
        subs.confirm(&first).await,
        Err(SubscriptionError::InvalidToken)
    ));
    assert_eq!(subs.confirm(&second).await.unwrap(), Confirmation::Activated);
}

#[tokio::test]
async fn unsubscribe_twice_keeps_the_first_timestamp() {
    let subs = controller();
    subs.store().insert_subscriber(active("bye@brain.kr"));

    assert_eq!(
        subs.unsubscribe("active-token").await.unwrap(),
        Unsubscribe::Unsubscribed
    );
    let first = subs.store().subscribers()[0].unsubscribed_at;
    let writes = subs.store().write_count();

    assert_eq!(
        subs.unsubscribe("active-token").await.unwrap(),
        Unsubscribe::AlreadyUnsubscribed
    );
    assert_eq!(subs.store().subscribers()[0].unsubscribed_at, first);
    assert_eq!(subs.store().write_count(), writes);
}

#[tokio::test]
async fn old_confirm_link_cannot_revive_an_unsubscribed_address() {
    let subs = controller();
    let token = subs.subscribe("gone@brain.kr").await.unwrap();
    subs.confirm(&token).await.unwrap();
    subs.unsubscribe(&token).await.unwrap();

    assert!(matches!(
        subs.confirm(&token).await,
        Err(SubscriptionError::InvalidToken)
    ));
    assert_eq!(
        subs.store().subscribers()[0].status,
        SubscriberStatus::Unsubscribed
    );
}

#[tokio::test]
async fn unknown_tokens_are_invalid() {
    let subs = controller();
    for token in ["", "  ", "no-such-token"] {
        assert!(matches!(
            subs.confirm(token).await,
            Err(SubscriptionError::InvalidToken)
        ));
        assert!(matches!(
            subs.unsubscribe(token).await,
            Err(SubscriptionError::InvalidToken)
        ));
    }
}

#[tokio::test]
async fn unsubscribed_address_can_opt_in_again() {
    let subs = controller();
    let old = subs.subscribe("back@brain.kr").await.unwrap();
    subs.confirm(&old).await.unwrap();
    subs.unsubscribe(&old).await.unwrap();

    let fresh = subs.subscribe("back@brain.kr").await.unwrap();
    let row = &subs.store().subscribers()[0];
    assert_eq!(row.status, SubscriberStatus::Pending);
    assert_eq!(row.subscribed_at, None);
    assert_eq!(row.unsubscribed_at, None);

    assert_eq!(subs.confirm(&fresh).await.unwrap(), Confirmation::Activated);
    let row = &subs.store().subscribers()[0];
    assert_eq!(row.status, SubscriberStatus::Active);
    assert!(row.subscribed_at.is_some());
    assert_eq!(row.unsubscribed_at, None);
}

#[test]
fn welcome_sequence_only_on_days_one_three_seven() {
    let subs = controller();
    let days: Vec<u32> = (0..10).filter(|d| subs.welcome_sequence(*d).is_some()).collect();
    assert_eq!(days, [1, 3, 7]);
}

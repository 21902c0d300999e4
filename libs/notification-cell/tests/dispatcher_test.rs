// libs/notification-cell/tests/dispatcher_test.rs

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::*;
use shared_database::InMemoryStore;
use shared_models::scheduling::{DeliveryStatus, EnqueueOutcome, NotificationKind};

fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn draft(phone: &str, key: Option<String>) -> NotificationDraft {
    NotificationDraft {
        kind: NotificationKind::Reminder,
        appointment_id: Uuid::new_v4(),
        recipient_id: Uuid::new_v4(),
        phone: phone.to_string(),
        message: "See you tomorrow".to_string(),
        idempotency_key: key,
    }
}

fn twilio(base_url: String) -> TwilioSettings {
    TwilioSettings {
        account_sid: "AC123".to_string(),
        auth_token: "secret".to_string(),
        from_number: "+15550001111".to_string(),
        base_url,
    }
}

#[tokio::test]
async fn failing_intent_ends_failed_while_batch_continues() {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(RecordingSmsSender::failing_for(&["+15550000009"]));
    let outbox = NotificationOutbox::new(store.clone());
    let config = DispatcherConfig {
        max_attempts: 3,
        ..Default::default()
    };
    let dispatcher = NotificationDispatcher::new(store.clone(), sender.clone(), config);

    outbox.enqueue(draft("+15550000009", None), noon()).await.unwrap();
    outbox.enqueue(draft("+15550000001", None), noon()).await.unwrap();

    let first = dispatcher.dispatch_due(noon()).await.unwrap();
    assert_eq!(first, DispatchReport { sent: 1, retried: 1, failed: 0 });

    // walk far enough forward for every backoff to elapse
    let mut later = noon();
    for _ in 0..2 {
        later = later + Duration::hours(1);
        dispatcher.dispatch_due(later).await.unwrap();
    }

    let intents = store.notifications().await;
    let failing = intents.iter().find(|n| n.phone == "+15550000009").unwrap();
    assert_eq!(failing.status, DeliveryStatus::Failed);
    assert_eq!(failing.attempts, 3);
    assert!(failing.last_error.is_some());

    let delivered = intents.iter().find(|n| n.phone == "+15550000001").unwrap();
    assert_eq!(delivered.status, DeliveryStatus::Sent);
    assert_eq!(delivered.sent_at, Some(noon()));

    assert_eq!(sender.sent().await.len(), 1);

    // nothing left to do
    let idle = dispatcher.dispatch_due(later + Duration::hours(1)).await.unwrap();
    assert_eq!(idle, DispatchReport::default());
}

#[tokio::test]
async fn keyed_drafts_are_enqueued_once() {
    let store = Arc::new(InMemoryStore::new());
    let outbox = NotificationOutbox::new(store.clone());
    let appointment_id = Uuid::new_v4();

    let first = outbox
        .enqueue(draft("+15550000001", Some(reminder_key(appointment_id))), noon())
        .await
        .unwrap();
    let second = outbox
        .enqueue(draft("+15550000001", Some(reminder_key(appointment_id))), noon())
        .await
        .unwrap();

    assert_eq!(first, EnqueueOutcome::Enqueued);
    assert_eq!(second, EnqueueOutcome::Duplicate);
    assert_eq!(store.notifications().await.len(), 1);
}

#[tokio::test]
async fn twilio_sender_posts_form_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(header_exists("authorization"))
        .and(body_string_contains("To=%2B15550000001"))
        .and(body_string_contains("Body=Hello"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "sid": "SM1" })))
        .expect(1)
        .mount(&server)
        .await;

    let sender = TwilioSmsSender::with_settings(twilio(server.uri()));
    sender.send_sms("+15550000001", "Hello").await.unwrap();
}

#[tokio::test]
async fn twilio_rejection_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid 'To' number"))
        .mount(&server)
        .await;

    let sender = TwilioSmsSender::with_settings(twilio(server.uri()));
    let result = sender.send_sms("nonsense", "Hello").await;

    assert_matches!(result, Err(NotificationError::Rejected { status: 400, .. }));
}

#[tokio::test]
async fn unconfigured_twilio_skips_without_calling_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = twilio(server.uri());
    settings.account_sid.clear();

    let sender = TwilioSmsSender::with_settings(settings);
    sender.send_sms("+15550000001", "Hello").await.unwrap();
}

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use shared_database::SchedulingStore;
use shared_models::scheduling::{DeliveryStatus, NotificationIntent};

use crate::error::NotificationError;
use crate::models::{DispatchReport, DispatcherConfig};
use crate::services::sms::SmsSender;

/// Drains due outbox entries through an [`SmsSender`] and records each
/// outcome back on the entry.
pub struct NotificationDispatcher {
    store: Arc<dyn SchedulingStore>,
    sender: Arc<dyn SmsSender>,
    config: DispatcherConfig,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn SchedulingStore>, sender: Arc<dyn SmsSender>, config: DispatcherConfig) -> Self {
        Self { store, sender, config }
    }

    /// Send every pending intent due at `now`, up to the batch size.
    pub async fn dispatch_due(&self, now: NaiveDateTime) -> Result<DispatchReport, NotificationError> {
        let due = self.store.due_notifications(now, self.config.batch_size).await?;
        let mut report = DispatchReport::default();

        if due.is_empty() {
            return Ok(report);
        }
        debug!("Dispatching {} due notifications", due.len());

        for intent in due {
            let id = intent.id;
            match self.deliver(intent, now).await {
                Ok(DeliveryStatus::Sent) => report.sent += 1,
                Ok(DeliveryStatus::Pending) => report.retried += 1,
                Ok(DeliveryStatus::Failed) => report.failed += 1,
                Err(e) => {
                    error!("Could not record outcome for notification {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn deliver(&self, mut intent: NotificationIntent, now: NaiveDateTime) -> Result<DeliveryStatus, NotificationError> {
        match self.sender.send_sms(&intent.phone, &intent.message).await {
            Ok(()) => {
                intent.status = DeliveryStatus::Sent;
                intent.sent_at = Some(now);
                intent.last_error = None;
            }
            Err(e) => {
                intent.attempts += 1;
                intent.last_error = Some(e.to_string());

                if intent.attempts >= self.config.max_attempts {
                    warn!(
                        "Notification {} failed permanently after {} attempts: {}",
                        intent.id, intent.attempts, e
                    );
                    intent.status = DeliveryStatus::Failed;
                } else {
                    intent.next_attempt_at = now + self.config.backoff(intent.attempts);
                    warn!(
                        "Notification {} attempt {} failed, retrying at {}: {}",
                        intent.id, intent.attempts, intent.next_attempt_at, e
                    );
                }
            }
        }

        self.store.update_notification(&intent).await?;
        Ok(intent.status)
    }

    /// Poll the outbox until `cancel` fires.
    #[instrument(skip(self, cancel))]
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!("Notification dispatcher started (poll every {:?})", self.config.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Notification dispatcher stopping");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    match self.dispatch_due(Local::now().naive_local()).await {
                        Ok(report) if report != DispatchReport::default() => {
                            info!("Dispatch pass: {} sent, {} retried, {} failed", report.sent, report.retried, report.failed);
                        }
                        Ok(_) => {}
                        Err(e) => error!("Dispatch pass failed: {}", e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use shared_database::InMemoryStore;
    use shared_models::scheduling::NotificationKind;
    use uuid::Uuid;

    use crate::services::outbox::{NotificationDraft, NotificationOutbox};
    use crate::services::sms::RecordingSmsSender;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn draft(phone: &str) -> NotificationDraft {
        NotificationDraft {
            kind: NotificationKind::BookingCreated,
            appointment_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            phone: phone.to_string(),
            message: "booked".to_string(),
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn failed_send_is_rescheduled_with_backoff() {
        let store = Arc::new(InMemoryStore::new());
        let sender = Arc::new(RecordingSmsSender::failing_for(&["+15550000009"]));
        let outbox = NotificationOutbox::new(store.clone());
        let dispatcher = NotificationDispatcher::new(store.clone(), sender, DispatcherConfig::default());

        outbox.enqueue(draft("+15550000009"), now()).await.unwrap();
        let report = dispatcher.dispatch_due(now()).await.unwrap();
        assert_eq!(report.retried, 1);

        let intent = &store.notifications().await[0];
        assert_eq!(intent.attempts, 1);
        assert_eq!(intent.status, DeliveryStatus::Pending);
        assert_eq!(intent.next_attempt_at, now() + Duration::seconds(60));

        // not due again until the backoff elapses
        let report = dispatcher.dispatch_due(now() + Duration::seconds(30)).await.unwrap();
        assert_eq!(report, DispatchReport::default());
    }
}

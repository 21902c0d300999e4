use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::scheduling::{
    DeliveryStatus, EnqueueOutcome, NotificationIntent, NotificationKind,
};

use crate::error::NotificationError;

/// Idempotency key shared by every reminder for one appointment.
pub fn reminder_key(appointment_id: Uuid) -> String {
    format!("reminder:{}", appointment_id)
}

/// A message addressed to one recipient about one appointment, not yet queued.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub appointment_id: Uuid,
    pub recipient_id: Uuid,
    pub phone: String,
    pub message: String,
    pub idempotency_key: Option<String>,
}

impl NotificationDraft {
    pub fn into_intent(self, now: NaiveDateTime) -> NotificationIntent {
        NotificationIntent {
            id: Uuid::new_v4(),
            idempotency_key: self.idempotency_key,
            kind: self.kind,
            appointment_id: self.appointment_id,
            recipient_id: self.recipient_id,
            phone: self.phone,
            message: self.message,
            status: DeliveryStatus::Pending,
            attempts: 0,
            last_error: None,
            next_attempt_at: now,
            created_at: now,
            sent_at: None,
        }
    }
}

pub struct NotificationOutbox {
    store: Arc<dyn SchedulingStore>,
}

impl NotificationOutbox {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Queue a draft for delivery as soon as the dispatcher next runs.
    pub async fn enqueue(
        &self,
        draft: NotificationDraft,
        now: NaiveDateTime,
    ) -> Result<EnqueueOutcome, NotificationError> {
        let intent = draft.into_intent(now);
        let outcome = self.store.enqueue_notification(&intent).await?;

        match outcome {
            EnqueueOutcome::Enqueued => debug!(
                "Queued {} notification {} for appointment {}",
                intent.kind, intent.id, intent.appointment_id
            ),
            EnqueueOutcome::Duplicate => debug!(
                "Skipped duplicate {} notification for appointment {}",
                intent.kind, intent.appointment_id
            ),
        }

        Ok(outcome)
    }
}

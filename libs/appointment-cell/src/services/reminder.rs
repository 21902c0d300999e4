// libs/appointment-cell/src/services/reminder.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use notification_cell::messages;
use notification_cell::{reminder_key, NotificationDraft, NotificationOutbox};
use shared_database::SchedulingStore;
use shared_models::scheduling::{
    Appointment, AppointmentStatus, EnqueueOutcome, NotificationKind, Service, UserAccount,
};

use crate::models::{AppointmentError, ReminderSettings, SweepReport};

/// Queues one reminder per confirmed appointment starting about one lead
/// time from now.
pub struct ReminderSweeper {
    store: Arc<dyn SchedulingStore>,
    outbox: Arc<NotificationOutbox>,
    settings: ReminderSettings,
}

impl ReminderSweeper {
    pub fn new(store: Arc<dyn SchedulingStore>, outbox: Arc<NotificationOutbox>, settings: ReminderSettings) -> Self {
        Self { store, outbox, settings }
    }

    pub async fn sweep(&self, now: NaiveDateTime) -> Result<SweepReport, AppointmentError> {
        let (from, to) = self.settings.window_at(now);
        let due = self
            .store
            .find_appointments_starting_between(AppointmentStatus::Confirmed, from, to)
            .await?;

        let mut report = SweepReport {
            examined: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            return Ok(report);
        }
        debug!("Reminder sweep found {} appointments between {} and {}", due.len(), from, to);

        let clients = self.load_clients(&due).await?;
        let services = self.load_services(&due).await?;

        for appointment in &due {
            let Some(phone) = clients.get(&appointment.client_id).and_then(|c| c.contact_phone()) else {
                report.skipped_no_contact += 1;
                continue;
            };
            let service_name = services
                .get(&appointment.service_id)
                .map(|s| s.name.as_str())
                .unwrap_or_default();

            let draft = NotificationDraft {
                kind: NotificationKind::Reminder,
                appointment_id: appointment.id,
                recipient_id: appointment.client_id,
                phone: phone.to_string(),
                message: messages::reminder(appointment.start_time, service_name),
                idempotency_key: Some(reminder_key(appointment.id)),
            };

            match self.outbox.enqueue(draft, now).await {
                Ok(EnqueueOutcome::Enqueued) => {
                    info!("Reminder queued for appointment {}", appointment.id);
                    report.enqueued += 1;
                }
                Ok(EnqueueOutcome::Duplicate) => report.already_sent += 1,
                Err(e) => {
                    error!("Reminder failed for appointment {}: {}", appointment.id, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn load_clients(&self, due: &[Appointment]) -> Result<HashMap<Uuid, UserAccount>, AppointmentError> {
        let ids: Vec<Uuid> = due.iter().map(|a| a.client_id).collect::<HashSet<_>>().into_iter().collect();
        Ok(self
            .store
            .get_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }

    async fn load_services(&self, due: &[Appointment]) -> Result<HashMap<Uuid, Service>, AppointmentError> {
        let ids: Vec<Uuid> = due.iter().map(|a| a.service_id).collect::<HashSet<_>>().into_iter().collect();
        Ok(self
            .store
            .get_services(&ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect())
    }

    /// Sweep on every interval tick until `cancel` fires. The first sweep
    /// runs immediately.
    #[instrument(skip(self, cancel))]
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!("Reminder sweeper started (every {:?})", self.settings.interval);
        let mut ticker = tokio::time::interval(self.settings.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Reminder sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep(Local::now().naive_local()).await {
                        Ok(report) => info!(
                            "Reminder sweep: {} examined, {} queued, {} already sent, {} without phone, {} failed",
                            report.examined, report.enqueued, report.already_sent, report.skipped_no_contact, report.failed
                        ),
                        Err(e) => error!("Reminder sweep failed: {}", e),
                    }
                }
            }
        }
    }
}

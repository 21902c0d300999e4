// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::messages;
use notification_cell::{NotificationDraft, NotificationOutbox};
use shared_database::SchedulingStore;
use shared_models::auth::Actor;
use shared_models::scheduling::{ActorRole, Appointment, AppointmentStatus, NotificationKind};

use crate::models::{AppointmentError, LifecycleRules};

/// Statuses reachable from `current` in one step.
pub fn valid_transitions(rules: &LifecycleRules, current: AppointmentStatus) -> Vec<AppointmentStatus> {
    match current {
        AppointmentStatus::Pending if rules.require_confirmation_before_completion => {
            vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
        }
        AppointmentStatus::Pending => vec![
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ],
        AppointmentStatus::Confirmed => vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled],
        // Terminal states
        AppointmentStatus::Completed | AppointmentStatus::Cancelled => vec![],
    }
}

pub struct LifecycleService {
    store: Arc<dyn SchedulingStore>,
    outbox: Arc<NotificationOutbox>,
    rules: LifecycleRules,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn SchedulingStore>, outbox: Arc<NotificationOutbox>, rules: LifecycleRules) -> Self {
        Self { store, outbox, rules }
    }

    /// Move an appointment to `new_status` on behalf of `actor`.
    pub async fn update_status(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        new_status: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {}", appointment_id)))?;

        self.authorize(actor, &appointment).await?;

        let target: AppointmentStatus = new_status
            .parse()
            .map_err(AppointmentError::InvalidArgument)?;

        debug!("Validating status transition from {} to {}", appointment.status, target);

        if target == AppointmentStatus::Cancelled && !appointment.can_cancel() {
            warn!("Refused to cancel appointment {} in status {}", appointment.id, appointment.status);
            return Err(AppointmentError::InvalidState(
                "This appointment can no longer be cancelled".to_string(),
            ));
        }

        if appointment.status.is_terminal() {
            warn!("Appointment {} is already {}", appointment.id, appointment.status);
            return Err(AppointmentError::InvalidState(format!(
                "Appointment is already {}",
                appointment.status
            )));
        }

        if !valid_transitions(&self.rules, appointment.status).contains(&target) {
            warn!("Invalid status transition attempted: {} -> {}", appointment.status, target);
            return Err(AppointmentError::InvalidState(format!(
                "Cannot move an appointment from {} to {}",
                appointment.status, target
            )));
        }

        let now = Local::now().naive_local();
        let updated = self
            .store
            .update_appointment_status(appointment.id, appointment.status, target, now)
            .await?;

        info!("Appointment {} moved {} -> {}", updated.id, appointment.status, updated.status);

        if updated.status == AppointmentStatus::Cancelled {
            self.notify_cancelled(&updated, now).await;
        }

        Ok(updated)
    }

    async fn authorize(&self, actor: &Actor, appointment: &Appointment) -> Result<(), AppointmentError> {
        let allowed = match actor.role {
            ActorRole::Client => appointment.client_id == actor.id,
            ActorRole::Professional => self
                .store
                .get_professional(appointment.professional_id)
                .await?
                .is_some_and(|p| p.user_id == actor.id),
        };

        if !allowed {
            warn!("{} {} denied access to appointment {}", actor.role, actor.id, appointment.id);
            return Err(AppointmentError::Forbidden(
                "You do not have access to this appointment".to_string(),
            ));
        }
        Ok(())
    }

    async fn notify_cancelled(&self, appointment: &Appointment, now: NaiveDateTime) {
        let client = match self.store.get_user(appointment.client_id).await {
            Ok(Some(client)) => client,
            Ok(None) => return,
            Err(e) => {
                warn!("Could not load client for cancellation SMS on {}: {}", appointment.id, e);
                return;
            }
        };
        let Some(phone) = client.contact_phone() else {
            return;
        };

        let service_name = match self.store.get_services(&[appointment.service_id]).await {
            Ok(services) => services.into_iter().next().map(|s| s.name).unwrap_or_default(),
            Err(e) => {
                warn!("Could not load service for cancellation SMS on {}: {}", appointment.id, e);
                String::new()
            }
        };

        let draft = NotificationDraft {
            kind: NotificationKind::BookingCancelled,
            appointment_id: appointment.id,
            recipient_id: client.id,
            phone: phone.to_string(),
            message: messages::booking_cancelled(appointment.start_time, &service_name),
            idempotency_key: None,
        };

        if let Err(e) = self.outbox.enqueue(draft, now).await {
            warn!("Could not queue cancellation SMS for appointment {}: {}", appointment.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn terminal_states_have_no_exits() {
        let rules = LifecycleRules::default();
        assert!(valid_transitions(&rules, Completed).is_empty());
        assert!(valid_transitions(&rules, Cancelled).is_empty());
    }

    #[test]
    fn nothing_returns_to_pending() {
        let rules = LifecycleRules::default();
        for status in [Pending, Confirmed, Completed, Cancelled] {
            assert!(!valid_transitions(&rules, status).contains(&Pending));
        }
    }

    #[test]
    fn strict_rules_drop_pending_to_completed() {
        let lenient = LifecycleRules::default();
        let strict = LifecycleRules {
            require_confirmation_before_completion: true,
        };

        assert!(valid_transitions(&lenient, Pending).contains(&Completed));
        assert!(!valid_transitions(&strict, Pending).contains(&Completed));
        assert!(valid_transitions(&strict, Confirmed).contains(&Completed));
    }
}

// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::messages;
use notification_cell::{NotificationDraft, NotificationOutbox};
use professional_cell::parse_slot_id;
use shared_database::SchedulingStore;
use shared_models::scheduling::{
    Appointment, AppointmentStatus, NotificationKind, Service, UserAccount, MAX_NOTES_LENGTH,
};

use crate::models::{AppointmentError, CreateAppointmentRequest};
use crate::services::conflict::{ensure_slot_free, ProfessionalLocks};

pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
    locks: Arc<ProfessionalLocks>,
    outbox: Arc<NotificationOutbox>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        locks: Arc<ProfessionalLocks>,
        outbox: Arc<NotificationOutbox>,
    ) -> Self {
        Self { store, locks, outbox }
    }

    /// Book `request.slot_id` for `client_id`. The appointment starts Pending.
    pub async fn create_appointment(
        &self,
        client_id: Uuid,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking slot {} with professional {} for client {}",
            request.slot_id, request.professional_id, client_id
        );

        let start_time = parse_slot_id(&request.slot_id).ok_or_else(|| {
            AppointmentError::InvalidArgument(format!("Invalid slot id: '{}'", request.slot_id))
        })?;

        if let Some(notes) = &request.notes {
            if notes.chars().count() > MAX_NOTES_LENGTH {
                return Err(AppointmentError::InvalidArgument(format!(
                    "Notes must be at most {} characters",
                    MAX_NOTES_LENGTH
                )));
            }
        }

        let service = self
            .store
            .get_service(request.professional_id, request.service_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| AppointmentError::NotFound(format!("Service {}", request.service_id)))?;

        let client = self
            .store
            .get_user(client_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Client {}", client_id)))?;

        if service.duration() <= Duration::zero() {
            warn!("Service {} has non-positive duration {} minutes", service.id, service.duration_minutes);
            return Err(AppointmentError::InvalidArgument(format!(
                "Service {} has no bookable duration",
                service.id
            )));
        }
        let end_time = start_time + service.duration();
        let now = Local::now().naive_local();

        let appointment = Appointment {
            id: Uuid::new_v4(),
            client_id,
            professional_id: request.professional_id,
            service_id: service.id,
            start_time,
            end_time,
            status: AppointmentStatus::Pending,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        {
            let _guard = self.locks.acquire(request.professional_id).await;

            ensure_slot_free(self.store.as_ref(), request.professional_id, start_time, end_time).await?;
            self.store.insert_appointment(&appointment).await?;
        }

        info!(
            "Appointment {} booked: professional {} from {} to {}",
            appointment.id, appointment.professional_id, start_time, end_time
        );

        self.notify_booked(&appointment, &client, &service, now).await;
        Ok(appointment)
    }

    async fn notify_booked(&self, appointment: &Appointment, client: &UserAccount, service: &Service, now: NaiveDateTime) {
        let Some(phone) = client.contact_phone() else {
            debug!("Client {} has no phone, skipping booking SMS", client.id);
            return;
        };

        let draft = NotificationDraft {
            kind: NotificationKind::BookingCreated,
            appointment_id: appointment.id,
            recipient_id: client.id,
            phone: phone.to_string(),
            message: messages::booking_created(appointment.start_time, &service.name),
            idempotency_key: None,
        };

        if let Err(e) = self.outbox.enqueue(draft, now).await {
            warn!("Could not queue booking SMS for appointment {}: {}", appointment.id, e);
        }
    }
}

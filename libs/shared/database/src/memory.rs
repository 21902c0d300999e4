// libs/shared/database/src/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::scheduling::{
    Appointment, AppointmentStatus, Availability, DeliveryStatus, EnqueueOutcome,
    NotificationIntent, Professional, Service, UserAccount,
};

use crate::store::{SchedulingStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserAccount>,
    professionals: HashMap<Uuid, Professional>,
    services: HashMap<Uuid, Service>,
    availabilities: HashMap<Uuid, Vec<Availability>>,
    appointments: HashMap<Uuid, Appointment>,
    outbox: Vec<NotificationIntent>,
}

/// Process-local store. Every write runs under one lock, which gives the
/// same all-or-nothing commit the SQL backend gets from a transaction.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserAccount) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn insert_professional(&self, professional: Professional) {
        self.tables.write().await.professionals.insert(professional.id, professional);
    }

    pub async fn insert_service(&self, service: Service) {
        self.tables.write().await.services.insert(service.id, service);
    }

    /// Writes an appointment without the overlap check, for seeding history.
    pub async fn seed_appointment(&self, appointment: Appointment) {
        self.tables.write().await.appointments.insert(appointment.id, appointment);
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        let mut all: Vec<Appointment> = self.tables.read().await.appointments.values().cloned().collect();
        all.sort_by_key(|a| a.start_time);
        all
    }

    pub async fn notifications(&self) -> Vec<NotificationIntent> {
        self.tables.read().await.outbox.clone()
    }
}

fn sorted_by_start_desc(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    appointments
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserAccount>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn get_users(&self, user_ids: &[Uuid]) -> StoreResult<Vec<UserAccount>> {
        let tables = self.tables.read().await;
        Ok(user_ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn get_professional(&self, professional_id: Uuid) -> StoreResult<Option<Professional>> {
        Ok(self.tables.read().await.professionals.get(&professional_id).cloned())
    }

    async fn get_professionals(&self, professional_ids: &[Uuid]) -> StoreResult<Vec<Professional>> {
        let tables = self.tables.read().await;
        Ok(professional_ids.iter().filter_map(|id| tables.professionals.get(id).cloned()).collect())
    }

    async fn find_professional_by_user(&self, user_id: Uuid) -> StoreResult<Option<Professional>> {
        let tables = self.tables.read().await;
        Ok(tables.professionals.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn get_service(&self, professional_id: Uuid, service_id: Uuid) -> StoreResult<Option<Service>> {
        let tables = self.tables.read().await;
        Ok(tables
            .services
            .get(&service_id)
            .filter(|s| s.professional_id == professional_id)
            .cloned())
    }

    async fn get_services(&self, service_ids: &[Uuid]) -> StoreResult<Vec<Service>> {
        let tables = self.tables.read().await;
        Ok(service_ids.iter().filter_map(|id| tables.services.get(id).cloned()).collect())
    }

    async fn list_active_services(&self, professional_id: Uuid) -> StoreResult<Vec<Service>> {
        let tables = self.tables.read().await;
        let mut services: Vec<Service> = tables
            .services
            .values()
            .filter(|s| s.professional_id == professional_id && s.is_active)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn deactivate_service(&self, professional_id: Uuid, service_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.services.get_mut(&service_id) {
            Some(service) if service.professional_id == professional_id => {
                service.is_active = false;
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("service {}", service_id))),
        }
    }

    async fn replace_availability(&self, professional_id: Uuid, entries: Vec<Availability>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let previous = tables.availabilities.insert(professional_id, entries);
        debug!(
            "Replaced {} availability rows for professional {}",
            previous.map(|p| p.len()).unwrap_or(0),
            professional_id
        );
        Ok(())
    }

    async fn list_availability(&self, professional_id: Uuid) -> StoreResult<Vec<Availability>> {
        let tables = self.tables.read().await;
        let mut entries = tables.availabilities.get(&professional_id).cloned().unwrap_or_default();
        entries.sort_by_key(|a| (a.day_of_week, a.start_time));
        Ok(entries)
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&appointment_id).cloned())
    }

    async fn find_blocking_appointments(
        &self,
        professional_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| {
                a.professional_id == professional_id
                    && a.status.blocks_slot()
                    && a.start_time >= from
                    && a.start_time < to
            })
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_time);
        Ok(found)
    }

    async fn find_overlapping_appointments(
        &self,
        professional_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .appointments
            .values()
            .filter(|a| a.professional_id == professional_id && a.status.blocks_slot() && a.overlaps(start, end))
            .cloned()
            .collect())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        if appointment.start_time >= appointment.end_time {
            return Err(StoreError::Backend(format!(
                "appointment {} ends at {} before it starts at {}",
                appointment.id, appointment.end_time, appointment.start_time
            )));
        }

        let mut tables = self.tables.write().await;

        let clash = tables.appointments.values().any(|a| {
            a.professional_id == appointment.professional_id
                && a.status.blocks_slot()
                && a.overlaps(appointment.start_time, appointment.end_time)
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "professional {} already booked between {} and {}",
                appointment.professional_id, appointment.start_time, appointment.end_time
            )));
        }

        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        updated_at: NaiveDateTime,
    ) -> StoreResult<Appointment> {
        let mut tables = self.tables.write().await;
        let appointment = tables
            .appointments
            .get_mut(&appointment_id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {}", appointment_id)))?;

        if appointment.status != expected {
            return Err(StoreError::Conflict(format!(
                "appointment {} is {}, expected {}",
                appointment_id, appointment.status, expected
            )));
        }

        appointment.status = new_status;
        appointment.updated_at = updated_at;
        Ok(appointment.clone())
    }

    async fn list_client_appointments(&self, client_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_start_desc(
            tables.appointments.values().filter(|a| a.client_id == client_id).cloned().collect(),
        ))
    }

    async fn list_professional_appointments(&self, professional_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_start_desc(
            tables
                .appointments
                .values()
                .filter(|a| a.professional_id == professional_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_appointments_starting_between(
        &self,
        status: AppointmentStatus,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.status == status && a.start_time >= from && a.start_time <= to)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_time);
        Ok(found)
    }

    async fn enqueue_notification(&self, intent: &NotificationIntent) -> StoreResult<EnqueueOutcome> {
        let mut tables = self.tables.write().await;

        if let Some(key) = intent.idempotency_key.as_deref() {
            if tables.outbox.iter().any(|n| n.idempotency_key.as_deref() == Some(key)) {
                return Ok(EnqueueOutcome::Duplicate);
            }
        }

        tables.outbox.push(intent.clone());
        Ok(EnqueueOutcome::Enqueued)
    }

    async fn due_notifications(&self, now: NaiveDateTime, limit: usize) -> StoreResult<Vec<NotificationIntent>> {
        let tables = self.tables.read().await;
        let mut due: Vec<NotificationIntent> = tables
            .outbox
            .iter()
            .filter(|n| n.status == DeliveryStatus::Pending && n.next_attempt_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|n| n.created_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn update_notification(&self, intent: &NotificationIntent) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .outbox
            .iter_mut()
            .find(|n| n.id == intent.id)
            .ok_or_else(|| StoreError::NotFound(format!("notification {}", intent.id)))?;
        *slot = intent.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared_models::scheduling::NotificationKind;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn appointment(professional_id: Uuid, start: NaiveDateTime, end: NaiveDateTime, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            professional_id,
            service_id: Uuid::new_v4(),
            start_time: start,
            end_time: end,
            status,
            notes: None,
            created_at: start,
            updated_at: start,
        }
    }

    fn intent(key: Option<&str>) -> NotificationIntent {
        NotificationIntent {
            id: Uuid::new_v4(),
            idempotency_key: key.map(str::to_string),
            kind: NotificationKind::Reminder,
            appointment_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            phone: "+15550000001".to_string(),
            message: "hello".to_string(),
            status: DeliveryStatus::Pending,
            attempts: 0,
            last_error: None,
            next_attempt_at: at(8, 0),
            created_at: at(8, 0),
            sent_at: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_overlap_but_ignores_cancelled() {
        let store = InMemoryStore::new();
        let pro = Uuid::new_v4();

        store
            .seed_appointment(appointment(pro, at(9, 0), at(10, 0), AppointmentStatus::Cancelled))
            .await;
        store
            .insert_appointment(&appointment(pro, at(9, 0), at(10, 0), AppointmentStatus::Pending))
            .await
            .unwrap();

        let clash = store
            .insert_appointment(&appointment(pro, at(9, 30), at(10, 30), AppointmentStatus::Pending))
            .await;
        assert!(matches!(clash, Err(StoreError::Conflict(_))));

        // another professional is unaffected
        store
            .insert_appointment(&appointment(Uuid::new_v4(), at(9, 30), at(10, 30), AppointmentStatus::Pending))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn insert_rejects_empty_or_inverted_range() {
        let store = InMemoryStore::new();
        let pro = Uuid::new_v4();

        let empty = store
            .insert_appointment(&appointment(pro, at(10, 0), at(10, 0), AppointmentStatus::Pending))
            .await;
        assert!(matches!(empty, Err(StoreError::Backend(_))));

        let inverted = store
            .insert_appointment(&appointment(pro, at(11, 0), at(10, 0), AppointmentStatus::Pending))
            .await;
        assert!(matches!(inverted, Err(StoreError::Backend(_))));

        assert!(store.appointments().await.is_empty());
    }

    #[tokio::test]
    async fn blocking_range_excludes_its_upper_bound() {
        let store = InMemoryStore::new();
        let pro = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let next_midnight = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let last_instant = day.and_hms_milli_opt(23, 59, 59, 500).unwrap();

        store
            .seed_appointment(appointment(pro, last_instant, next_midnight, AppointmentStatus::Confirmed))
            .await;
        store
            .seed_appointment(appointment(pro, next_midnight, next_midnight + chrono::Duration::hours(1), AppointmentStatus::Confirmed))
            .await;

        let found = store
            .find_blocking_appointments(pro, day.and_hms_opt(0, 0, 0).unwrap(), next_midnight)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start_time, last_instant);
    }

    #[tokio::test]
    async fn status_update_is_compare_and_set() {
        let store = InMemoryStore::new();
        let apt = appointment(Uuid::new_v4(), at(9, 0), at(10, 0), AppointmentStatus::Pending);
        store.seed_appointment(apt.clone()).await;

        let updated = store
            .update_appointment_status(apt.id, AppointmentStatus::Pending, AppointmentStatus::Confirmed, at(8, 0))
            .await
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Confirmed);

        let stale = store
            .update_appointment_status(apt.id, AppointmentStatus::Pending, AppointmentStatus::Cancelled, at(8, 1))
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn enqueue_deduplicates_on_key() {
        let store = InMemoryStore::new();

        assert_eq!(store.enqueue_notification(&intent(Some("reminder:1"))).await.unwrap(), EnqueueOutcome::Enqueued);
        assert_eq!(store.enqueue_notification(&intent(Some("reminder:1"))).await.unwrap(), EnqueueOutcome::Duplicate);
        assert_eq!(store.enqueue_notification(&intent(None)).await.unwrap(), EnqueueOutcome::Enqueued);
        assert_eq!(store.enqueue_notification(&intent(None)).await.unwrap(), EnqueueOutcome::Enqueued);

        assert_eq!(store.notifications().await.len(), 3);
    }

    #[tokio::test]
    async fn replace_availability_discards_previous_rows() {
        let store = InMemoryStore::new();
        let pro = Uuid::new_v4();
        let nine = at(9, 0).time();
        let noon = at(12, 0).time();

        store
            .replace_availability(pro, vec![Availability::new(pro, 3, nine, noon), Availability::new(pro, 1, nine, noon)])
            .await
            .unwrap();
        let days: Vec<u8> = store.list_availability(pro).await.unwrap().iter().map(|a| a.day_of_week).collect();
        assert_eq!(days, vec![1, 3]);

        store.replace_availability(pro, vec![Availability::new(pro, 5, nine, noon)]).await.unwrap();
        let days: Vec<u8> = store.list_availability(pro).await.unwrap().iter().map(|a| a.day_of_week).collect();
        assert_eq!(days, vec![5]);
    }
}

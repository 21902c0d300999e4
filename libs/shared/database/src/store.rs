// libs/shared/database/src/store.rs
use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use shared_models::scheduling::{
    Appointment, AppointmentStatus, Availability, EnqueueOutcome, NotificationIntent,
    Professional, Service, UserAccount,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Write rejected by constraint: {0}")]
    Conflict(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Transactional record store consumed by the scheduling core.
///
/// Implementations must make `replace_availability` a single commit and must
/// reject an `insert_appointment` whose range overlaps a non-cancelled
/// appointment of the same professional.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    // Accounts and profiles

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserAccount>>;

    async fn get_users(&self, user_ids: &[Uuid]) -> StoreResult<Vec<UserAccount>>;

    async fn get_professional(&self, professional_id: Uuid) -> StoreResult<Option<Professional>>;

    async fn get_professionals(&self, professional_ids: &[Uuid]) -> StoreResult<Vec<Professional>>;

    async fn find_professional_by_user(&self, user_id: Uuid) -> StoreResult<Option<Professional>>;

    // Service catalog

    /// Looks a service up by id scoped to its owner, active or not.
    async fn get_service(&self, professional_id: Uuid, service_id: Uuid) -> StoreResult<Option<Service>>;

    async fn get_services(&self, service_ids: &[Uuid]) -> StoreResult<Vec<Service>>;

    async fn list_active_services(&self, professional_id: Uuid) -> StoreResult<Vec<Service>>;

    async fn deactivate_service(&self, professional_id: Uuid, service_id: Uuid) -> StoreResult<()>;

    // Weekly availability

    async fn replace_availability(&self, professional_id: Uuid, entries: Vec<Availability>) -> StoreResult<()>;

    /// Entries ordered by day of week, then start time.
    async fn list_availability(&self, professional_id: Uuid) -> StoreResult<Vec<Availability>>;

    // Appointments

    async fn get_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>>;

    /// Non-cancelled appointments whose start lies in `[from, to)`.
    async fn find_blocking_appointments(
        &self,
        professional_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>>;

    /// Non-cancelled appointments strictly overlapping `[start, end)`.
    async fn find_overlapping_appointments(
        &self,
        professional_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>>;

    /// Rejects rows with `start_time >= end_time` and rows overlapping a
    /// non-cancelled appointment of the same professional.
    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()>;

    /// Compare-and-set on status. `Conflict` when the stored status is no
    /// longer `expected`.
    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        updated_at: NaiveDateTime,
    ) -> StoreResult<Appointment>;

    async fn list_client_appointments(&self, client_id: Uuid) -> StoreResult<Vec<Appointment>>;

    async fn list_professional_appointments(&self, professional_id: Uuid) -> StoreResult<Vec<Appointment>>;

    /// Appointments in `status` whose start lies in `[from, to]`.
    async fn find_appointments_starting_between(
        &self,
        status: AppointmentStatus,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>>;

    // Notification outbox

    /// Insert-if-absent on the intent's idempotency key.
    async fn enqueue_notification(&self, intent: &NotificationIntent) -> StoreResult<EnqueueOutcome>;

    /// Pending intents due at `now`, oldest first.
    async fn due_notifications(&self, now: NaiveDateTime, limit: usize) -> StoreResult<Vec<NotificationIntent>>;

    async fn update_notification(&self, intent: &NotificationIntent) -> StoreResult<()>;
}

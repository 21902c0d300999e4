// libs/shared/database/src/postgrest.rs
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::scheduling::{
    Appointment, AppointmentStatus, Availability, EnqueueOutcome, NotificationIntent,
    Professional, Service, UserAccount,
};

use crate::store::{SchedulingStore, StoreError, StoreResult};
use crate::supabase::{api_status, SupabaseClient};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// `SchedulingStore` backed by Supabase's PostgREST API.
///
/// The schema carries an exclusion constraint on `appointments` for
/// overlapping non-cancelled rows of one professional, a unique index on
/// `notification_outbox.idempotency_key`, and the
/// `replace_weekly_availability` function that swaps a professional's rows in
/// one transaction.
pub struct SupabaseStore {
    supabase: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> StoreResult<Vec<T>> {
        self.supabase
            .request::<Vec<T>>(Method::GET, path, Some(self.supabase.anon_key()), None)
            .await
            .map_err(map_error)
    }

    async fn fetch_one<T: DeserializeOwned>(&self, path: &str) -> StoreResult<Option<T>> {
        Ok(self.fetch::<T>(path).await?.into_iter().next())
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
        prefer: &'static str,
    ) -> StoreResult<T> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static(prefer));

        self.supabase
            .request_with_headers::<T>(method, path, Some(self.supabase.anon_key()), Some(body), Some(headers))
            .await
            .map_err(map_error)
    }
}

fn map_error(error: anyhow::Error) -> StoreError {
    match api_status(&error) {
        Some(409) => StoreError::Conflict(error.to_string()),
        Some(404) => StoreError::NotFound(error.to_string()),
        _ => StoreError::Backend(error.to_string()),
    }
}

fn ts(value: NaiveDateTime) -> String {
    urlencoding::encode(&value.format(TIMESTAMP_FORMAT).to_string()).into_owned()
}

fn id_list(ids: &[Uuid]) -> String {
    ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",")
}

#[async_trait]
impl SchedulingStore for SupabaseStore {
    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserAccount>> {
        self.fetch_one(&format!("/rest/v1/users?id=eq.{}", user_id)).await
    }

    async fn get_users(&self, user_ids: &[Uuid]) -> StoreResult<Vec<UserAccount>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch(&format!("/rest/v1/users?id=in.({})", id_list(user_ids))).await
    }

    async fn get_professional(&self, professional_id: Uuid) -> StoreResult<Option<Professional>> {
        self.fetch_one(&format!("/rest/v1/professionals?id=eq.{}", professional_id)).await
    }

    async fn get_professionals(&self, professional_ids: &[Uuid]) -> StoreResult<Vec<Professional>> {
        if professional_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch(&format!("/rest/v1/professionals?id=in.({})", id_list(professional_ids)))
            .await
    }

    async fn find_professional_by_user(&self, user_id: Uuid) -> StoreResult<Option<Professional>> {
        self.fetch_one(&format!("/rest/v1/professionals?user_id=eq.{}", user_id)).await
    }

    async fn get_service(&self, professional_id: Uuid, service_id: Uuid) -> StoreResult<Option<Service>> {
        self.fetch_one(&format!(
            "/rest/v1/services?id=eq.{}&professional_id=eq.{}",
            service_id, professional_id
        ))
        .await
    }

    async fn get_services(&self, service_ids: &[Uuid]) -> StoreResult<Vec<Service>> {
        if service_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch(&format!("/rest/v1/services?id=in.({})", id_list(service_ids))).await
    }

    async fn list_active_services(&self, professional_id: Uuid) -> StoreResult<Vec<Service>> {
        self.fetch(&format!(
            "/rest/v1/services?professional_id=eq.{}&is_active=eq.true&order=name.asc",
            professional_id
        ))
        .await
    }

    async fn deactivate_service(&self, professional_id: Uuid, service_id: Uuid) -> StoreResult<()> {
        let path = format!(
            "/rest/v1/services?id=eq.{}&professional_id=eq.{}",
            service_id, professional_id
        );
        let updated: Vec<Service> = self
            .write(Method::PATCH, &path, json!({ "is_active": false }), "return=representation")
            .await?;

        if updated.is_empty() {
            return Err(StoreError::NotFound(format!("service {}", service_id)));
        }
        Ok(())
    }

    async fn replace_availability(&self, professional_id: Uuid, entries: Vec<Availability>) -> StoreResult<()> {
        debug!("Replacing {} availability rows for professional {}", entries.len(), professional_id);

        let body = json!({
            "p_professional_id": professional_id,
            "p_entries": entries,
        });

        self.supabase
            .request::<Value>(
                Method::POST,
                "/rest/v1/rpc/replace_weekly_availability",
                Some(self.supabase.anon_key()),
                Some(body),
            )
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn list_availability(&self, professional_id: Uuid) -> StoreResult<Vec<Availability>> {
        self.fetch(&format!(
            "/rest/v1/availabilities?professional_id=eq.{}&order=day_of_week.asc,start_time.asc",
            professional_id
        ))
        .await
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Appointment>> {
        self.fetch_one(&format!("/rest/v1/appointments?id=eq.{}", appointment_id)).await
    }

    async fn find_blocking_appointments(
        &self,
        professional_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        self.fetch(&format!(
            "/rest/v1/appointments?professional_id=eq.{}&status=neq.cancelled&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            professional_id,
            ts(from),
            ts(to)
        ))
        .await
    }

    async fn find_overlapping_appointments(
        &self,
        professional_id: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        self.fetch(&format!(
            "/rest/v1/appointments?professional_id=eq.{}&status=neq.cancelled&start_time=lt.{}&end_time=gt.{}",
            professional_id,
            ts(end),
            ts(start)
        ))
        .await
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        let body = serde_json::to_value(appointment).map_err(|e| StoreError::Backend(e.to_string()))?;
        let _: Value = self
            .write(Method::POST, "/rest/v1/appointments", body, "return=minimal")
            .await?;
        Ok(())
    }

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
        updated_at: NaiveDateTime,
    ) -> StoreResult<Appointment> {
        let path = format!("/rest/v1/appointments?id=eq.{}&status=eq.{}", appointment_id, expected);
        let body = json!({
            "status": new_status,
            "updated_at": updated_at,
        });

        let updated: Vec<Appointment> = self
            .write(Method::PATCH, &path, body, "return=representation")
            .await?;

        if let Some(appointment) = updated.into_iter().next() {
            return Ok(appointment);
        }

        // Nothing matched: either the row is gone or its status moved on.
        match self.get_appointment(appointment_id).await? {
            Some(current) => {
                warn!(
                    "Status update on {} lost the race: now {}, expected {}",
                    appointment_id, current.status, expected
                );
                Err(StoreError::Conflict(format!(
                    "appointment {} is {}, expected {}",
                    appointment_id, current.status, expected
                )))
            }
            None => Err(StoreError::NotFound(format!("appointment {}", appointment_id))),
        }
    }

    async fn list_client_appointments(&self, client_id: Uuid) -> StoreResult<Vec<Appointment>> {
        self.fetch(&format!(
            "/rest/v1/appointments?client_id=eq.{}&order=start_time.desc",
            client_id
        ))
        .await
    }

    async fn list_professional_appointments(&self, professional_id: Uuid) -> StoreResult<Vec<Appointment>> {
        self.fetch(&format!(
            "/rest/v1/appointments?professional_id=eq.{}&order=start_time.desc",
            professional_id
        ))
        .await
    }

    async fn find_appointments_starting_between(
        &self,
        status: AppointmentStatus,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> StoreResult<Vec<Appointment>> {
        self.fetch(&format!(
            "/rest/v1/appointments?status=eq.{}&start_time=gte.{}&start_time=lte.{}&order=start_time.asc",
            status,
            ts(from),
            ts(to)
        ))
        .await
    }

    async fn enqueue_notification(&self, intent: &NotificationIntent) -> StoreResult<EnqueueOutcome> {
        let body = serde_json::to_value(intent).map_err(|e| StoreError::Backend(e.to_string()))?;

        if intent.idempotency_key.is_none() {
            let _: Value = self
                .write(Method::POST, "/rest/v1/notification_outbox", body, "return=minimal")
                .await?;
            return Ok(EnqueueOutcome::Enqueued);
        }

        let inserted: Vec<Value> = self
            .write(
                Method::POST,
                "/rest/v1/notification_outbox?on_conflict=idempotency_key",
                body,
                "resolution=ignore-duplicates,return=representation",
            )
            .await?;

        if inserted.is_empty() {
            Ok(EnqueueOutcome::Duplicate)
        } else {
            Ok(EnqueueOutcome::Enqueued)
        }
    }

    async fn due_notifications(&self, now: NaiveDateTime, limit: usize) -> StoreResult<Vec<NotificationIntent>> {
        self.fetch(&format!(
            "/rest/v1/notification_outbox?status=eq.pending&next_attempt_at=lte.{}&order=created_at.asc&limit={}",
            ts(now),
            limit
        ))
        .await
    }

    async fn update_notification(&self, intent: &NotificationIntent) -> StoreResult<()> {
        let body = json!({
            "status": intent.status,
            "attempts": intent.attempts,
            "last_error": intent.last_error,
            "next_attempt_at": intent.next_attempt_at,
            "sent_at": intent.sent_at,
        });

        let updated: Vec<Value> = self
            .write(
                Method::PATCH,
                &format!("/rest/v1/notification_outbox?id=eq.{}", intent.id),
                body,
                "return=representation",
            )
            .await?;

        if updated.is_empty() {
            return Err(StoreError::NotFound(format!("notification {}", intent.id)));
        }
        Ok(())
    }
}

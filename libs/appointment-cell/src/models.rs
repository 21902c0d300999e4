// libs/appointment-cell/src/models.rs
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::scheduling::{AppointmentStatus, Professional, Service, UserAccount};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub professional_id: Uuid,
    pub service_id: Uuid,
    /// The `id` of a slot returned by the slots endpoint.
    pub slot_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// ==============================================================================
// READ MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfessionalSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub category: String,
    pub rating: f64,
    pub review_count: i32,
}

impl ProfessionalSummary {
    pub fn new(professional: &Professional, account: Option<&UserAccount>) -> Self {
        Self {
            id: professional.id,
            first_name: account.map(|a| a.first_name.clone()).unwrap_or_default(),
            last_name: account.map(|a| a.last_name.clone()).unwrap_or_default(),
            email: account.map(|a| a.email.clone()).unwrap_or_default(),
            phone: account.and_then(|a| a.phone.clone()),
            bio: professional.bio.clone(),
            category: professional.category.clone(),
            rating: professional.rating,
            review_count: professional.review_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceSummary {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i32,
}

impl From<&Service> for ServiceSummary {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id,
            professional_id: service.professional_id,
            name: service.name.clone(),
            description: service.description.clone(),
            price: service.price,
            duration_minutes: service.duration_minutes,
        }
    }
}

/// Read-only projection of an appointment with its related records resolved.
/// Related records that no longer exist are left empty.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentView {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub professional: Option<ProfessionalSummary>,
    pub service: Option<ServiceSummary>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub today: usize,
    pub upcoming: usize,
    pub total: usize,
    pub completed: usize,
}

// ==============================================================================
// RULES AND SETTINGS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleRules {
    /// Drops the Pending -> Completed edge.
    pub require_confirmation_before_completion: bool,
}

impl LifecycleRules {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            require_confirmation_before_completion: config.require_confirmation_before_completion,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReminderSettings {
    pub lead: Duration,
    pub window: Duration,
    pub interval: StdDuration,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            lead: Duration::hours(24),
            window: Duration::minutes(30),
            interval: StdDuration::from_secs(60 * 60),
        }
    }
}

impl ReminderSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            lead: Duration::minutes(config.reminder_lead_minutes),
            window: Duration::minutes(config.reminder_window_minutes.max(0)),
            interval: StdDuration::from_secs(config.reminder_interval_minutes.max(1) * 60),
        }
    }

    /// Inclusive start range selected by a sweep at `now`.
    pub fn window_at(&self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        let target = now + self.lead;
        (target - self.window, target + self.window)
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub enqueued: usize,
    pub already_sent: usize,
    pub skipped_no_contact: usize,
    pub failed: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppointmentError::NotFound(what),
            StoreError::Conflict(msg) => AppointmentError::Conflict(msg),
            StoreError::Backend(msg) => {
                error!("Store failure in appointment cell: {}", msg);
                AppointmentError::Internal(msg)
            }
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::InvalidArgument(msg) => AppError::BadRequest(msg),
            AppointmentError::Conflict(msg) => AppError::Conflict(msg),
            AppointmentError::InvalidState(msg) => AppError::InvalidState(msg),
            AppointmentError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn default_window_spans_an_hour_around_one_day_out() {
        let now = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let (from, to) = ReminderSettings::default().window_at(now);

        assert_eq!(from, now + Duration::hours(23) + Duration::minutes(30));
        assert_eq!(to, now + Duration::hours(24) + Duration::minutes(30));
    }
}

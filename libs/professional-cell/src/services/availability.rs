use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::auth::Actor;
use shared_models::scheduling::Availability;

use crate::error::ProfessionalError;
use crate::models::{parse_time_of_day, AvailabilityInput};
use crate::services::ownership::require_owner;

pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Replace the professional's whole weekly pattern. Every entry is
    /// validated before anything is written.
    pub async fn set_weekly_availability(
        &self,
        actor: &Actor,
        professional_id: Uuid,
        entries: Vec<AvailabilityInput>,
    ) -> Result<Vec<Availability>, ProfessionalError> {
        debug!("Setting {} availability entries for professional {}", entries.len(), professional_id);

        require_owner(self.store.as_ref(), actor, professional_id).await?;

        let validated = entries
            .iter()
            .map(|entry| validate_entry(professional_id, entry))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| warn!("Rejected availability for {}: {}", professional_id, e))?;

        self.store
            .replace_availability(professional_id, validated)
            .await?;

        info!("Weekly availability replaced for professional {}", professional_id);
        self.get_weekly_availability(professional_id).await
    }

    /// Entries ordered by day, then start.
    pub async fn get_weekly_availability(&self, professional_id: Uuid) -> Result<Vec<Availability>, ProfessionalError> {
        Ok(self.store.list_availability(professional_id).await?)
    }
}

fn validate_entry(professional_id: Uuid, entry: &AvailabilityInput) -> Result<Availability, ProfessionalError> {
    // Validate day of week (0-6)
    if !(0..=6).contains(&entry.day_of_week) {
        return Err(ProfessionalError::InvalidArgument(
            "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }

    let start_time = parse_time_of_day(&entry.start_time)?;
    let end_time = parse_time_of_day(&entry.end_time)?;

    if start_time >= end_time {
        return Err(ProfessionalError::InvalidArgument(
            "Start time must be before end time".to_string(),
        ));
    }

    Ok(Availability::new(professional_id, entry.day_of_week as u8, start_time, end_time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(day: i32, start: &str, end: &str) -> AvailabilityInput {
        AvailabilityInput {
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[test]
    fn rejects_out_of_range_day() {
        assert!(validate_entry(Uuid::new_v4(), &input(7, "09:00", "12:00")).is_err());
        assert!(validate_entry(Uuid::new_v4(), &input(-1, "09:00", "12:00")).is_err());
    }

    #[test]
    fn rejects_empty_or_inverted_window() {
        assert!(validate_entry(Uuid::new_v4(), &input(1, "12:00", "12:00")).is_err());
        assert!(validate_entry(Uuid::new_v4(), &input(1, "13:00", "12:00")).is_err());
    }

    #[test]
    fn accepts_mixed_precision() {
        let entry = validate_entry(Uuid::new_v4(), &input(0, "09:00", "12:30:00")).unwrap();
        assert_eq!(entry.day_of_week, 0);
        assert_eq!(entry.end_time.to_string(), "12:30:00");
    }
}

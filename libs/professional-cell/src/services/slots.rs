use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::scheduling::{day_of_week, Appointment, Availability};

use crate::error::ProfessionalError;
use crate::models::TimeSlot;

pub struct SlotService {
    store: Arc<dyn SchedulingStore>,
}

impl SlotService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Calculate the bookable slots of one service on one date.
    pub async fn get_available_slots(
        &self,
        professional_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, ProfessionalError> {
        let service = self
            .store
            .get_service(professional_id, service_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| ProfessionalError::NotFound(format!("Service {}", service_id)))?;

        let dow = day_of_week(date);
        let windows: Vec<Availability> = self
            .store
            .list_availability(professional_id)
            .await?
            .into_iter()
            .filter(|a| a.day_of_week == dow)
            .collect();

        if windows.is_empty() {
            debug!("Professional {} has no availability on day {}", professional_id, dow);
            return Ok(Vec::new());
        }

        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = date
            .succ_opt()
            .map(|next| next.and_time(NaiveTime::MIN))
            .unwrap_or(NaiveDateTime::MAX);
        let booked = self
            .store
            .find_blocking_appointments(professional_id, day_start, day_end)
            .await?;

        let slots = generate_slots(date, &windows, service.duration(), &booked);
        debug!(
            "Generated {} slots for professional {} on {} ({} booked)",
            slots.len(),
            professional_id,
            date,
            booked.len()
        );

        Ok(slots)
    }
}

/// Walk every window in start order in steps of `duration`. A slot must fit
/// entirely inside its window; a start already produced by an earlier window
/// is skipped. A slot is unavailable when it strictly overlaps any of
/// `booked`.
pub fn generate_slots(
    date: NaiveDate,
    windows: &[Availability],
    duration: Duration,
    booked: &[Appointment],
) -> Vec<TimeSlot> {
    if duration <= Duration::zero() {
        return Vec::new();
    }

    let mut ordered: Vec<&Availability> = windows.iter().collect();
    ordered.sort_by_key(|w| (w.start_time, w.end_time));

    let mut slots = BTreeMap::new();

    for window in ordered {
        let end = date.and_time(window.end_time);
        let mut current = date.and_time(window.start_time);

        while current + duration <= end {
            let slot_end = current + duration;

            slots.entry(current).or_insert_with(|| {
                let taken = booked.iter().any(|apt| apt.overlaps(current, slot_end));
                TimeSlot::new(current, slot_end, !taken)
            });

            current = slot_end;
        }
    }

    slots.into_values().collect()
}

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProfessionalError;

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// One weekly window as submitted by a professional. Times are `HH:MM` or
/// `HH:MM:SS`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvailabilityInput {
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Deserialize)]
pub struct SetAvailabilityRequest {
    pub availabilities: Vec<AvailabilityInput>,
}

pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, ProfessionalError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| ProfessionalError::InvalidArgument(format!("Invalid time of day: '{}'", raw)))
}

// ==============================================================================
// SLOTS
// ==============================================================================

const SLOT_ID_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A candidate booking interval on one date. `id` is the start timestamp,
/// which is also what a client submits to book it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub is_available: bool,
}

impl TimeSlot {
    pub fn new(start_time: NaiveDateTime, end_time: NaiveDateTime, is_available: bool) -> Self {
        Self {
            id: format_slot_id(start_time),
            start_time,
            end_time,
            is_available,
        }
    }
}

pub fn format_slot_id(start: NaiveDateTime) -> String {
    start.format(SLOT_ID_FORMAT).to_string()
}

/// Parse a slot id back into its start. RFC 3339 input with an offset is
/// also accepted; its wall-clock part is used.
pub fn parse_slot_id(slot_id: &str) -> Option<NaiveDateTime> {
    let raw = slot_id.trim();
    NaiveDateTime::parse_from_str(raw, SLOT_ID_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub service_id: Uuid,
    pub date: NaiveDate,
}

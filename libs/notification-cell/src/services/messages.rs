// SMS bodies sent to clients.
use chrono::NaiveDateTime;

pub fn booking_created(start: NaiveDateTime, service_name: &str) -> String {
    format!(
        "Your appointment is booked for {} at {} ({}).",
        start.format("%d/%m/%Y"),
        start.format("%H:%M"),
        service_name
    )
}

pub fn booking_cancelled(start: NaiveDateTime, service_name: &str) -> String {
    format!(
        "Your appointment on {} at {} for {} has been cancelled.",
        start.format("%d/%m/%Y"),
        start.format("%H:%M"),
        service_name
    )
}

pub fn reminder(start: NaiveDateTime, service_name: &str) -> String {
    format!(
        "Reminder: your appointment is tomorrow, {} at {}, for {}. See you soon!",
        start.format("%d/%m/%Y"),
        start.format("%H:%M"),
        service_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn renders_day_first_date_and_short_time() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap().and_hms_opt(9, 5, 0).unwrap();
        assert_eq!(
            booking_created(start, "Haircut"),
            "Your appointment is booked for 04/06/2024 at 09:05 (Haircut)."
        );
    }
}

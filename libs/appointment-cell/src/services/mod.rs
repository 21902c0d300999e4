pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod query;
pub mod reminder;

use std::sync::Arc;

use notification_cell::NotificationOutbox;
use shared_config::AppConfig;
use shared_database::SchedulingStore;

pub use booking::BookingService;
pub use conflict::ProfessionalLocks;
pub use lifecycle::{valid_transitions, LifecycleService};
pub use query::AppointmentQueryService;
pub use reminder::ReminderSweeper;

use crate::models::LifecycleRules;

/// Services shared by every appointment request. Booking locks live here so
/// that all requests contend on the same per-professional mutexes.
pub struct AppointmentServices {
    pub booking: BookingService,
    pub lifecycle: LifecycleService,
    pub queries: AppointmentQueryService,
}

impl AppointmentServices {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &AppConfig) -> Self {
        let outbox = Arc::new(NotificationOutbox::new(store.clone()));

        Self {
            booking: BookingService::new(store.clone(), Arc::new(ProfessionalLocks::new()), outbox.clone()),
            lifecycle: LifecycleService::new(store.clone(), outbox, LifecycleRules::from_app_config(config)),
            queries: AppointmentQueryService::new(store),
        }
    }
}

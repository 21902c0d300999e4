pub mod availability;
pub mod catalog;
pub mod ownership;
pub mod slots;

pub use availability::AvailabilityService;
pub use catalog::CatalogService;
pub use slots::{generate_slots, SlotService};

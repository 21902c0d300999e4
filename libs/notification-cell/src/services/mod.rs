pub mod dispatcher;
pub mod messages;
pub mod outbox;
pub mod sms;

pub use dispatcher::*;
pub use outbox::*;
pub use sms::*;

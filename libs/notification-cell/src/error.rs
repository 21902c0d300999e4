use thiserror::Error;

use shared_database::StoreError;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("SMS delivery failed: {0}")]
    Delivery(String),

    #[error("SMS provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Outbox store error: {0}")]
    Store(#[from] StoreError),
}

use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Serialize;

use shared_config::AppConfig;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub batch_size: usize,
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `retry_delay * n`.
    pub retry_delay: Duration,
    pub poll_interval: StdDuration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_attempts: 5,
            retry_delay: Duration::seconds(60),
            poll_interval: StdDuration::from_secs(15),
        }
    }
}

impl DispatcherConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.dispatcher_batch_size.max(1),
            max_attempts: config.notification_max_attempts.max(1),
            retry_delay: Duration::seconds(config.notification_retry_delay_seconds.max(0)),
            poll_interval: StdDuration::from_secs(config.dispatcher_poll_seconds.max(1)),
        }
    }

    pub fn backoff(&self, attempts: u32) -> Duration {
        self.retry_delay * attempts as i32
    }
}

/// Outcome counts of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub base_url: String,
}

impl TwilioSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            base_url: config.twilio_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

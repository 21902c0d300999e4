use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::TwilioSettings;

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, phone: &str, text: &str) -> Result<(), NotificationError>;
}

/// Sends through the Twilio Messages API. Without credentials every send is
/// logged and skipped.
pub struct TwilioSmsSender {
    client: Client,
    settings: TwilioSettings,
}

impl TwilioSmsSender {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_settings(TwilioSettings::from_app_config(config))
    }

    pub fn with_settings(settings: TwilioSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.settings.base_url, self.settings.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send_sms(&self, phone: &str, text: &str) -> Result<(), NotificationError> {
        if !self.settings.is_configured() {
            warn!("Twilio not configured, SMS to {} skipped: {}", phone, text);
            return Ok(());
        }

        debug!("Sending SMS to {}", phone);

        let params = [
            ("To", phone),
            ("From", self.settings.from_number.as_str()),
            ("Body", text),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("SMS sent to {}", phone);
        Ok(())
    }
}

/// In-process sender that records every message. Numbers listed in
/// `failing` are rejected.
#[derive(Default)]
pub struct RecordingSmsSender {
    sent: Mutex<Vec<(String, String)>>,
    failing: Vec<String>,
}

impl RecordingSmsSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(numbers: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: numbers.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl SmsSender for RecordingSmsSender {
    async fn send_sms(&self, phone: &str, text: &str) -> Result<(), NotificationError> {
        if self.failing.iter().any(|n| n == phone) {
            return Err(NotificationError::Delivery(format!("unreachable number {}", phone)));
        }

        self.sent.lock().await.push((phone.to_string(), text.to_string()));
        Ok(())
    }
}

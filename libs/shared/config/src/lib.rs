use std::env;
use std::str::FromStr;
use tracing::warn;

/// Which record store backs the scheduling core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub twilio_base_url: String,
    pub server_port: u16,
    pub reminder_interval_minutes: u64,
    pub reminder_lead_minutes: i64,
    pub reminder_window_minutes: i64,
    pub dispatcher_poll_seconds: u64,
    pub dispatcher_batch_size: usize,
    pub notification_max_attempts: u32,
    pub notification_retry_delay_seconds: i64,
    pub require_confirmation_before_completion: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            store_backend: StoreBackend::Memory,
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_from_number: String::new(),
            twilio_base_url: "https://api.twilio.com".to_string(),
            server_port: 3000,
            reminder_interval_minutes: 60,
            reminder_lead_minutes: 24 * 60,
            reminder_window_minutes: 30,
            dispatcher_poll_seconds: 15,
            dispatcher_batch_size: 50,
            notification_max_attempts: 5,
            notification_retry_delay_seconds: 60,
            require_confirmation_before_completion: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("supabase") => StoreBackend::Supabase,
            Ok("memory") => StoreBackend::Memory,
            Ok(other) => {
                warn!("Unknown STORE_BACKEND '{}', using in-memory store", other);
                StoreBackend::Memory
            }
            Err(_) => {
                warn!("STORE_BACKEND not set, using in-memory store");
                StoreBackend::Memory
            }
        };

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            store_backend,
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID")
                .unwrap_or_else(|_| {
                    warn!("TWILIO_ACCOUNT_SID not set, SMS delivery disabled");
                    String::new()
                }),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_from_number: env::var("TWILIO_FROM_NUMBER").unwrap_or_default(),
            twilio_base_url: env::var("TWILIO_BASE_URL")
                .unwrap_or(defaults.twilio_base_url),
            server_port: parse_or("PORT", defaults.server_port),
            reminder_interval_minutes: parse_or("REMINDER_INTERVAL_MINUTES", defaults.reminder_interval_minutes),
            reminder_lead_minutes: parse_or("REMINDER_LEAD_MINUTES", defaults.reminder_lead_minutes),
            reminder_window_minutes: parse_or("REMINDER_WINDOW_MINUTES", defaults.reminder_window_minutes),
            dispatcher_poll_seconds: parse_or("DISPATCHER_POLL_SECONDS", defaults.dispatcher_poll_seconds),
            dispatcher_batch_size: parse_or("DISPATCHER_BATCH_SIZE", defaults.dispatcher_batch_size),
            notification_max_attempts: parse_or("NOTIFICATION_MAX_ATTEMPTS", defaults.notification_max_attempts),
            notification_retry_delay_seconds: parse_or(
                "NOTIFICATION_RETRY_DELAY_SECONDS",
                defaults.notification_retry_delay_seconds,
            ),
            require_confirmation_before_completion: parse_or(
                "REQUIRE_CONFIRMATION_BEFORE_COMPLETION",
                defaults.require_confirmation_before_completion,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        let store_ready = match self.store_backend {
            StoreBackend::Memory => true,
            StoreBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
            }
        };

        store_ready && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_sms_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_from_number.is_empty()
    }
}

fn parse_or<T: FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reminder_window_brackets_one_day() {
        let config = AppConfig::default();
        assert_eq!(config.reminder_lead_minutes, 1440);
        assert_eq!(config.reminder_window_minutes, 30);
        assert_eq!(config.reminder_interval_minutes, 60);
    }

    #[test]
    fn memory_backend_only_needs_jwt_secret() {
        let mut config = AppConfig::default();
        assert!(!config.is_configured());

        config.supabase_jwt_secret = "secret".to_string();
        assert!(config.is_configured());

        config.store_backend = StoreBackend::Supabase;
        assert!(!config.is_configured());
    }

    #[test]
    fn sms_requires_all_twilio_fields() {
        let mut config = AppConfig::default();
        config.twilio_account_sid = "AC123".to_string();
        config.twilio_auth_token = "token".to_string();
        assert!(!config.is_sms_configured());

        config.twilio_from_number = "+15550000000".to_string();
        assert!(config.is_sms_configured());
    }
}

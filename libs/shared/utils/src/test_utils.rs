use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::InMemoryStore;
use shared_models::auth::{Actor, User};
use shared_models::scheduling::{ActorRole, Professional, Service, UserAccount};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ..Default::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, "client")
    }

    pub fn professional(email: &str) -> Self {
        Self::new(email, "professional")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }

    /// Panics for roles other than client and professional.
    pub fn actor(&self) -> Actor {
        match self.role.parse::<ActorRole>() {
            Ok(role) => Actor { id: self.id, role },
            Err(e) => panic!("test user has no actor role: {}", e),
        }
    }

    pub fn to_account(&self, phone: Option<&str>) -> UserAccount {
        let role = self.role.parse::<ActorRole>().unwrap_or(ActorRole::Client);
        UserAccount {
            id: self.id,
            email: self.email.clone(),
            first_name: "Test".to_string(),
            last_name: role.to_string(),
            phone: phone.map(str::to_string),
            role,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(
            json!({
                "sub": user.id,
                "email": user.email,
                "role": user.role,
                "iat": now.timestamp(),
                "exp": exp.timestamp()
            }),
            secret,
        )
    }

    /// Token shaped like Supabase issues them: the top-level role is
    /// `authenticated` and the application role sits in `user_metadata`.
    pub fn create_supabase_token(user: &TestUser, secret: &str) -> String {
        let now = Utc::now();

        Self::sign(
            json!({
                "sub": user.id,
                "email": user.email,
                "role": "authenticated",
                "aud": "authenticated",
                "user_metadata": { "role": user.role },
                "iat": now.timestamp(),
                "exp": (now + Duration::hours(1)).timestamp()
            }),
            secret,
        )
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    fn sign(payload: Value, secret: &str) -> String {
        let header = json!({ "alg": "HS256", "typ": "JWT" });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }
}

/// A seeded in-memory store with one professional offering one 60 minute
/// service and one client with a phone number.
pub struct SchedulingFixture {
    pub store: Arc<InMemoryStore>,
    pub client: TestUser,
    pub professional_user: TestUser,
    pub professional: Professional,
    pub service: Service,
}

impl SchedulingFixture {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());

        let client = TestUser::client("client@example.com");
        let professional_user = TestUser::professional("pro@example.com");
        let professional = Professional::new(professional_user.id, "hair");
        let service = Service::new(professional.id, "Haircut", 40.0, 60);

        store.insert_user(client.to_account(Some("+15550000001"))).await;
        store.insert_user(professional_user.to_account(Some("+15550000002"))).await;
        store.insert_professional(professional.clone()).await;
        store.insert_service(service.clone()).await;

        Self {
            store,
            client,
            professional_user,
            professional,
            service,
        }
    }

    /// Adds another client account, with or without a phone.
    pub async fn add_client(&self, email: &str, phone: Option<&str>) -> TestUser {
        let user = TestUser::client(email);
        self.store.insert_user(user.to_account(phone)).await;
        user
    }

    /// Adds a second professional with one service.
    pub async fn add_professional(&self, email: &str, duration_minutes: i32) -> (TestUser, Professional, Service) {
        let user = TestUser::professional(email);
        let professional = Professional::new(user.id, "nails");
        let service = Service::new(professional.id, "Manicure", 25.0, duration_minutes);

        self.store.insert_user(user.to_account(None)).await;
        self.store.insert_professional(professional.clone()).await;
        self.store.insert_service(service.clone()).await;

        (user, professional, service)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::scheduling::ActorRole;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Identity verified by the auth middleware and stored in request extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

/// The acting user passed explicitly into every core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn client(id: Uuid) -> Self {
        Self { id, role: ActorRole::Client }
    }

    pub fn professional(id: Uuid) -> Self {
        Self { id, role: ActorRole::Professional }
    }
}

impl User {
    /// Turns the token identity into an [`Actor`]. Tokens without a usable
    /// subject or role are rejected.
    pub fn actor(&self) -> Result<Actor, AppError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;

        let role = self
            .role
            .as_deref()
            .and_then(|r| r.parse::<ActorRole>().ok())
            .ok_or_else(|| AppError::Forbidden("Token carries no client or professional role".to_string()))?;

        Ok(Actor { id, role })
    }
}

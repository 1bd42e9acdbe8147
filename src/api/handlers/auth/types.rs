//! Records and request/response types for admin auth.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Administrator row as stored, including the password hash.
///
/// Never serialized; convert into [`AuthAdmin`] before it leaves the service.
#[derive(Clone, Debug)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Administrator as exposed to handlers and clients.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthAdmin {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Admin> for AuthAdmin {
    fn from(admin: Admin) -> Self {
        let Admin {
            id,
            username,
            email,
            password_hash: _,
            first_name,
            last_name,
            is_active,
            created_at,
            updated_at,
        } = admin;
        Self {
            id,
            username,
            email,
            first_name,
            last_name,
            is_active,
            created_at,
            updated_at,
        }
    }
}

/// Session row keyed by the SHA-256 digest of the client token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub token_hash: Vec<u8>,
    pub admin_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Freshly issued session; `token` is the raw cookie value and is never stored.
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub token: String,
    pub admin_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Input for provisioning an administrator.
#[derive(Debug)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Login payload. Not `Debug` so the plaintext password never reaches logs.
#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    pub admin: AuthAdmin,
    pub message: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
    /// Rotated whenever the password changes; invalidates outstanding reset tokens.
    #[serde(skip_serializing)]
    pub security_stamp: Uuid,
    pub created_at: i64,
}

use crate::models::User;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub created_at: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            is_active: user.is_active,
            is_verified: user.is_verified,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostAuthorRead {
    pub id: Uuid,
    pub username: String,
}

/// Externally visible post, with author and reaction tallies resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRead {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub preview_image_url: Option<String>,
    pub author: PostAuthorRead,
    pub is_pinned: bool,
    pub edited_at: Option<i64>,
    pub created_at: i64,
    /// One entry per configured reaction kind, zero included.
    pub reactions: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct PostReadList {
    pub posts: Vec<PostRead>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostReactionRead {
    pub reaction: Option<String>,
    pub is_added: bool,
    pub is_changed: bool,
    pub is_removed: bool,
}

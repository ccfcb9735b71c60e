use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    /// File name relative to the post images directory
    pub preview_image_path: Option<String>,
    pub is_pinned: bool,
    pub edited_at: Option<i64>,
    pub created_at: i64,
}

/// A post before the store has given it an id and creation time.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub preview_image_path: Option<String>,
}

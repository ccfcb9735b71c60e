// Storage seams. Handlers and services only see these traits; the in-memory
// DashMap backend and the on-disk image store are the shipped implementations.
mod images;
mod memory;

pub use images::DiskImageStore;
pub use memory::MemoryStore;

use crate::models::{NewPost, Post, PostReaction, User};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken (case-insensitive).
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Replaces the stored user with the same id. Username and email are kept
    /// from the stored record. Returns `None` if there is no such user.
    async fn update(&self, user: User) -> Result<Option<User>, StoreError>;

    /// Looks a user up by email or username, ignoring case.
    async fn get_by_email_or_username(&self, login: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Assigns id and creation time.
    async fn insert(&self, post: NewPost) -> Result<Post, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

    /// Replaces the stored post with the same id. `created_at` is kept from the
    /// stored record. Returns `None` if there is no such post.
    async fn update(&self, post: Post) -> Result<Option<Post>, StoreError>;

    /// Posts in insertion order.
    async fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<Post>, StoreError>;
}

/// At most one reaction exists per (user, post); implementations enforce it
/// with the storage key rather than relying on callers.
#[async_trait]
pub trait ReactionStore: Send + Sync {
    async fn find(&self, user_id: Uuid, post_id: Uuid)
    -> Result<Option<PostReaction>, StoreError>;

    async fn count_by_kind(&self, post_id: Uuid, kind: &str) -> Result<u64, StoreError>;

    /// Sets the user's reaction on a post and returns the record it replaced.
    async fn upsert(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        kind: &str,
    ) -> Result<Option<PostReaction>, StoreError>;

    /// Removes exactly this record. Returns `false` if it was already gone.
    async fn delete(&self, reaction: &PostReaction) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Writes the image and returns its path relative to the images directory.
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, StoreError>;

    async fn remove(&self, path: &str) -> Result<(), StoreError>;
}

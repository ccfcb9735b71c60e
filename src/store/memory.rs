use super::{PostStore, ReactionStore, StoreError, UserStore};
use crate::models::{NewPost, Post, PostReaction, User};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use uuid::Uuid;

/// `DashMap`-backed storage for users, posts and reactions.
///
/// Cloning is cheap: every clone shares the same maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<Uuid, User>>,
    username_index: Arc<DashMap<String, Uuid>>, // lowercased username
    email_index: Arc<DashMap<String, Uuid>>,    // lowercased email
    // Sequence number keeps listing in insertion order.
    posts: Arc<DashMap<Uuid, (u64, Post)>>,
    next_post_seq: Arc<AtomicU64>,
    // post_id -> user_id -> reaction. The inner key allows one reaction per
    // user per post, and tallies only walk the post's own map.
    reactions: Arc<DashMap<Uuid, DashMap<Uuid, PostReaction>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let Entry::Vacant(name_slot) = self.username_index.entry(user.username.to_lowercase())
        else {
            return Err(StoreError::Conflict(format!(
                "username {} is taken",
                user.username
            )));
        };
        let Entry::Vacant(email_slot) = self.email_index.entry(user.email.to_lowercase()) else {
            return Err(StoreError::Conflict(format!(
                "email {} is registered",
                user.email
            )));
        };

        name_slot.insert(user.id);
        email_slot.insert(user.id);
        self.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn update(&self, mut user: User) -> Result<Option<User>, StoreError> {
        let Some(mut stored) = self.users.get_mut(&user.id) else {
            return Ok(None);
        };

        // the lookup indexes stay valid only if these never change
        user.username = stored.username.clone();
        user.email = stored.email.clone();
        *stored = user.clone();

        Ok(Some(user))
    }

    async fn get_by_email_or_username(&self, login: &str) -> Result<Option<User>, StoreError> {
        let key = login.to_lowercase();
        let id = self
            .email_index
            .get(&key)
            .or_else(|| self.username_index.get(&key))
            .map(|id| *id);

        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert(&self, post: NewPost) -> Result<Post, StoreError> {
        let post = Post {
            id: Uuid::new_v4(),
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            preview_image_path: post.preview_image_path,
            is_pinned: false,
            edited_at: None,
            created_at: Utc::now().timestamp(),
        };

        let seq = self.next_post_seq.fetch_add(1, Ordering::Relaxed);
        self.posts.insert(post.id, (seq, post.clone()));

        Ok(post)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.get(&id).map(|entry| entry.1.clone()))
    }

    async fn update(&self, mut post: Post) -> Result<Option<Post>, StoreError> {
        let Some(mut entry) = self.posts.get_mut(&post.id) else {
            return Ok(None);
        };

        post.created_at = entry.1.created_at;
        entry.1 = post.clone();

        Ok(Some(post))
    }

    async fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<Post>, StoreError> {
        let mut posts: Vec<(u64, Post)> = self
            .posts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        posts.sort_by_key(|(seq, _)| *seq);

        Ok(posts
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, post)| post)
            .collect())
    }
}

#[async_trait]
impl ReactionStore for MemoryStore {
    async fn find(
        &self,
        user_id: Uuid,
        post_id: Uuid,
    ) -> Result<Option<PostReaction>, StoreError> {
        Ok(self
            .reactions
            .get(&post_id)
            .and_then(|per_post| per_post.get(&user_id).map(|r| r.clone())))
    }

    async fn count_by_kind(&self, post_id: Uuid, kind: &str) -> Result<u64, StoreError> {
        let count = self.reactions.get(&post_id).map_or(0, |per_post| {
            per_post
                .iter()
                .filter(|entry| entry.reaction == kind)
                .count()
        });

        Ok(count as u64)
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        kind: &str,
    ) -> Result<Option<PostReaction>, StoreError> {
        let per_post = self.reactions.entry(post_id).or_default().downgrade();

        let previous = match per_post.entry(user_id) {
            Entry::Occupied(mut existing) => {
                let previous = existing.get().clone();
                existing.get_mut().reaction = kind.to_string();
                Some(previous)
            }
            Entry::Vacant(slot) => {
                slot.insert(PostReaction {
                    id: Uuid::new_v4(),
                    user_id,
                    post_id,
                    reaction: kind.to_string(),
                });
                None
            }
        };

        Ok(previous)
    }

    async fn delete(&self, reaction: &PostReaction) -> Result<bool, StoreError> {
        let Some(per_post) = self.reactions.get(&reaction.post_id) else {
            return Ok(false);
        };
        let removed = per_post.remove_if(&reaction.user_id, |_, stored| stored.id == reaction.id);

        Ok(removed.is_some())
    }
}

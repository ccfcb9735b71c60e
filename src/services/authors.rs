use crate::{errors::ApiError, store::UserStore};
use std::collections::HashMap;
use uuid::Uuid;

/// Author id -> username memo for a single request.
///
/// Created by the handler, passed down by `&mut` and dropped with the request.
#[derive(Debug, Default)]
pub struct AuthorCache {
    usernames: HashMap<Uuid, String>,
}

impl AuthorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, author_id: &Uuid) -> Option<&str> {
        self.usernames.get(author_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.usernames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usernames.is_empty()
    }
}

pub struct AuthorResolver<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthorResolver<'a> {
    pub fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Authors are never deleted, so a missing one is an integrity fault.
    pub async fn resolve(
        &self,
        author_id: Uuid,
        cache: &mut AuthorCache,
    ) -> Result<String, ApiError> {
        if let Some(username) = cache.get(&author_id) {
            return Ok(username.to_string());
        }

        let user = self.users.get_by_id(author_id).await?.ok_or_else(|| {
            ApiError::DataIntegrity(format!("author {} does not exist", author_id))
        })?;

        cache.usernames.insert(author_id, user.username.clone());

        Ok(user.username)
    }
}

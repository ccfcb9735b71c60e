use crate::{
    dto::PostReactionRead,
    errors::ApiError,
    states::AppState,
    store::{PostStore, ReactionStore},
};
use tracing::info;
use uuid::Uuid;

/// What a reaction command did to the (user, post) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTransition {
    Added,
    Changed,
    Removed,
    /// Same kind set again.
    Unchanged,
}

impl ReactionTransition {
    pub fn into_read(self, reaction: Option<String>) -> PostReactionRead {
        PostReactionRead {
            reaction,
            is_added: self == ReactionTransition::Added,
            is_changed: self == ReactionTransition::Changed,
            is_removed: self == ReactionTransition::Removed,
        }
    }
}

pub struct ReactionHandler<'a> {
    posts: &'a dyn PostStore,
    reactions: &'a dyn ReactionStore,
    reaction_kinds: &'a [String],
}

impl<'a> ReactionHandler<'a> {
    pub fn new(
        posts: &'a dyn PostStore,
        reactions: &'a dyn ReactionStore,
        reaction_kinds: &'a [String],
    ) -> Self {
        Self {
            posts,
            reactions,
            reaction_kinds,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.posts.as_ref(),
            state.reactions.as_ref(),
            &state.config.reaction_kinds,
        )
    }

    /// Sets (`Some`) or clears (`None`) the user's reaction on a post.
    pub async fn apply(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        requested: Option<String>,
    ) -> Result<PostReactionRead, ApiError> {
        if self.posts.get(post_id).await?.is_none() {
            return Err(ApiError::PostNotFound);
        }

        let transition = match requested.as_deref() {
            Some(kind) => self.set(user_id, post_id, kind).await?,
            None => self.clear(user_id, post_id).await?,
        };

        info!(
            "Reaction {:?} on post {} by user {}: {:?}",
            requested, post_id, user_id, transition
        );

        Ok(transition.into_read(requested))
    }

    async fn set(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        kind: &str,
    ) -> Result<ReactionTransition, ApiError> {
        if !self.reaction_kinds.iter().any(|k| k == kind) {
            return Err(ApiError::InvalidReaction);
        }

        let transition = match self.reactions.upsert(user_id, post_id, kind).await? {
            None => ReactionTransition::Added,
            Some(previous) if previous.reaction != kind => ReactionTransition::Changed,
            Some(_) => ReactionTransition::Unchanged,
        };

        Ok(transition)
    }

    async fn clear(&self, user_id: Uuid, post_id: Uuid) -> Result<ReactionTransition, ApiError> {
        let existing = self
            .reactions
            .find(user_id, post_id)
            .await?
            .ok_or(ApiError::ReactionNotFound)?;

        // lost a race with another clear from the same user
        if !self.reactions.delete(&existing).await? {
            return Err(ApiError::ReactionNotFound);
        }

        Ok(ReactionTransition::Removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::NewPost, store::MemoryStore};

    struct Fixture {
        store: MemoryStore,
        kinds: Vec<String>,
        post_id: Uuid,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = MemoryStore::new();
            let post = PostStore::insert(
                &store,
                NewPost {
                    author_id: Uuid::new_v4(),
                    title: "t".to_string(),
                    content: "c".to_string(),
                    preview_image_path: None,
                },
            )
            .await
            .unwrap();

            Self {
                store,
                kinds: vec!["like".to_string(), "love".to_string()],
                post_id: post.id,
            }
        }

        fn handler(&self) -> ReactionHandler<'_> {
            ReactionHandler::new(&self.store, &self.store, &self.kinds)
        }

        async fn react(&self, user_id: Uuid, kind: Option<&str>) -> Result<PostReactionRead, ApiError> {
            self.handler()
                .apply(user_id, self.post_id, kind.map(str::to_string))
                .await
        }

        async fn count(&self, kind: &str) -> u64 {
            self.store.count_by_kind(self.post_id, kind).await.unwrap()
        }
    }

    fn flags(read: &PostReactionRead) -> (bool, bool, bool) {
        (read.is_added, read.is_changed, read.is_removed)
    }

    #[tokio::test]
    async fn first_reaction_is_added() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();

        let read = fx.react(user, Some("like")).await.unwrap();

        assert_eq!(flags(&read), (true, false, false));
        assert_eq!(read.reaction.as_deref(), Some("like"));
        assert_eq!(fx.count("like").await, 1);
    }

    #[tokio::test]
    async fn different_kind_is_changed_and_shifts_tally() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();
        fx.react(user, Some("like")).await.unwrap();

        let read = fx.react(user, Some("love")).await.unwrap();

        assert_eq!(flags(&read), (false, true, false));
        assert_eq!(fx.count("like").await, 0);
        assert_eq!(fx.count("love").await, 1);
    }

    #[tokio::test]
    async fn same_kind_twice_is_a_no_op() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();
        fx.react(user, Some("like")).await.unwrap();

        let read = fx.react(user, Some("like")).await.unwrap();

        assert_eq!(flags(&read), (false, false, false));
        assert_eq!(read.reaction.as_deref(), Some("like"));
        assert_eq!(fx.count("like").await, 1);
        assert_eq!(fx.count("love").await, 0);
    }

    #[tokio::test]
    async fn clearing_removes_the_reaction() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();
        fx.react(user, Some("love")).await.unwrap();

        let read = fx.react(user, None).await.unwrap();

        assert_eq!(flags(&read), (false, false, true));
        assert_eq!(read.reaction, None);
        assert_eq!(fx.count("love").await, 0);
        assert!(fx.store.find(user, fx.post_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clearing_nothing_is_an_error() {
        let fx = Fixture::new().await;

        let result = fx.react(Uuid::new_v4(), None).await;

        assert!(matches!(result, Err(ApiError::ReactionNotFound)));
    }

    #[tokio::test]
    async fn unknown_kind_is_rejected() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();

        let result = fx.react(user, Some("shrug")).await;

        assert!(matches!(result, Err(ApiError::InvalidReaction)));
        assert!(fx.store.find(user, fx.post_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let fx = Fixture::new().await;

        let result = fx
            .handler()
            .apply(Uuid::new_v4(), Uuid::new_v4(), Some("like".to_string()))
            .await;

        assert!(matches!(result, Err(ApiError::PostNotFound)));
    }

    #[tokio::test]
    async fn one_reaction_per_user_after_any_sequence() {
        let fx = Fixture::new().await;
        let users = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let script = [
            (0, Some("like")),
            (1, Some("love")),
            (0, Some("love")),
            (2, Some("like")),
            (0, Some("love")),
            (1, None),
            (2, Some("love")),
            (1, Some("like")),
            (0, None),
            (0, Some("like")),
        ];

        for (who, kind) in script {
            fx.react(users[who], kind).await.unwrap();
            let total = fx.count("like").await + fx.count("love").await;
            let reacted = {
                let mut n = 0;
                for user in users {
                    if fx.store.find(user, fx.post_id).await.unwrap().is_some() {
                        n += 1;
                    }
                }
                n
            };
            assert_eq!(total, reacted);
        }

        // final state: user0 like, user1 like, user2 love
        assert_eq!(fx.count("like").await, 2);
        assert_eq!(fx.count("love").await, 1);
    }

    #[tokio::test]
    async fn concurrent_first_reactions_do_not_duplicate() {
        let fx = Fixture::new().await;
        let user = Uuid::new_v4();

        let handler = fx.handler();
        let (a, b) = tokio::join!(
            handler.apply(user, fx.post_id, Some("like".to_string())),
            handler.apply(user, fx.post_id, Some("like".to_string())),
        );

        let added = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|read| read.is_added)
            .count();
        assert_eq!(added, 1);
        assert_eq!(fx.count("like").await, 1);
    }
}

use super::authors::{AuthorCache, AuthorResolver};
use crate::{
    dto::{PostAuthorRead, PostRead},
    errors::ApiError,
    models::Post,
    states::AppState,
    store::{ReactionStore, UserStore},
};
use std::collections::BTreeMap;
use uuid::Uuid;

/// URL prefix under which post images are served.
pub const STATIC_POSTS_PREFIX: &str = "/static/posts/";

/// Builds the read model for posts: author name, reaction tallies and
/// the public image URL.
pub struct PostAssembler<'a> {
    authors: AuthorResolver<'a>,
    reactions: &'a dyn ReactionStore,
    reaction_kinds: &'a [String],
}

impl<'a> PostAssembler<'a> {
    pub fn new(
        users: &'a dyn UserStore,
        reactions: &'a dyn ReactionStore,
        reaction_kinds: &'a [String],
    ) -> Self {
        Self {
            authors: AuthorResolver::new(users),
            reactions,
            reaction_kinds,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.users.as_ref(),
            state.reactions.as_ref(),
            &state.config.reaction_kinds,
        )
    }

    /// Pass a cache when assembling a batch so each author is fetched once.
    pub async fn assemble(
        &self,
        post: Post,
        cache: Option<&mut AuthorCache>,
    ) -> Result<PostRead, ApiError> {
        let mut scratch = AuthorCache::new();
        let cache = cache.unwrap_or(&mut scratch);

        let username = self.authors.resolve(post.author_id, cache).await?;
        let reactions = self.tally(post.id).await?;

        Ok(PostRead {
            id: post.id,
            title: post.title,
            content: post.content,
            preview_image_url: post
                .preview_image_path
                .map(|path| format!("{}{}", STATIC_POSTS_PREFIX, path)),
            author: PostAuthorRead {
                id: post.author_id,
                username,
            },
            is_pinned: post.is_pinned,
            edited_at: post.edited_at,
            created_at: post.created_at,
            reactions,
        })
    }

    /// Counts for every configured kind, zero-filled.
    pub async fn tally(&self, post_id: Uuid) -> Result<BTreeMap<String, u64>, ApiError> {
        let mut tally = BTreeMap::new();
        for kind in self.reaction_kinds {
            let count = self.reactions.count_by_kind(post_id, kind).await?;
            tally.insert(kind.clone(), count);
        }

        Ok(tally)
    }
}

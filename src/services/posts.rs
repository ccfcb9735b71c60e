use super::{AuthorCache, PostAssembler};
use crate::{
    config::IMAGE_EXTENSIONS,
    dto::{ImageUpload, PostFields, PostRead},
    errors::ApiError,
    models::{NewPost, User},
    states::AppState,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Malformed ids are reported the same way as unknown ones.
pub fn parse_post_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::PostNotFound)
}

/// `0` means "use the configured default"; the default is also the ceiling.
pub fn effective_limit(requested: usize, configured: usize) -> usize {
    if requested == 0 {
        configured
    } else {
        requested.min(configured)
    }
}

/// Lowercased text after the last `.` of the file name, if it is an allowed
/// image type.
pub fn image_extension(file_name: &str) -> Result<String, ApiError> {
    let (_, extension) = file_name
        .rsplit_once('.')
        .ok_or(ApiError::InvalidContentType)?;
    let extension = extension.to_ascii_lowercase();

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(ApiError::InvalidContentType)
    }
}

pub struct PostService<'a> {
    state: &'a AppState,
}

impl<'a> PostService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn assembler(&self) -> PostAssembler<'a> {
        PostAssembler::from_state(self.state)
    }

    pub async fn get(&self, post_id: Uuid) -> Result<PostRead, ApiError> {
        let post = self
            .state
            .posts
            .get(post_id)
            .await?
            .ok_or(ApiError::PostNotFound)?;

        self.assembler().assemble(post, None).await
    }

    /// One page of posts in insertion order; authors are resolved once per page.
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<PostRead>, ApiError> {
        let limit = effective_limit(limit, self.state.config.api_posts_limit);
        let posts = self.state.posts.list_page(offset, limit).await?;

        let assembler = self.assembler();
        let mut authors = AuthorCache::new();
        let mut reads = Vec::with_capacity(posts.len());
        for post in posts {
            reads.push(assembler.assemble(post, Some(&mut authors)).await?);
        }

        Ok(reads)
    }

    pub async fn create(
        &self,
        author: &User,
        fields: PostFields,
        image: Option<ImageUpload>,
    ) -> Result<PostRead, ApiError> {
        self.validate_fields(&fields)?;

        let preview_image_path = match image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let post = self
            .state
            .posts
            .insert(NewPost {
                author_id: author.id,
                title: fields.title,
                content: fields.content,
                preview_image_path,
            })
            .await?;

        info!("Post created: {} by user {}", post.id, author.id);

        self.assembler().assemble(post, None).await
    }

    /// Edits the post in place. Without a new image, `delete_old_preview_image`
    /// decides whether the current image is dropped or kept.
    pub async fn update(
        &self,
        editor: &User,
        post_id: Uuid,
        fields: PostFields,
        image: Option<ImageUpload>,
        delete_old_preview_image: bool,
    ) -> Result<PostRead, ApiError> {
        let mut post = self
            .state
            .posts
            .get(post_id)
            .await?
            .ok_or(ApiError::PostNotFound)?;

        if post.author_id != editor.id {
            return Err(ApiError::Forbidden);
        }

        self.validate_fields(&fields)?;

        let old_image = post.preview_image_path.clone();
        let (new_image, discarded) = match image {
            Some(upload) => {
                let path = self.store_image(upload).await?;
                let discarded = if delete_old_preview_image { old_image } else { None };
                (Some(path), discarded)
            }
            None if delete_old_preview_image => (None, old_image),
            None => (old_image, None),
        };

        post.title = fields.title;
        post.content = fields.content;
        post.preview_image_path = new_image;
        post.edited_at = Some(Utc::now().timestamp());

        let post = self
            .state
            .posts
            .update(post)
            .await?
            .ok_or(ApiError::PostNotFound)?;

        if let Some(path) = discarded {
            // the post no longer points at it, so a failure only leaks a file
            if let Err(e) = self.state.images.remove(&path).await {
                warn!("Failed to remove old preview image {}: {}", path, e);
            }
        }

        info!("Post updated: {} by user {}", post.id, editor.id);

        self.assembler().assemble(post, None).await
    }

    fn validate_fields(&self, fields: &PostFields) -> Result<(), ApiError> {
        fields
            .validate()
            .map_err(|e| ApiError::ValidationError(e.to_string()))?;

        let limit = self.state.config.text_length_limit;
        if fields.content.chars().count() > limit {
            return Err(ApiError::ValidationError(format!(
                "Content must be at most {} characters",
                limit
            )));
        }

        Ok(())
    }

    async fn store_image(&self, upload: ImageUpload) -> Result<String, ApiError> {
        let extension = image_extension(&upload.file_name)?;
        let path = self.state.images.store(&upload.bytes, &extension).await?;

        Ok(path)
    }
}

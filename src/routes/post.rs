use crate::{
    AppState,
    auth::CurrentUser,
    dto::{
        ImageUpload, ListParams, PostFields, PostReactionRead, PostRead, PostReadList,
        ReactionRequest, SinglePostParams,
    },
    errors::ApiError,
    extractors::{AppJson, AppQuery},
    services::{PostService, ReactionHandler, parse_post_id},
};
use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, State},
    http::StatusCode,
};

/// Fields of the multipart post create/update form.
#[derive(Debug)]
pub struct PostForm {
    post_id: Option<String>,
    fields: PostFields,
    preview_image: Option<ImageUpload>,
    delete_old_preview_image: bool,
}

impl<S> FromRequest<S> for PostForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        read_post_form(multipart).await
    }
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, ApiError> {
    let mut form = PostForm {
        post_id: None,
        fields: PostFields::default(),
        preview_image: None,
        delete_old_preview_image: true,
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "preview_image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;

                // browsers send an empty part when no file was picked
                if !file_name.is_empty() || !bytes.is_empty() {
                    form.preview_image = Some(ImageUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {
                let value = field.text().await?;

                match name.as_str() {
                    "post_id" => form.post_id = Some(value),
                    "title" => form.fields.title = value,
                    "content" => form.fields.content = value,
                    "delete_old_preview_image" => {
                        form.delete_old_preview_image = parse_flag(&value)?;
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(form)
}

fn parse_flag(value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        other => Err(ApiError::ValidationError(format!(
            "delete_old_preview_image: invalid boolean {:?}",
            other
        ))),
    }
}

/// GET /api/posts/single?post_id=<id>
pub async fn get_single_post(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<SinglePostParams>,
) -> Result<Json<PostRead>, ApiError> {
    let post_id = parse_post_id(&params.post_id)?;
    let post = PostService::new(&state).get(post_id).await?;

    Ok(Json(post))
}

/// GET /api/posts/list?offset=0&limit=20
pub async fn list_posts(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<PostReadList>, ApiError> {
    let posts = PostService::new(&state)
        .list(params.offset, params.limit)
        .await?;

    Ok(Json(PostReadList { posts }))
}

/// POST /api/posts/single
/// Headers: Authorization: Bearer <token>
/// Multipart: title, content, optional preview_image
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    form: PostForm,
) -> Result<(StatusCode, Json<PostRead>), ApiError> {
    let post = PostService::new(&state)
        .create(&user, form.fields, form.preview_image)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// PATCH /api/posts/single
/// Headers: Authorization: Bearer <token>
/// Multipart: post_id, title, content, optional preview_image, delete_old_preview_image
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    form: PostForm,
) -> Result<Json<PostRead>, ApiError> {
    let post_id = parse_post_id(form.post_id.as_deref().unwrap_or_default())?;

    let post = PostService::new(&state)
        .update(
            &user,
            post_id,
            form.fields,
            form.preview_image,
            form.delete_old_preview_image,
        )
        .await?;

    Ok(Json(post))
}

/// POST /api/posts/reaction
/// Headers: Authorization: Bearer <token>
/// Body: { "post_id": "...", "reaction": "like" | null }
pub async fn react_to_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<ReactionRequest>,
) -> Result<Json<PostReactionRead>, ApiError> {
    let post_id = parse_post_id(&payload.post_id)?;
    let result = ReactionHandler::from_state(&state)
        .apply(user.id, post_id, payload.reaction)
        .await?;

    Ok(Json(result))
}

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Validate, Deserialize)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 3, max = 20, message = "Username must be 3-20 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 100, message = "Password must be 8-100 characters"))]
    pub password: String,
}

/// `username` accepts either the username or the email address.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    pub password: String,
}

/// Body of `request-verify-token` and `forgot-password`.
#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8, max = 100, message = "Password must be 8-100 characters"))]
    pub password: String,
}

/// Text fields shared by post creation and update. The configured
/// `TEXT_LENGTH_LIMIT` is checked separately since it is not known statically.
#[derive(Debug, Default, Validate)]
pub struct PostFields {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: String,
}

/// An uploaded file pulled out of a multipart body.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
pub struct SinglePostParams {
    pub post_id: String,
}

/// `limit = 0` means "use the configured default".
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
}

/// A `null` or missing reaction clears the caller's reaction.
#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub post_id: String,
    #[serde(default)]
    pub reaction: Option<String>,
}

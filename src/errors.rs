use crate::store::StoreError;
use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    InvalidCredentials,
    UserAlreadyExists,
    Unauthorized,
    Forbidden,
    PostNotFound,
    ReactionNotFound,
    InvalidReaction,
    InvalidContentType,
    TooManyRequests,
    RequestTimeout,
    PayloadTooLarge,
    VerifyBadToken,
    AlreadyVerified,
    ResetBadToken,
    InvalidPassword(String),
    ValidationError(String),
    /// A record references another record that should always exist.
    DataIntegrity(String),
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials
            | ApiError::UserAlreadyExists
            | ApiError::InvalidReaction
            | ApiError::InvalidContentType
            | ApiError::VerifyBadToken
            | ApiError::AlreadyVerified
            | ApiError::ResetBadToken
            | ApiError::InvalidPassword(_)
            | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::PostNotFound | ApiError::ReactionNotFound => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::DataIntegrity(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable code sent back in the `detail` field.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidCredentials => "LOGIN_BAD_CREDENTIALS",
            ApiError::UserAlreadyExists => "REGISTER_USER_ALREADY_EXISTS",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden => "NOT_POST_AUTHOR",
            ApiError::PostNotFound => "POST_NOT_FOUND",
            ApiError::ReactionNotFound => "REACTION_NOT_FOUND",
            ApiError::InvalidReaction => "INVALID_REACTION",
            ApiError::InvalidContentType => "INVALID_CONTENT_TYPE",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::RequestTimeout => "REQUEST_TIMEOUT",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::VerifyBadToken => "VERIFY_USER_BAD_TOKEN",
            ApiError::AlreadyVerified => "VERIFY_USER_ALREADY_VERIFIED",
            ApiError::ResetBadToken => "RESET_PASSWORD_BAD_TOKEN",
            ApiError::InvalidPassword(_) => "RESET_PASSWORD_INVALID_PASSWORD",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::DataIntegrity(_) | ApiError::InternalError(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

// Extractor rejections keep the JSON `detail` contract instead of axum's
// plain-text bodies. Only the body-limit status survives the mapping.
fn rejected(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::ValidationError(message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        rejected(err.status(), err.body_text())
    }
}

/// Convert our custom errors to HTTP responses
///
/// Every body carries `detail` with the error code so clients can branch on it
/// without parsing messages.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            ApiError::ValidationError(msg) | ApiError::InvalidPassword(msg) => serde_json::json!({
              "detail": code,
              "message": msg
            }),
            ApiError::DataIntegrity(msg) => {
                error!("Data integrity fault: {}", msg);
                serde_json::json!({ "detail": code })
            }
            ApiError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                serde_json::json!({ "detail": code })
            }
            _ => serde_json::json!({ "detail": code }),
        };

        (status, Json(body)).into_response()
    }
}

use crate::{
    AppState,
    auth::{CurrentUser, authenticate, create_token, hash_password},
    dto::{
        AuthResponse, EmailRequest, LoginRequest, ResetPasswordRequest, SignupRequest,
        UserResponse, VerifyRequest,
    },
    errors::ApiError,
    extractors::AppJson,
    models::User,
    services::AccountService,
    store::StoreError,
};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Idle limiter entries are dropped once the map grows past this.
const LOGIN_LIMITER_RETAIN_THRESHOLD: usize = 10_000;

/// POST /api/auth/register
/// Body: { "email": "...", "username": "...", "password": "..." }
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let user = User {
        id: Uuid::new_v4(),
        email: payload.email,
        username: payload.username,
        hashed_password: hash_password(&payload.password, state.config.bcrypt_cost)?,
        is_active: true,
        is_verified: false,
        is_superuser: false,
        security_stamp: Uuid::new_v4(),
        created_at: Utc::now().timestamp(),
    };

    let user = state.users.insert(user).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::UserAlreadyExists,
        other => other.into(),
    })?;

    info!("New user registered: {} ({})", user.id, user.email);

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/auth/login
/// Body: { "username": "name or email", "password": "..." }
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    // one budget per account, so a flood against one login leaves others usable
    let key = payload.username.trim().to_lowercase();
    if state.login_limiter.check_key(&key).is_err() {
        warn!("Login rate limit hit for {}", key);
        return Err(ApiError::TooManyRequests);
    }
    if state.login_limiter.len() > LOGIN_LIMITER_RETAIN_THRESHOLD {
        state.login_limiter.retain_recent();
    }

    let user = authenticate(
        state.users.as_ref(),
        &payload.username,
        &payload.password,
        state.config.bcrypt_cost,
    )
    .await?;
    let access_token = create_token(&user, &state.config.jwt_secret, state.config.token_lifetime)?;

    info!("User logged in: {}", user.id);

    Ok(Json(AuthResponse {
        access_token,
        token_type: "bearer",
        user: user.into(),
    }))
}

/// GET /api/users/me
/// Headers: Authorization: Bearer <token>
pub async fn get_current_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// POST /api/auth/request-verify-token
/// Body: { "email": "..." }
pub async fn request_verify_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<EmailRequest>,
) -> Result<StatusCode, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    AccountService::new(&state)
        .request_verify_token(&payload.email)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

/// POST /api/auth/verify
/// Body: { "token": "..." }
pub async fn verify(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = AccountService::new(&state).verify(&payload.token).await?;

    Ok(Json(user.into()))
}

/// POST /api/auth/forgot-password
/// Body: { "email": "..." }
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<EmailRequest>,
) -> Result<StatusCode, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    AccountService::new(&state)
        .forgot_password(&payload.email)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

/// POST /api/auth/reset-password
/// Body: { "token": "...", "password": "..." }
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::InvalidPassword(e.to_string()))?;

    let user = AccountService::new(&state)
        .reset_password(&payload.token, &payload.password)
        .await?;

    Ok(Json(user.into()))
}

use crate::{errors::ApiError, models::User, states::AppState, store::UserStore};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use bcrypt::{HashParts, hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub username: String,
    pub exp: usize,
}

/// Audience of email verification tokens.
pub const VERIFY_AUDIENCE: &str = "reactions-blog:verify";
/// Audience of password reset tokens.
pub const RESET_PASSWORD_AUDIENCE: &str = "reactions-blog:reset";

/// Single-purpose token mailed to the user. `stamp` ties it to the account
/// state it was issued for, so changing that state revokes it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionClaims {
    pub sub: String,
    pub aud: String,
    pub stamp: String,
    pub exp: usize,
}

fn expires_in(lifetime: Duration) -> Result<usize, ApiError> {
    let lifetime = chrono::Duration::from_std(lifetime)
        .map_err(|e| ApiError::InternalError(format!("Invalid token lifetime: {}", e)))?;

    let expiration = Utc::now()
        .checked_add_signed(lifetime)
        .ok_or_else(|| ApiError::InternalError("Failed to calculate expiration".into()))?
        .timestamp() as usize;

    Ok(expiration)
}

pub fn create_token(user: &User, secret: &str, lifetime: Duration) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        exp: expires_in(lifetime)?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::InternalError(format!("Token Creation failed: {}", e)))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

pub fn create_action_token(
    user_id: Uuid,
    stamp: &str,
    audience: &str,
    secret: &str,
    lifetime: Duration,
) -> Result<String, ApiError> {
    let claims = ActionClaims {
        sub: user_id.to_string(),
        aud: audience.to_string(),
        stamp: stamp.to_string(),
        exp: expires_in(lifetime)?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::InternalError(format!("Token Creation failed: {}", e)))
}

/// `None` for any token that is forged, expired or meant for another audience.
pub fn decode_action_token(token: &str, audience: &str, secret: &str) -> Option<ActionClaims> {
    let mut validation = Validation::default();
    validation.set_audience(&[audience]);

    decode::<ActionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .ok()
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    hash(password, cost)
        .map_err(|e| ApiError::InternalError(format!("Password hashing failed: {}", e)))
}

/// True when the stored hash was made with a different cost than `cost`.
fn needs_rehash(hashed_password: &str, cost: u32) -> bool {
    hashed_password
        .parse::<HashParts>()
        .map(|parts| parts.get_cost() != cost)
        .unwrap_or(false)
}

/// Checks a login (email or username) and password pair.
///
/// Unknown logins still pay for one hash so response time does not reveal
/// which accounts exist. A correct password stored at another cost is
/// rehashed at `cost`.
pub async fn authenticate(
    users: &dyn UserStore,
    login: &str,
    password: &str,
    cost: u32,
) -> Result<User, ApiError> {
    let Some(user) = users.get_by_email_or_username(login).await? else {
        hash_password(password, cost)?;
        return Err(ApiError::InvalidCredentials);
    };

    let valid = verify(password, &user.hashed_password)
        .map_err(|e| ApiError::InternalError(format!("Password verification failed: {}", e)))?;

    if !valid || !user.is_active {
        return Err(ApiError::InvalidCredentials);
    }

    if !needs_rehash(&user.hashed_password, cost) {
        return Ok(user);
    }

    let mut rehashed = user.clone();
    rehashed.hashed_password = hash_password(password, cost)?;
    info!("Rehashed password of user {} at cost {}", user.id, cost);

    Ok(users.update(rehashed).await?.unwrap_or(user))
}

/// Resolves a bearer token to an active user.
pub async fn current_user(users: &dyn UserStore, token: &str, secret: &str) -> Result<User, ApiError> {
    let claims = decode_token(token, secret)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)?;

    let user = users
        .get_by_id(user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !user.is_active {
        warn!("Rejected token for inactive user {}", user.id);
        return Err(ApiError::Unauthorized);
    }

    Ok(user)
}

/// Extractor for handlers that need a logged-in, active user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user = current_user(state.users.as_ref(), token, &state.config.jwt_secret).await?;

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;
    use std::time::Instant;

    const SECRET: &str = "test-secret";

    async fn registered(store: &MemoryStore, active: bool) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            hashed_password: hash_password("correct horse", 4).unwrap(),
            is_active: active,
            is_verified: false,
            is_superuser: false,
            security_stamp: Uuid::new_v4(),
            created_at: 0,
        };
        store.insert(user).await.unwrap()
    }

    fn cost_of(hashed_password: &str) -> u32 {
        hashed_password.parse::<HashParts>().unwrap().get_cost()
    }

    #[test]
    fn bearer_token_requires_prefix() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc");
    }

    #[tokio::test]
    async fn authenticates_by_username_or_email() {
        let store = MemoryStore::new();
        let alice = registered(&store, true).await;

        let by_name = authenticate(&store, "Alice", "correct horse", 4).await.unwrap();
        let by_email = authenticate(&store, "alice@example.com", "correct horse", 4)
            .await
            .unwrap();
        assert_eq!(by_name.id, alice.id);
        assert_eq!(by_email.id, alice.id);

        let wrong = authenticate(&store, "alice", "battery staple", 4).await;
        assert!(matches!(wrong, Err(ApiError::InvalidCredentials)));

        let unknown = authenticate(&store, "bob", "correct horse", 4).await;
        assert!(matches!(unknown, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unknown_login_takes_as_long_as_a_wrong_password() {
        let store = MemoryStore::new();
        let mut alice = registered(&store, true).await;
        alice.hashed_password = hash_password("correct horse", 8).unwrap();
        UserStore::update(&store, alice).await.unwrap();

        let started = Instant::now();
        let wrong = authenticate(&store, "alice", "battery staple", 8).await;
        let known = started.elapsed();

        let started = Instant::now();
        let unknown = authenticate(&store, "nobody", "battery staple", 8).await;
        let missing = started.elapsed();

        assert!(matches!(wrong, Err(ApiError::InvalidCredentials)));
        assert!(matches!(unknown, Err(ApiError::InvalidCredentials)));
        assert!(
            missing * 4 >= known,
            "unknown login took {missing:?}, wrong password took {known:?}"
        );
    }

    #[tokio::test]
    async fn login_rehashes_at_configured_cost() {
        let store = MemoryStore::new();
        let alice = registered(&store, true).await;
        assert_eq!(cost_of(&alice.hashed_password), 4);

        let user = authenticate(&store, "alice", "correct horse", 5).await.unwrap();
        assert_eq!(cost_of(&user.hashed_password), 5);

        let stored = store.get_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(cost_of(&stored.hashed_password), 5);
        assert!(verify("correct horse", &stored.hashed_password).unwrap());

        // already at the configured cost: left alone
        let again = authenticate(&store, "alice", "correct horse", 5).await.unwrap();
        assert_eq!(again.hashed_password, stored.hashed_password);
    }

    #[test]
    fn action_tokens_are_bound_to_their_audience() {
        let user_id = Uuid::new_v4();
        let token = create_action_token(
            user_id,
            "stamp",
            VERIFY_AUDIENCE,
            SECRET,
            Duration::from_secs(60),
        )
        .unwrap();

        let claims = decode_action_token(&token, VERIFY_AUDIENCE, SECRET).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.stamp, "stamp");

        assert!(decode_action_token(&token, RESET_PASSWORD_AUDIENCE, SECRET).is_none());
        assert!(decode_action_token(&token, VERIFY_AUDIENCE, "other-secret").is_none());
        // not usable as a bearer token either
        assert!(matches!(decode_token(&token, SECRET), Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn token_round_trips_to_current_user() {
        let store = MemoryStore::new();
        let alice = registered(&store, true).await;

        let token = create_token(&alice, SECRET, Duration::from_secs(60)).unwrap();
        let user = current_user(&store, &token, SECRET).await.unwrap();
        assert_eq!(user.id, alice.id);

        let forged = current_user(&store, &token, "other-secret").await;
        assert!(matches!(forged, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn inactive_users_are_rejected() {
        let store = MemoryStore::new();
        let alice = registered(&store, false).await;

        let token = create_token(&alice, SECRET, Duration::from_secs(60)).unwrap();
        let result = current_user(&store, &token, SECRET).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }
}

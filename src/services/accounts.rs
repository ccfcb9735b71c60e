use crate::{
    auth::{
        ActionClaims, RESET_PASSWORD_AUDIENCE, VERIFY_AUDIENCE, create_action_token,
        decode_action_token, hash_password,
    },
    errors::ApiError,
    models::User,
    states::AppState,
};
use tracing::info;
use uuid::Uuid;

/// Email verification and password reset.
///
/// Token requests never reveal whether an account exists: unknown or
/// ineligible addresses succeed without sending anything.
pub struct AccountService<'a> {
    state: &'a AppState,
}

impl<'a> AccountService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn request_verify_token(&self, email: &str) -> Result<(), ApiError> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(());
        };
        if !user.is_active || user.is_verified {
            return Ok(());
        }

        let token = self.issue(&user, &verify_stamp(&user), VERIFY_AUDIENCE)?;
        self.state
            .notifier
            .verification_requested(&user, &token)
            .await;

        Ok(())
    }

    pub async fn verify(&self, token: &str) -> Result<User, ApiError> {
        let claims = decode_action_token(token, VERIFY_AUDIENCE, &self.state.config.jwt_secret)
            .ok_or(ApiError::VerifyBadToken)?;
        let mut user = self
            .user_for(&claims)
            .await?
            .ok_or(ApiError::VerifyBadToken)?;

        // the address changed since the token was issued
        if claims.stamp != verify_stamp(&user) {
            return Err(ApiError::VerifyBadToken);
        }
        if user.is_verified {
            return Err(ApiError::AlreadyVerified);
        }

        user.is_verified = true;
        let user = self
            .state
            .users
            .update(user)
            .await?
            .ok_or(ApiError::VerifyBadToken)?;

        info!("User verified: {}", user.id);

        Ok(user)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(());
        };
        if !user.is_active {
            return Ok(());
        }

        let token = self.issue(
            &user,
            &user.security_stamp.to_string(),
            RESET_PASSWORD_AUDIENCE,
        )?;
        self.state
            .notifier
            .password_reset_requested(&user, &token)
            .await;

        Ok(())
    }

    /// Sets a new password and rotates the security stamp, which revokes every
    /// reset token issued before this call.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<User, ApiError> {
        let claims = decode_action_token(
            token,
            RESET_PASSWORD_AUDIENCE,
            &self.state.config.jwt_secret,
        )
        .ok_or(ApiError::ResetBadToken)?;
        let mut user = self
            .user_for(&claims)
            .await?
            .ok_or(ApiError::ResetBadToken)?;

        if !user.is_active || claims.stamp != user.security_stamp.to_string() {
            return Err(ApiError::ResetBadToken);
        }

        user.hashed_password = hash_password(password, self.state.config.bcrypt_cost)?;
        user.security_stamp = Uuid::new_v4();
        let user = self
            .state
            .users
            .update(user)
            .await?
            .ok_or(ApiError::ResetBadToken)?;

        info!("Password reset for user {}", user.id);

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let user = self.state.users.get_by_email_or_username(email).await?;

        // the lookup also matches usernames
        Ok(user.filter(|u| u.email.to_lowercase() == email.to_lowercase()))
    }

    async fn user_for(&self, claims: &ActionClaims) -> Result<Option<User>, ApiError> {
        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            return Ok(None);
        };

        Ok(self.state.users.get_by_id(user_id).await?)
    }

    fn issue(&self, user: &User, stamp: &str, audience: &str) -> Result<String, ApiError> {
        create_action_token(
            user.id,
            stamp,
            audience,
            &self.state.config.jwt_secret,
            self.state.config.verification_lifetime,
        )
    }
}

fn verify_stamp(user: &User) -> String {
    user.email.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{authenticate, create_token},
        config::Config,
        notify::AccountNotifier,
        services::authors::tests::user,
    };
    use async_trait::async_trait;
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    /// Keeps every token it is handed, newest last.
    #[derive(Default)]
    struct RecordingNotifier {
        verify: Mutex<Vec<String>>,
        reset: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn last_verify(&self) -> Option<String> {
            self.verify.lock().unwrap().last().cloned()
        }

        fn last_reset(&self) -> Option<String> {
            self.reset.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl AccountNotifier for RecordingNotifier {
        async fn verification_requested(&self, _user: &User, token: &str) {
            self.verify.lock().unwrap().push(token.to_string());
        }

        async fn password_reset_requested(&self, _user: &User, token: &str) {
            self.reset.lock().unwrap().push(token.to_string());
        }
    }

    fn state() -> (AppState, Arc<RecordingNotifier>) {
        let config = Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some("secret".to_string()),
            "BCRYPT_COST" => Some("4".to_string()),
            _ => None,
        })
        .unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let mut state = AppState::new(config);
        state.notifier = notifier.clone();
        (state, notifier)
    }

    async fn member(state: &AppState, name: &str) -> User {
        let mut account = user(name);
        account.hashed_password = hash_password("old password", 4).unwrap();
        state.users.insert(account).await.unwrap()
    }

    #[tokio::test]
    async fn verification_flow() {
        let (state, notifier) = state();
        let alice = member(&state, "alice").await;
        let accounts = AccountService::new(&state);

        accounts
            .request_verify_token("ALICE@example.com")
            .await
            .unwrap();
        let token = notifier.last_verify().unwrap();

        let verified = accounts.verify(&token).await.unwrap();
        assert_eq!(verified.id, alice.id);
        assert!(verified.is_verified);

        let again = accounts.verify(&token).await;
        assert!(matches!(again, Err(ApiError::AlreadyVerified)));

        // nothing more to send once verified
        accounts.request_verify_token("alice@example.com").await.unwrap();
        assert_eq!(notifier.verify.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_addresses_are_silently_accepted() {
        let (state, notifier) = state();
        member(&state, "alice").await;
        let accounts = AccountService::new(&state);

        accounts.request_verify_token("nobody@example.com").await.unwrap();
        accounts.forgot_password("nobody@example.com").await.unwrap();
        // a username is not an email address
        accounts.forgot_password("alice").await.unwrap();

        assert!(notifier.last_verify().is_none());
        assert!(notifier.last_reset().is_none());
    }

    #[tokio::test]
    async fn bad_tokens_are_rejected() {
        let (state, _) = state();
        let alice = member(&state, "alice").await;
        let accounts = AccountService::new(&state);
        let access_token = create_token(&alice, "secret", Duration::from_secs(60)).unwrap();

        assert!(matches!(
            accounts.verify("garbage").await,
            Err(ApiError::VerifyBadToken)
        ));
        assert!(matches!(
            accounts.verify(&access_token).await,
            Err(ApiError::VerifyBadToken)
        ));
        assert!(matches!(
            accounts.reset_password(&access_token, "new password").await,
            Err(ApiError::ResetBadToken)
        ));
    }

    #[tokio::test]
    async fn reset_changes_password_and_revokes_old_tokens() {
        let (state, notifier) = state();
        let alice = member(&state, "alice").await;
        let accounts = AccountService::new(&state);

        accounts.forgot_password("alice@example.com").await.unwrap();
        let first = notifier.last_reset().unwrap();
        accounts.forgot_password("alice@example.com").await.unwrap();
        let second = notifier.last_reset().unwrap();

        // a verify token is not a reset token
        accounts.request_verify_token("alice@example.com").await.unwrap();
        let verify = notifier.last_verify().unwrap();
        assert!(matches!(
            accounts.reset_password(&verify, "new password").await,
            Err(ApiError::ResetBadToken)
        ));

        let updated = accounts.reset_password(&second, "new password").await.unwrap();
        assert_ne!(updated.security_stamp, alice.security_stamp);

        let users = state.users.as_ref();
        assert!(authenticate(users, "alice", "new password", 4).await.is_ok());
        assert!(matches!(
            authenticate(users, "alice", "old password", 4).await,
            Err(ApiError::InvalidCredentials)
        ));

        for stale in [first, second] {
            assert!(matches!(
                accounts.reset_password(&stale, "another password").await,
                Err(ApiError::ResetBadToken)
            ));
        }
    }
}

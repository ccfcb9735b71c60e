use crate::models::User;
use async_trait::async_trait;
use tracing::info;

/// Delivers account tokens to their owner. There is no mail transport, so the
/// shipped implementation only writes them to the log.
#[async_trait]
pub trait AccountNotifier: Send + Sync {
    async fn verification_requested(&self, user: &User, token: &str);

    async fn password_reset_requested(&self, user: &User, token: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl AccountNotifier for LogNotifier {
    async fn verification_requested(&self, user: &User, token: &str) {
        info!(
            "Verification requested for user {} ({}). Verification token: {}",
            user.id, user.email, token
        );
    }

    async fn password_reset_requested(&self, user: &User, token: &str) {
        info!(
            "Password reset requested for user {} ({}). Reset token: {}",
            user.id, user.email, token
        );
    }
}

use crate::{
    config::Config,
    notify::{AccountNotifier, LogNotifier},
    store::{DiskImageStore, ImageStore, MemoryStore, PostStore, ReactionStore, UserStore},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::sync::Arc;

// ============================================================================
// APPLICATION STATE - Shared data across all requests
// ============================================================================
/// Stores are trait objects so handlers never depend on the backend.
/// Everything is behind `Arc`, so cloning the state per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub reactions: Arc<dyn ReactionStore>,
    pub images: Arc<dyn ImageStore>,
    pub notifier: Arc<dyn AccountNotifier>,
    /// Login attempts, keyed by the lowercased login name.
    pub login_limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl AppState {
    /// In-memory stores plus on-disk images under the configured static dir.
    pub fn new(config: Config) -> Self {
        let store = MemoryStore::new();
        let images = DiskImageStore::new(config.post_images_dir());
        let login_limiter = RateLimiter::keyed(Quota::per_second(config.login_rate_per_second));

        Self {
            users: Arc::new(store.clone()),
            posts: Arc::new(store.clone()),
            reactions: Arc::new(store),
            images: Arc::new(images),
            notifier: Arc::new(LogNotifier),
            login_limiter: Arc::new(login_limiter),
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// BLOG API - posts, preview images and per-user reactions
// ============================================================================

use reactions_blog::{AppState, app, config::Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    tokio::fs::create_dir_all(config.post_images_dir()).await?;

    let addr = config.bind_addr();
    info!(
        "Reaction kinds: {:?}, page limit: {}",
        config.reaction_kinds, config.api_posts_limit
    );

    let state = AppState::new(config);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("API Endpoints:");
    info!("  GET    /health                  - Health check");
    info!("  POST   /api/auth/register       - Create account");
    info!("  POST   /api/auth/login          - Login");
    info!("  POST   /api/auth/request-verify-token - Send email verification token");
    info!("  POST   /api/auth/verify         - Verify email");
    info!("  POST   /api/auth/forgot-password - Send password reset token");
    info!("  POST   /api/auth/reset-password - Reset password");
    info!("  GET    /api/users/me            - Get current user (auth)");
    info!("  GET    /api/posts/single        - Get one post");
    info!("  GET    /api/posts/list          - List posts (paginated)");
    info!("  POST   /api/posts/single        - Create post (auth)");
    info!("  PATCH  /api/posts/single        - Edit post (auth, author only)");
    info!("  POST   /api/posts/reaction      - Set or clear reaction (auth)");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

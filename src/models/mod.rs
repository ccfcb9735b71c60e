mod post;
mod reaction;
mod user;

pub use post::{NewPost, Post};
pub use reaction::PostReaction;
pub use user::User;

mod accounts;
mod assembler;
mod authors;
mod posts;
mod reactions;

pub use accounts::AccountService;
pub use assembler::{PostAssembler, STATIC_POSTS_PREFIX};
pub use authors::{AuthorCache, AuthorResolver};
pub use posts::{PostService, effective_limit, image_extension, parse_post_id};
pub use reactions::{ReactionHandler, ReactionTransition};

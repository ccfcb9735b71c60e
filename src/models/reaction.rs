use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub reaction: String,
}

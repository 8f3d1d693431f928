use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize)]
pub struct UserCreateRequest {
    pub name: String,
    #[serde(default)]
    pub contact: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MembershipLimitRequest {
    pub limit: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentCreateRequest {
    pub author: String,
    pub body: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GalleryItemCreateRequest {
    pub owner_id: Uuid,
    pub title: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageCreateRequest {
    pub body: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageReplyRequest {
    pub owner_id: Uuid,
    pub body: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PlanCreateRequest {
    pub author_id: Uuid,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub user_id: Uuid,
    pub activity: String,
    pub action: &'static str,
}

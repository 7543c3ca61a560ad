use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::{CommentStatus, comment_entity};

pub const MAX_COMMENT_LENGTH: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub body: String,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<comment_entity::Model> for CommentResponse {
    fn from(m: comment_entity::Model) -> Self {
        Self {
            id: m.id,
            post_id: m.post_id,
            body: m.body,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    pub post_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub body: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateCommentResponse {
    pub message: String,
    pub comment: CommentResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentListResponse {
    pub comments: Vec<CommentResponse>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ModerateCommentRequest {
    pub id: String,
    pub status: CommentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModerateCommentResponse {
    pub comment: CommentResponse,
}

use sea_orm::DatabaseConnection;

use crate::entities::CommentStatus;
use crate::error::{AppError, AppResult};
use crate::models::{
    CommentListResponse, CommentResponse, CreateCommentRequest, CreateCommentResponse,
    MAX_COMMENT_LENGTH, ModerateCommentRequest, ModerateCommentResponse,
};
use crate::repositories::{CommentRepository, PostRepository};
use crate::services::SettingService;

pub const COMMENT_RECEIVED_MESSAGE: &str = "Comment received and awaiting moderation.";

#[derive(Clone)]
pub struct CommentService {
    comments: CommentRepository,
    posts: PostRepository,
    settings: SettingService,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            comments: CommentRepository::new(db.clone()),
            posts: PostRepository::new(db.clone()),
            settings: SettingService::new(db),
        }
    }

    pub async fn create(&self, request: CreateCommentRequest) -> AppResult<CreateCommentResponse> {
        let body = request.body.trim();
        let length = body.chars().count();
        if length == 0 || length > MAX_COMMENT_LENGTH {
            return Err(AppError::invalid_field(
                "body",
                format!("must be between 1 and {MAX_COMMENT_LENGTH} characters"),
            ));
        }

        let post = self
            .posts
            .find_published_by_id(&request.post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", request.post_id)))?;
        if !post.comments_enabled || !self.settings.comments_enabled().await? {
            return Err(AppError::CommentsDisabled);
        }

        let comment = self.comments.create(&post.id, body).await?;
        log::info!("Comment {} queued for moderation on post {}", comment.id, post.slug);

        Ok(CreateCommentResponse {
            message: COMMENT_RECEIVED_MESSAGE.to_string(),
            comment: comment.into(),
        })
    }

    /// Approved comments only, oldest first.
    pub async fn list_for_post(&self, post_id: &str) -> AppResult<CommentListResponse> {
        let comments = self
            .comments
            .list_for_post(post_id, CommentStatus::Approved)
            .await?
            .into_iter()
            .map(CommentResponse::from)
            .collect();
        Ok(CommentListResponse { comments })
    }

    pub async fn list_all(&self) -> AppResult<CommentListResponse> {
        let comments = self
            .comments
            .list_all()
            .await?
            .into_iter()
            .map(CommentResponse::from)
            .collect();
        Ok(CommentListResponse { comments })
    }

    pub async fn moderate(&self, request: ModerateCommentRequest) -> AppResult<ModerateCommentResponse> {
        let comment = self
            .comments
            .update_status(&request.id, request.status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {}", request.id)))?;
        log::info!("Comment {} moderated to {:?}", comment.id, comment.status);
        Ok(ModerateCommentResponse {
            comment: comment.into(),
        })
    }
}

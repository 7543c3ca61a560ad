use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{CommentStatus, comment_entity};

#[derive(Clone)]
pub struct CommentRepository {
    db: DatabaseConnection,
}

impl CommentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, post_id: &str, body: &str) -> Result<comment_entity::Model, DbErr> {
        comment_entity::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            post_id: Set(post_id.to_string()),
            body: Set(body.to_string()),
            status: Set(CommentStatus::Pending),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
    }

    /// Oldest first.
    pub async fn list_for_post(
        &self,
        post_id: &str,
        status: CommentStatus,
    ) -> Result<Vec<comment_entity::Model>, DbErr> {
        comment_entity::Entity::find()
            .filter(comment_entity::Column::PostId.eq(post_id))
            .filter(comment_entity::Column::Status.eq(status))
            .order_by_asc(comment_entity::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// Newest first.
    pub async fn list_all(&self) -> Result<Vec<comment_entity::Model>, DbErr> {
        comment_entity::Entity::find()
            .order_by_desc(comment_entity::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: CommentStatus,
    ) -> Result<Option<comment_entity::Model>, DbErr> {
        let Some(comment) = comment_entity::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let mut active = comment.into_active_model();
        active.status = Set(status);
        Ok(Some(active.update(&self.db).await?))
    }
}

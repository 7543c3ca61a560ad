use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entities::{
    PostStatus, comment_entity, post_category_entity, post_entity, post_tag_entity,
    purchase_entity, user_entity,
};
use crate::models::{AdminPostEditable, AdminPostListItem};
use crate::utils::PaginationParams;

async fn replace_links<C: ConnectionTrait>(
    db: &C,
    post_id: &str,
    category_ids: Option<&[String]>,
    tag_ids: Option<&[String]>,
) -> Result<(), DbErr> {
    if let Some(ids) = category_ids {
        post_category_entity::Entity::delete_many()
            .filter(post_category_entity::Column::PostId.eq(post_id))
            .exec(db)
            .await?;
        let links: Vec<post_category_entity::ActiveModel> = ids
            .iter()
            .map(|id| post_category_entity::ActiveModel {
                post_id: Set(post_id.to_string()),
                category_id: Set(id.clone()),
            })
            .collect();
        if !links.is_empty() {
            post_category_entity::Entity::insert_many(links)
                .exec_without_returning(db)
                .await?;
        }
    }

    if let Some(ids) = tag_ids {
        post_tag_entity::Entity::delete_many()
            .filter(post_tag_entity::Column::PostId.eq(post_id))
            .exec(db)
            .await?;
        let links: Vec<post_tag_entity::ActiveModel> = ids
            .iter()
            .map(|id| post_tag_entity::ActiveModel {
                post_id: Set(post_id.to_string()),
                tag_id: Set(id.clone()),
            })
            .collect();
        if !links.is_empty() {
            post_tag_entity::Entity::insert_many(links)
                .exec_without_returning(db)
                .await?;
        }
    }

    Ok(())
}

/// Unfiltered access to posts for the CMS, regardless of status or date.
#[derive(Clone)]
pub struct PostAdminRepository {
    db: DatabaseConnection,
}

impl PostAdminRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn author_emails(&self, ids: Vec<String>) -> Result<HashMap<String, String>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(user_entity::Entity::find()
            .filter(user_entity::Column::Id.is_in(ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.email))
            .collect())
    }

    pub async fn list(
        &self,
        status: Option<PostStatus>,
        pagination: &PaginationParams,
    ) -> Result<(Vec<AdminPostListItem>, u64), DbErr> {
        let mut query = post_entity::Entity::find();
        if let Some(status) = status {
            query = query.filter(post_entity::Column::Status.eq(status));
        }

        let total = query.clone().count(&self.db).await?;
        let posts = query
            .order_by_desc(post_entity::Column::UpdatedAt)
            .offset(pagination.get_offset())
            .limit(pagination.get_limit())
            .all(&self.db)
            .await?;

        let emails = self
            .author_emails(posts.iter().map(|p| p.author_id.clone()).collect())
            .await?;
        let items = posts
            .into_iter()
            .map(|p| {
                let email = emails.get(&p.author_id).cloned().unwrap_or_default();
                AdminPostListItem::from_model(p, email)
            })
            .collect();
        Ok((items, total))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<post_entity::Model>, DbErr> {
        post_entity::Entity::find_by_id(id.to_string()).one(&self.db).await
    }

    pub async fn find_editable(&self, id: &str) -> Result<Option<AdminPostEditable>, DbErr> {
        let Some(post) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let category_ids = post_category_entity::Entity::find()
            .filter(post_category_entity::Column::PostId.eq(id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|l| l.category_id)
            .collect();
        let tag_ids = post_tag_entity::Entity::find()
            .filter(post_tag_entity::Column::PostId.eq(id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|l| l.tag_id)
            .collect();
        let email = self
            .author_emails(vec![post.author_id.clone()])
            .await?
            .remove(&post.author_id)
            .unwrap_or_default();

        Ok(Some(AdminPostEditable::from_parts(post, email, category_ids, tag_ids)))
    }

    pub async fn slug_taken(&self, slug: &str, exclude_id: Option<&str>) -> Result<bool, DbErr> {
        let mut query = post_entity::Entity::find().filter(post_entity::Column::Slug.eq(slug));
        if let Some(id) = exclude_id {
            query = query.filter(post_entity::Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    pub async fn create(
        &self,
        post: post_entity::ActiveModel,
        category_ids: &[String],
        tag_ids: &[String],
    ) -> Result<post_entity::Model, DbErr> {
        let txn = self.db.begin().await?;
        let created = post.insert(&txn).await?;
        replace_links(&txn, &created.id, Some(category_ids), Some(tag_ids)).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// `None` link lists leave the existing associations untouched.
    pub async fn update(
        &self,
        post: post_entity::ActiveModel,
        category_ids: Option<&[String]>,
        tag_ids: Option<&[String]>,
    ) -> Result<post_entity::Model, DbErr> {
        let txn = self.db.begin().await?;
        let updated = post.update(&txn).await?;
        replace_links(&txn, &updated.id, category_ids, tag_ids).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Removes the post with its links, comments and purchases. `false` when it did not exist.
    pub async fn delete(&self, id: &str) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;
        post_category_entity::Entity::delete_many()
            .filter(post_category_entity::Column::PostId.eq(id))
            .exec(&txn)
            .await?;
        post_tag_entity::Entity::delete_many()
            .filter(post_tag_entity::Column::PostId.eq(id))
            .exec(&txn)
            .await?;
        comment_entity::Entity::delete_many()
            .filter(comment_entity::Column::PostId.eq(id))
            .exec(&txn)
            .await?;
        purchase_entity::Entity::delete_many()
            .filter(purchase_entity::Column::PostId.eq(id))
            .exec(&txn)
            .await?;
        let result = post_entity::Entity::delete_by_id(id.to_string())
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::purchase_entity;

pub const STRIPE_PROVIDER: &str = "stripe";

#[derive(Clone)]
pub struct PurchaseRepository {
    db: DatabaseConnection,
}

impl PurchaseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_user_and_post(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<purchase_entity::Model>, DbErr> {
        purchase_entity::Entity::find()
            .filter(purchase_entity::Column::UserId.eq(user_id))
            .filter(purchase_entity::Column::PostId.eq(post_id))
            .one(&self.db)
            .await
    }

    pub async fn find_by_provider_session(
        &self,
        provider_session_id: &str,
    ) -> Result<Option<purchase_entity::Model>, DbErr> {
        purchase_entity::Entity::find()
            .filter(purchase_entity::Column::ProviderSessionId.eq(provider_session_id))
            .one(&self.db)
            .await
    }

    /// Upsert keyed on the provider session id. A concurrent insert for the same
    /// reader and post loses on the unique index and resolves to the stored row.
    pub async fn create_purchase(
        &self,
        user_id: &str,
        post_id: &str,
        provider_session_id: &str,
    ) -> Result<purchase_entity::Model, DbErr> {
        let model = purchase_entity::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            post_id: Set(post_id.to_string()),
            provider: Set(STRIPE_PROVIDER.to_string()),
            provider_session_id: Set(provider_session_id.to_string()),
            created_at: Set(Utc::now()),
        };

        let inserted = purchase_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(purchase_entity::Column::ProviderSessionId)
                    .update_columns([purchase_entity::Column::UserId, purchase_entity::Column::PostId])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match inserted {
            Ok(_) => self
                .find_by_provider_session(provider_session_id)
                .await?
                .ok_or_else(|| DbErr::RecordNotFound(provider_session_id.to_string())),
            Err(e) => match self.find_by_user_and_post(user_id, post_id).await? {
                Some(existing) => {
                    log::info!(
                        "Purchase for user {} and post {} already recorded, reusing {}",
                        user_id,
                        post_id,
                        existing.id
                    );
                    Ok(existing)
                }
                None => Err(e),
            },
        }
    }

    #[cfg(test)]
    pub async fn count_for_post(&self, post_id: &str) -> Result<u64, DbErr> {
        purchase_entity::Entity::find()
            .filter(purchase_entity::Column::PostId.eq(post_id))
            .count(&self.db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::testing::{self, PostFixture};

    #[tokio::test]
    async fn test_same_session_upserts_single_row() {
        let db = testing::setup_db().await;
        let user = testing::create_user(&db, "reader@example.com", UserRole::Reader).await;
        let post = testing::create_post(&db, PostFixture::published("paid", &user.id).paid(500)).await;

        let repo = PurchaseRepository::new(db.clone());
        let first = repo.create_purchase(&user.id, &post.id, "cs_1").await.unwrap();
        let second = repo.create_purchase(&user.id, &post.id, "cs_1").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.provider, STRIPE_PROVIDER);
        assert_eq!(repo.count_for_post(&post.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_session_for_same_post_converges() {
        let db = testing::setup_db().await;
        let user = testing::create_user(&db, "reader@example.com", UserRole::Reader).await;
        let post = testing::create_post(&db, PostFixture::published("paid", &user.id).paid(500)).await;

        let repo = PurchaseRepository::new(db.clone());
        let first = repo.create_purchase(&user.id, &post.id, "cs_1").await.unwrap();
        let second = repo.create_purchase(&user.id, &post.id, "cs_2").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.provider_session_id, "cs_1");
        assert_eq!(repo.count_for_post(&post.id).await.unwrap(), 1);
        assert!(repo.find_by_provider_session("cs_2").await.unwrap().is_none());
    }
}

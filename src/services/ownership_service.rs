use sea_orm::DatabaseConnection;

use crate::entities::post_entity;
use crate::error::AppResult;
use crate::models::{OwnershipReason, OwnershipResponse};
use crate::repositories::{PostRepository, PurchaseRepository};

#[derive(Clone)]
pub struct OwnershipService {
    posts: PostRepository,
    purchases: PurchaseRepository,
}

impl OwnershipService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            posts: PostRepository::new(db.clone()),
            purchases: PurchaseRepository::new(db),
        }
    }

    pub async fn check_ownership(&self, user_id: &str, slug: &str) -> AppResult<OwnershipResponse> {
        let Some(post) = self.posts.find_published_by_slug(slug).await? else {
            return Ok(OwnershipResponse::denied(OwnershipReason::NotFound));
        };
        self.access_for(user_id, &post).await
    }

    async fn access_for(&self, user_id: &str, post: &post_entity::Model) -> AppResult<OwnershipResponse> {
        if !post.is_paid {
            return Ok(OwnershipResponse::granted(OwnershipReason::FreeContent));
        }

        let purchase = self.purchases.find_by_user_and_post(user_id, &post.id).await?;
        Ok(match purchase {
            Some(_) => OwnershipResponse::granted(OwnershipReason::Purchased),
            None => OwnershipResponse::denied(OwnershipReason::NotPurchased),
        })
    }

    /// Whether the full body of `post` may be shown to the (possibly anonymous) caller.
    pub async fn can_read(&self, user_id: Option<&str>, post: &post_entity::Model) -> AppResult<bool> {
        if !post.is_paid {
            return Ok(true);
        }
        match user_id {
            Some(user_id) => Ok(self.access_for(user_id, post).await?.has_access),
            None => Ok(false),
        }
    }
}

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, IntoActiveModel, Set};
use uuid::Uuid;

use crate::entities::{PostStatus, post_entity};
use crate::error::{AppError, AppResult, PostError};
use crate::models::common::Validator;
use crate::models::{
    AdminPostEditable, AdminPostListResponse, AdminPostQuery, CreatePostRequest, UpdatePostRequest,
};
use crate::repositories::{CategoryRepository, PostAdminRepository, TagRepository};
use crate::utils::PaginationParams;

/// Publishing state after applying the status rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Publication {
    status: PostStatus,
    published_at: Option<DateTime<Utc>>,
}

fn resolve_publication(
    status: PostStatus,
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Publication, PostError> {
    let published_at = match status {
        PostStatus::Scheduled if published_at.is_none() => {
            return Err(PostError::ScheduledPostRequiresDate);
        }
        PostStatus::Published => Some(published_at.unwrap_or(now)),
        _ => published_at,
    };
    Ok(Publication {
        status,
        published_at,
    })
}

/// Free posts always carry a zero price.
fn resolve_price(is_paid: bool, price_jpy: i64) -> Result<i64, PostError> {
    match (is_paid, price_jpy) {
        (false, _) => Ok(0),
        (true, price) if price > 0 => Ok(price),
        (true, _) => Err(PostError::PaidPostRequiresPrice),
    }
}

#[derive(Clone)]
pub struct AdminPostService {
    posts: PostAdminRepository,
    categories: CategoryRepository,
    tags: TagRepository,
}

impl AdminPostService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            posts: PostAdminRepository::new(db.clone()),
            categories: CategoryRepository::new(db.clone()),
            tags: TagRepository::new(db),
        }
    }

    pub async fn list(&self, query: &AdminPostQuery) -> AppResult<AdminPostListResponse> {
        let pagination = PaginationParams::new(query.page, query.page_size);
        let (items, total) = self.posts.list(query.status, &pagination).await?;
        Ok(AdminPostListResponse {
            items,
            total,
            page: pagination.get_page(),
            page_size: pagination.get_page_size(),
        })
    }

    pub async fn get(&self, id: &str) -> AppResult<AdminPostEditable> {
        self.posts
            .find_editable(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))
    }

    async fn ensure_slug_free(&self, slug: &str, exclude_id: Option<&str>) -> AppResult<()> {
        if self.posts.slug_taken(slug, exclude_id).await? {
            return Err(PostError::SlugTaken.into());
        }
        Ok(())
    }

    async fn ensure_links_exist(
        &self,
        category_ids: Option<&[String]>,
        tag_ids: Option<&[String]>,
    ) -> AppResult<()> {
        let mut v = Validator::new();
        if let Some(ids) = category_ids {
            for id in self.categories.missing_ids(ids).await? {
                v.add("categoryIds", format!("unknown category {id}"));
            }
        }
        if let Some(ids) = tag_ids {
            for id in self.tags.missing_ids(ids).await? {
                v.add("tagIds", format!("unknown tag {id}"));
            }
        }
        v.finish()
    }

    pub async fn create(&self, admin_id: &str, request: CreatePostRequest) -> AppResult<AdminPostEditable> {
        request.validate()?;
        let now = Utc::now();
        let publication = resolve_publication(request.status, request.published_at, now)?;
        let price_jpy = resolve_price(request.is_paid, request.price_jpy)?;
        self.ensure_slug_free(&request.slug, None).await?;
        self.ensure_links_exist(Some(&request.category_ids), Some(&request.tag_ids))
            .await?;

        let post = post_entity::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            slug: Set(request.slug),
            title: Set(request.title),
            excerpt: Set(request.excerpt),
            body: Set(request.body),
            cover_image: Set(request.cover_image),
            status: Set(publication.status),
            published_at: Set(publication.published_at),
            is_paid: Set(request.is_paid),
            price_jpy: Set(price_jpy),
            stripe_product_id: Set(None),
            stripe_price_id: Set(None),
            stripe_price_amount: Set(None),
            read_time: Set(request.read_time),
            comments_enabled: Set(request.comments_enabled),
            author_id: Set(request.author_id.unwrap_or_else(|| admin_id.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = self
            .posts
            .create(post, &request.category_ids, &request.tag_ids)
            .await?;
        log::info!("Post {} created as {} by {}", created.slug, created.status, admin_id);
        self.get(&created.id).await
    }

    pub async fn update(&self, id: &str, request: UpdatePostRequest) -> AppResult<AdminPostEditable> {
        request.validate()?;
        let existing = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;

        let now = Utc::now();
        let publication = resolve_publication(
            request.status.unwrap_or(existing.status),
            request.published_at.unwrap_or(existing.published_at),
            now,
        )?;
        let is_paid = request.is_paid.unwrap_or(existing.is_paid);
        let price_jpy = resolve_price(is_paid, request.price_jpy.unwrap_or(existing.price_jpy))?;
        if let Some(slug) = &request.slug
            && slug != &existing.slug
        {
            self.ensure_slug_free(slug, Some(id)).await?;
        }
        self.ensure_links_exist(request.category_ids.as_deref(), request.tag_ids.as_deref())
            .await?;

        let mut post = existing.into_active_model();
        if let Some(slug) = request.slug {
            post.slug = Set(slug);
        }
        if let Some(title) = request.title {
            post.title = Set(title);
        }
        if let Some(excerpt) = request.excerpt {
            post.excerpt = Set(excerpt);
        }
        if let Some(body) = request.body {
            post.body = Set(body);
        }
        if let Some(read_time) = request.read_time {
            post.read_time = Set(read_time);
        }
        if let Some(cover_image) = request.cover_image {
            post.cover_image = Set(cover_image);
        }
        if let Some(comments_enabled) = request.comments_enabled {
            post.comments_enabled = Set(comments_enabled);
        }
        post.status = Set(publication.status);
        post.published_at = Set(publication.published_at);
        post.is_paid = Set(is_paid);
        post.price_jpy = Set(price_jpy);
        post.updated_at = Set(now);

        self.posts
            .update(post, request.category_ids.as_deref(), request.tag_ids.as_deref())
            .await?;
        log::info!("Post {} updated", id);
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.posts.delete(id).await? {
            return Err(AppError::NotFound(format!("post {id}")));
        }
        log::info!("Post {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::repositories::PurchaseRepository;
    use crate::testing::{self, PostFixture};

    fn create_request(slug: &str, status: PostStatus) -> CreatePostRequest {
        serde_json::from_value(serde_json::json!({
            "slug": slug,
            "title": "Beard care",
            "excerpt": "Oils and balms",
            "body": "## Oils\n\nUse a few drops.",
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn test_publication_rules() {
        let now = Utc::now();
        assert_eq!(
            resolve_publication(PostStatus::Scheduled, None, now),
            Err(PostError::ScheduledPostRequiresDate)
        );
        assert_eq!(
            resolve_publication(PostStatus::Published, None, now).unwrap().published_at,
            Some(now)
        );
        assert_eq!(resolve_publication(PostStatus::Draft, None, now).unwrap().published_at, None);
    }

    #[test]
    fn test_price_rules() {
        assert_eq!(resolve_price(false, 900), Ok(0));
        assert_eq!(resolve_price(true, 900), Ok(900));
        assert_eq!(resolve_price(true, 0), Err(PostError::PaidPostRequiresPrice));
    }

    #[tokio::test]
    async fn test_scheduled_without_date_rejected() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "admin@example.com", UserRole::Admin).await;
        let service = AdminPostService::new(db.clone());

        let err = service
            .create(&admin.id, create_request("later", PostStatus::Scheduled))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SCHEDULED_POST_REQUIRES_DATE");
    }

    #[tokio::test]
    async fn test_create_update_and_slug_conflict() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "admin@example.com", UserRole::Admin).await;
        let category = testing::create_category(&db, "Grooming", "grooming").await;
        let service = AdminPostService::new(db.clone());

        let mut request = create_request("beard-care", PostStatus::Published);
        request.category_ids = vec![category.id.clone()];
        request.price_jpy = 700;
        let created = service.create(&admin.id, request).await.unwrap();
        assert!(created.published_at.is_some());
        assert_eq!(created.price_jpy, 0);
        assert_eq!(created.category_ids, vec![category.id.clone()]);
        assert_eq!(created.author.email, "admin@example.com");

        let err = service
            .create(&admin.id, create_request("beard-care", PostStatus::Draft))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SLUG_TAKEN");

        let updated = service
            .update(
                &created.id,
                UpdatePostRequest {
                    is_paid: Some(true),
                    price_jpy: Some(300),
                    published_at: Some(None),
                    status: Some(PostStatus::Draft),
                    category_ids: Some(vec![]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_paid);
        assert_eq!(updated.price_jpy, 300);
        assert_eq!(updated.published_at, None);
        assert!(updated.category_ids.is_empty());
        assert_eq!(updated.title, "Beard care");
    }

    #[tokio::test]
    async fn test_unknown_taxonomy_ids_rejected_with_details() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "admin@example.com", UserRole::Admin).await;
        let service = AdminPostService::new(db.clone());

        let mut request = create_request("x", PostStatus::Draft);
        request.tag_ids = vec!["nope".into()];
        match service.create(&admin.id, request).await {
            Err(AppError::InvalidBody(Some(details))) => assert!(details.contains_key("tagIds")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_cascades_and_missing_ids_404() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "admin@example.com", UserRole::Admin).await;
        let post = testing::create_post(&db, PostFixture::published("paid", &admin.id).paid(500)).await;
        let purchases = PurchaseRepository::new(db.clone());
        purchases.create_purchase(&admin.id, &post.id, "cs_1").await.unwrap();
        let service = AdminPostService::new(db.clone());

        service.delete(&post.id).await.unwrap();
        assert_eq!(purchases.count_for_post(&post.id).await.unwrap(), 0);
        assert_eq!(service.delete(&post.id).await.unwrap_err().code(), "NOT_FOUND");
        assert_eq!(service.get(&post.id).await.unwrap_err().code(), "NOT_FOUND");
        assert_eq!(
            service.update(&post.id, UpdatePostRequest::default()).await.unwrap_err().code(),
            "NOT_FOUND"
        );
    }
}

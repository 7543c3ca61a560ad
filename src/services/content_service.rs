use sea_orm::DatabaseConnection;

use crate::error::{AppError, AppResult};
use crate::models::{
    AuthorInfo, HomeResponse, PostDetail, PostDetailResponse, TaxonomySummary,
};
use crate::repositories::{CategoryRepository, PostOrder, PostRepository, TagRepository};
use crate::services::OwnershipService;
use crate::utils::extract_toc;

const HOME_LATEST: u64 = 6;
const HOME_POPULAR: u64 = 6;
const HOME_CATEGORIES: u64 = 8;
const HOME_TAGS: u64 = 20;
const RELATED_LIMIT: u64 = 4;

#[derive(Clone)]
pub struct ContentService {
    posts: PostRepository,
    categories: CategoryRepository,
    tags: TagRepository,
    ownership: OwnershipService,
}

impl ContentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            posts: PostRepository::new(db.clone()),
            categories: CategoryRepository::new(db.clone()),
            tags: TagRepository::new(db.clone()),
            ownership: OwnershipService::new(db),
        }
    }

    pub async fn home(&self) -> AppResult<HomeResponse> {
        Ok(HomeResponse {
            latest: self.posts.list_published(PostOrder::Latest, HOME_LATEST).await?,
            popular: self.posts.list_published(PostOrder::Popular, HOME_POPULAR).await?,
            categories: self.categories.list_with_count(Some(HOME_CATEGORIES)).await?,
            tags: self.tags.list_with_count(Some(HOME_TAGS)).await?,
        })
    }

    /// Paid bodies are withheld unless `viewer_id` owns the post.
    pub async fn post_detail(&self, slug: &str, viewer_id: Option<&str>) -> AppResult<PostDetailResponse> {
        let post = self
            .posts
            .find_published_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {slug}")))?;

        let readable = self.ownership.can_read(viewer_id, &post).await?;
        let author = self.posts.find_author(&post.author_id).await?.map(AuthorInfo::from);
        let adjacent = self.posts.find_adjacent(&post).await?;
        let related = self.posts.find_related(&post.id, RELATED_LIMIT).await?;
        let toc = if readable { extract_toc(&post.body) } else { Vec::new() };

        let summary = self
            .posts
            .summaries(vec![post.clone()])
            .await?
            .pop()
            .ok_or_else(|| AppError::InternalError(format!("summary for post {} missing", post.id)))?;

        let detail = PostDetail {
            id: summary.id,
            slug: summary.slug,
            title: summary.title,
            excerpt: summary.excerpt,
            published_at: summary.published_at,
            is_paid: summary.is_paid,
            price_jpy: summary.price_jpy,
            read_time: summary.read_time,
            categories: summary.categories,
            tags: summary.tags,
            status: post.status,
            body: readable.then_some(post.body),
            locked: !readable,
            cover_image: post.cover_image,
            comments_enabled: post.comments_enabled,
            author,
        };

        Ok(PostDetailResponse {
            post: detail,
            toc,
            adjacent,
            related,
        })
    }

    pub async fn categories(&self) -> AppResult<Vec<TaxonomySummary>> {
        Ok(self.categories.list_with_count(None).await?)
    }

    pub async fn category(&self, slug: &str) -> AppResult<TaxonomySummary> {
        self.categories
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category {slug}")))
    }

    pub async fn tags(&self) -> AppResult<Vec<TaxonomySummary>> {
        Ok(self.tags.list_with_count(None).await?)
    }

    pub async fn tag(&self, slug: &str) -> AppResult<TaxonomySummary> {
        self.tags
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("tag {slug}")))
    }
}

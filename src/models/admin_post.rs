use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::{PostStatus, post_entity};
use crate::error::AppResult;
use crate::models::common::{Validator, is_http_url};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AdminPostQuery {
    pub status: Option<PostStatus>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorRef {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminPostListItem {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub status: PostStatus,
    pub is_paid: bool,
    #[serde(rename = "priceJPY")]
    pub price_jpy: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub author: AuthorRef,
}

impl AdminPostListItem {
    pub fn from_model(post: post_entity::Model, author_email: String) -> Self {
        Self {
            author: AuthorRef {
                id: post.author_id,
                email: author_email,
            },
            id: post.id,
            slug: post.slug,
            title: post.title,
            status: post.status,
            is_paid: post.is_paid,
            price_jpy: post.price_jpy,
            published_at: post.published_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminPostListResponse {
    pub items: Vec<AdminPostListItem>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminPostEditable {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub is_paid: bool,
    #[serde(rename = "priceJPY")]
    pub price_jpy: i64,
    pub read_time: i32,
    pub cover_image: Option<String>,
    pub comments_enabled: bool,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_price_amount: Option<i64>,
    pub category_ids: Vec<String>,
    pub tag_ids: Vec<String>,
    pub author: AuthorRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminPostEditable {
    pub fn from_parts(
        post: post_entity::Model,
        author_email: String,
        category_ids: Vec<String>,
        tag_ids: Vec<String>,
    ) -> Self {
        Self {
            author: AuthorRef {
                id: post.author_id,
                email: author_email,
            },
            id: post.id,
            slug: post.slug,
            title: post.title,
            excerpt: post.excerpt,
            body: post.body,
            status: post.status,
            published_at: post.published_at,
            is_paid: post.is_paid,
            price_jpy: post.price_jpy,
            read_time: post.read_time,
            cover_image: post.cover_image,
            comments_enabled: post.comments_enabled,
            stripe_product_id: post.stripe_product_id,
            stripe_price_id: post.stripe_price_id,
            stripe_price_amount: post.stripe_price_amount,
            category_ids,
            tag_ids,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[schema(example = "sauna-basics")]
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub status: PostStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default, rename = "priceJPY")]
    pub price_jpy: i64,
    #[serde(default)]
    pub read_time: i32,
    /// Defaults to the calling admin.
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub comments_enabled: bool,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub status: Option<PostStatus>,
    /// Absent keeps the stored value, `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub is_paid: Option<bool>,
    #[serde(rename = "priceJPY")]
    pub price_jpy: Option<i64>,
    pub read_time: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub cover_image: Option<Option<String>>,
    pub comments_enabled: Option<bool>,
    pub category_ids: Option<Vec<String>>,
    pub tag_ids: Option<Vec<String>>,
}

fn check_slug(v: &mut Validator, slug: &str) {
    v.non_empty("slug", slug);
    if slug.chars().any(|c| c.is_whitespace() || c == '/' || c == '?' || c == '#') {
        v.add("slug", "must not contain whitespace, '/', '?' or '#'");
    }
}

fn check_cover_image(v: &mut Validator, cover: Option<&str>) {
    if let Some(cover) = cover
        && !is_http_url(cover)
        && !cover.starts_with('/')
    {
        v.add("coverImage", "must be an http(s) URL or an absolute path");
    }
}

impl CreatePostRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut v = Validator::new();
        check_slug(&mut v, &self.slug);
        v.non_empty("title", &self.title);
        v.non_empty("excerpt", &self.excerpt);
        v.non_empty("body", &self.body);
        if self.price_jpy < 0 {
            v.add("priceJPY", "must not be negative");
        }
        if self.read_time < 0 {
            v.add("readTime", "must not be negative");
        }
        check_cover_image(&mut v, self.cover_image.as_deref());
        v.finish()
    }
}

impl UpdatePostRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut v = Validator::new();
        if let Some(slug) = &self.slug {
            check_slug(&mut v, slug);
        }
        if let Some(title) = &self.title {
            v.non_empty("title", title);
        }
        if let Some(excerpt) = &self.excerpt {
            v.non_empty("excerpt", excerpt);
        }
        if let Some(body) = &self.body {
            v.non_empty("body", body);
        }
        if self.price_jpy.is_some_and(|p| p < 0) {
            v.add("priceJPY", "must not be negative");
        }
        if self.read_time.is_some_and(|r| r < 0) {
            v.add("readTime", "must not be negative");
        }
        if let Some(cover) = &self.cover_image {
            check_cover_image(&mut v, cover.as_deref());
        }
        v.finish()
    }
}

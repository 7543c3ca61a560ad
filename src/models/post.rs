use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::{PostStatus, post_entity, user_entity};
use crate::utils::TocItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaxonomyRef {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub published_at: Option<DateTime<Utc>>,
    pub is_paid: bool,
    #[serde(rename = "priceJPY")]
    pub price_jpy: i64,
    pub read_time: i32,
    pub categories: Vec<TaxonomyRef>,
    pub tags: Vec<TaxonomyRef>,
}

impl PostSummary {
    pub fn from_model(
        post: post_entity::Model,
        categories: Vec<TaxonomyRef>,
        tags: Vec<TaxonomyRef>,
    ) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            excerpt: post.excerpt,
            published_at: post.published_at,
            is_paid: post.is_paid,
            price_jpy: post.price_jpy,
            read_time: post.read_time,
            categories,
            tags,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorInfo {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

impl From<user_entity::Model> for AuthorInfo {
    fn from(user: user_entity::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// Full article. `body` is withheld and `locked` set for paid posts the caller does not own.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub published_at: Option<DateTime<Utc>>,
    pub is_paid: bool,
    #[serde(rename = "priceJPY")]
    pub price_jpy: i64,
    pub read_time: i32,
    pub categories: Vec<TaxonomyRef>,
    pub tags: Vec<TaxonomyRef>,
    pub status: PostStatus,
    pub body: Option<String>,
    pub locked: bool,
    pub cover_image: Option<String>,
    pub comments_enabled: bool,
    pub author: Option<AuthorInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdjacentPost {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AdjacentPosts {
    pub previous: Option<AdjacentPost>,
    pub next: Option<AdjacentPost>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostDetailResponse {
    pub post: PostDetail,
    pub toc: Vec<TocItem>,
    pub adjacent: AdjacentPosts,
    pub related: Vec<PostSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnershipReason {
    NotFound,
    FreeContent,
    Purchased,
    NotPurchased,
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipResponse {
    pub has_access: bool,
    pub reason: OwnershipReason,
}

impl OwnershipResponse {
    pub fn granted(reason: OwnershipReason) -> Self {
        Self {
            has_access: true,
            reason,
        }
    }

    pub fn denied(reason: OwnershipReason) -> Self {
        Self {
            has_access: false,
            reason,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Case-insensitive substring over title, excerpt, body and tag names.
    pub q: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Tag slug.
    pub tag: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub items: Vec<PostSummary>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomySummary {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub post_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HomeResponse {
    pub latest: Vec<PostSummary>,
    pub popular: Vec<PostSummary>,
    pub categories: Vec<TaxonomySummary>,
    pub tags: Vec<TaxonomySummary>,
}

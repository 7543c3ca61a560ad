use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{
    PostStatus, category_entity, post_category_entity, post_entity, post_tag_entity, tag_entity,
    user_entity,
};
use crate::models::{AdjacentPost, AdjacentPosts, PostSummary, TaxonomyRef};
use crate::utils::PaginationParams;

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub query: Option<String>,
    pub category_slug: Option<String>,
    pub tag_slug: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
    Latest,
    Popular,
}

/// `status = PUBLISHED AND published_at <= now`
pub fn published_condition(now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(post_entity::Column::Status.eq(PostStatus::Published))
        .add(post_entity::Column::PublishedAt.lte(now))
}

/// Escapes LIKE wildcards so user input only ever matches literally.
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn lower_like(column: impl sea_orm::sea_query::IntoColumnRef, pattern: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

/// Categories and tags of each post id, sorted by name.
pub(crate) async fn load_taxonomies<C: ConnectionTrait>(
    db: &C,
    post_ids: &[String],
) -> Result<(HashMap<String, Vec<TaxonomyRef>>, HashMap<String, Vec<TaxonomyRef>>), DbErr> {
    let mut categories: HashMap<String, Vec<TaxonomyRef>> = HashMap::new();
    let mut tags: HashMap<String, Vec<TaxonomyRef>> = HashMap::new();
    if post_ids.is_empty() {
        return Ok((categories, tags));
    }

    let category_links = post_category_entity::Entity::find()
        .filter(post_category_entity::Column::PostId.is_in(post_ids.to_vec()))
        .all(db)
        .await?;
    if !category_links.is_empty() {
        let ids: Vec<String> = category_links.iter().map(|l| l.category_id.clone()).collect();
        let by_id: HashMap<String, category_entity::Model> = category_entity::Entity::find()
            .filter(category_entity::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        for link in category_links {
            if let Some(c) = by_id.get(&link.category_id) {
                categories.entry(link.post_id).or_default().push(TaxonomyRef {
                    slug: c.slug.clone(),
                    name: c.name.clone(),
                });
            }
        }
    }

    let tag_links = post_tag_entity::Entity::find()
        .filter(post_tag_entity::Column::PostId.is_in(post_ids.to_vec()))
        .all(db)
        .await?;
    if !tag_links.is_empty() {
        let ids: Vec<String> = tag_links.iter().map(|l| l.tag_id.clone()).collect();
        let by_id: HashMap<String, tag_entity::Model> = tag_entity::Entity::find()
            .filter(tag_entity::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        for link in tag_links {
            if let Some(t) = by_id.get(&link.tag_id) {
                tags.entry(link.post_id).or_default().push(TaxonomyRef {
                    slug: t.slug.clone(),
                    name: t.name.clone(),
                });
            }
        }
    }

    for list in categories.values_mut().chain(tags.values_mut()) {
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok((categories, tags))
}

/// Read side of posts as seen by readers; every query applies the published gate.
#[derive(Clone)]
pub struct PostRepository {
    db: DatabaseConnection,
}

impl PostRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn summaries(&self, posts: Vec<post_entity::Model>) -> Result<Vec<PostSummary>, DbErr> {
        let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let (mut categories, mut tags) = load_taxonomies(&self.db, &ids).await?;
        Ok(posts
            .into_iter()
            .map(|p| {
                let cats = categories.remove(&p.id).unwrap_or_default();
                let tgs = tags.remove(&p.id).unwrap_or_default();
                PostSummary::from_model(p, cats, tgs)
            })
            .collect())
    }

    /// `None` when a slug filter names nothing, so the caller can short-circuit to empty.
    async fn filter_condition(&self, filters: &SearchFilters) -> Result<Option<Condition>, DbErr> {
        let mut condition = published_condition(Utc::now());

        if let Some(query) = filters.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = like_pattern(query);
            let tagged: Vec<String> = {
                let tag_ids: Vec<String> = tag_entity::Entity::find()
                    .filter(lower_like((tag_entity::Entity, tag_entity::Column::Name), &pattern))
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .map(|t| t.id)
                    .collect();
                self.post_ids_for_tags(tag_ids).await?
            };

            let mut any = Condition::any()
                .add(lower_like((post_entity::Entity, post_entity::Column::Title), &pattern))
                .add(lower_like((post_entity::Entity, post_entity::Column::Excerpt), &pattern))
                .add(lower_like((post_entity::Entity, post_entity::Column::Body), &pattern));
            if !tagged.is_empty() {
                any = any.add(post_entity::Column::Id.is_in(tagged));
            }
            condition = condition.add(any);
        }

        if let Some(slug) = filters.category_slug.as_deref().filter(|s| !s.is_empty()) {
            let Some(category) = category_entity::Entity::find()
                .filter(category_entity::Column::Slug.eq(slug))
                .one(&self.db)
                .await?
            else {
                return Ok(None);
            };
            let post_ids: Vec<String> = post_category_entity::Entity::find()
                .filter(post_category_entity::Column::CategoryId.eq(category.id))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|l| l.post_id)
                .collect();
            if post_ids.is_empty() {
                return Ok(None);
            }
            condition = condition.add(post_entity::Column::Id.is_in(post_ids));
        }

        if let Some(slug) = filters.tag_slug.as_deref().filter(|s| !s.is_empty()) {
            let Some(tag) = tag_entity::Entity::find()
                .filter(tag_entity::Column::Slug.eq(slug))
                .one(&self.db)
                .await?
            else {
                return Ok(None);
            };
            let post_ids = self.post_ids_for_tags(vec![tag.id]).await?;
            if post_ids.is_empty() {
                return Ok(None);
            }
            condition = condition.add(post_entity::Column::Id.is_in(post_ids));
        }

        Ok(Some(condition))
    }

    async fn post_ids_for_tags(&self, tag_ids: Vec<String>) -> Result<Vec<String>, DbErr> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<String> = post_tag_entity::Entity::find()
            .filter(post_tag_entity::Column::TagId.is_in(tag_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|l| l.post_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    pub async fn search_published(
        &self,
        filters: &SearchFilters,
        pagination: &PaginationParams,
    ) -> Result<(Vec<PostSummary>, u64), DbErr> {
        let Some(condition) = self.filter_condition(filters).await? else {
            return Ok((Vec::new(), 0));
        };

        let total = post_entity::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await?;

        let posts = post_entity::Entity::find()
            .filter(condition)
            .order_by_desc(post_entity::Column::PublishedAt)
            .order_by_desc(post_entity::Column::CreatedAt)
            .offset(pagination.get_offset())
            .limit(pagination.get_limit())
            .all(&self.db)
            .await?;

        Ok((self.summaries(posts).await?, total))
    }

    pub async fn list_published(&self, order: PostOrder, limit: u64) -> Result<Vec<PostSummary>, DbErr> {
        let mut query = post_entity::Entity::find().filter(published_condition(Utc::now()));
        query = match order {
            PostOrder::Latest => query.order_by_desc(post_entity::Column::PublishedAt),
            PostOrder::Popular => query
                .order_by_desc(post_entity::Column::ReadTime)
                .order_by_desc(post_entity::Column::PublishedAt),
        };
        let posts = query.limit(limit).all(&self.db).await?;
        self.summaries(posts).await
    }

    pub async fn find_published_by_slug(&self, slug: &str) -> Result<Option<post_entity::Model>, DbErr> {
        post_entity::Entity::find()
            .filter(post_entity::Column::Slug.eq(slug))
            .filter(published_condition(Utc::now()))
            .one(&self.db)
            .await
    }

    pub async fn find_published_by_id(&self, id: &str) -> Result<Option<post_entity::Model>, DbErr> {
        post_entity::Entity::find()
            .filter(post_entity::Column::Id.eq(id))
            .filter(published_condition(Utc::now()))
            .one(&self.db)
            .await
    }

    pub async fn find_author(&self, author_id: &str) -> Result<Option<user_entity::Model>, DbErr> {
        user_entity::Entity::find_by_id(author_id.to_string())
            .one(&self.db)
            .await
    }

    pub async fn find_adjacent(&self, post: &post_entity::Model) -> Result<AdjacentPosts, DbErr> {
        let Some(published_at) = post.published_at else {
            return Ok(AdjacentPosts::default());
        };

        let previous = post_entity::Entity::find()
            .filter(published_condition(Utc::now()))
            .filter(post_entity::Column::PublishedAt.lt(published_at))
            .order_by_desc(post_entity::Column::PublishedAt)
            .one(&self.db)
            .await?;

        let next = post_entity::Entity::find()
            .filter(published_condition(Utc::now()))
            .filter(post_entity::Column::PublishedAt.gt(published_at))
            .order_by_asc(post_entity::Column::PublishedAt)
            .one(&self.db)
            .await?;

        let to_ref = |p: post_entity::Model| AdjacentPost {
            slug: p.slug,
            title: p.title,
        };
        Ok(AdjacentPosts {
            previous: previous.map(to_ref),
            next: next.map(to_ref),
        })
    }

    /// Published posts sharing at least one tag, newest first.
    pub async fn find_related(&self, post_id: &str, limit: u64) -> Result<Vec<PostSummary>, DbErr> {
        let tag_ids: Vec<String> = post_tag_entity::Entity::find()
            .filter(post_tag_entity::Column::PostId.eq(post_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|l| l.tag_id)
            .collect();

        let candidates: Vec<String> = self
            .post_ids_for_tags(tag_ids)
            .await?
            .into_iter()
            .filter(|id| id != post_id)
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let posts = post_entity::Entity::find()
            .filter(published_condition(Utc::now()))
            .filter(post_entity::Column::Id.is_in(candidates))
            .order_by_desc(post_entity::Column::PublishedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        self.summaries(posts).await
    }

    pub async fn update_stripe_references(
        &self,
        post: post_entity::Model,
        product_id: &str,
        price_id: &str,
        amount: i64,
    ) -> Result<post_entity::Model, DbErr> {
        let mut active = post.into_active_model();
        active.stripe_product_id = Set(Some(product_id.to_string()));
        active.stripe_price_id = Set(Some(price_id.to_string()));
        active.stripe_price_amount = Set(Some(amount));
        active.update(&self.db).await
    }
}

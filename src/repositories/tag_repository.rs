use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::{post_entity, post_tag_entity, tag_entity};
use crate::models::TaxonomySummary;
use crate::repositories::post_repository::published_condition;

#[derive(Debug, FromQueryResult)]
struct TagCount {
    tag_id: String,
    post_count: i64,
}

#[derive(Clone)]
pub struct TagRepository {
    db: DatabaseConnection,
}

impl TagRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Number of published posts per tag id.
    async fn published_counts(&self, ids: Vec<String>) -> Result<HashMap<String, u64>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let published = Query::select()
            .column(post_entity::Column::Id)
            .from(post_entity::Entity)
            .cond_where(published_condition(Utc::now()))
            .to_owned();

        let rows = post_tag_entity::Entity::find()
            .select_only()
            .column(post_tag_entity::Column::TagId)
            .column_as(Expr::col(post_tag_entity::Column::PostId).count(), "post_count")
            .filter(post_tag_entity::Column::TagId.is_in(ids))
            .filter(post_tag_entity::Column::PostId.in_subquery(published))
            .group_by(post_tag_entity::Column::TagId)
            .into_model::<TagCount>()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.tag_id, r.post_count.max(0) as u64))
            .collect())
    }

    async fn with_counts(&self, tags: Vec<tag_entity::Model>) -> Result<Vec<TaxonomySummary>, DbErr> {
        let counts = self
            .published_counts(tags.iter().map(|t| t.id.clone()).collect())
            .await?;
        Ok(tags
            .into_iter()
            .map(|t| TaxonomySummary {
                post_count: counts.get(&t.id).copied().unwrap_or(0),
                id: t.id,
                name: t.name,
                slug: t.slug,
            })
            .collect())
    }

    pub async fn list_with_count(&self, limit: Option<u64>) -> Result<Vec<TaxonomySummary>, DbErr> {
        let mut query = tag_entity::Entity::find().order_by_asc(tag_entity::Column::Name);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let tags = query.all(&self.db).await?;
        self.with_counts(tags).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<TaxonomySummary>, DbErr> {
        let Some(tag) = tag_entity::Entity::find()
            .filter(tag_entity::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.with_counts(vec![tag]).await?.pop())
    }

    /// Ids from `ids` that do not exist.
    pub async fn missing_ids(&self, ids: &[String]) -> Result<Vec<String>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<String> = tag_entity::Entity::find()
            .filter(tag_entity::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        Ok(ids.iter().filter(|id| !found.contains(id)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::testing::{self, PostFixture};

    #[tokio::test]
    async fn test_tags_limited_and_counted() {
        let db = testing::setup_db().await;
        let author = testing::create_user(&db, "a@example.com", UserRole::Admin).await;
        let sauna = testing::create_tag(&db, "Sauna", "sauna").await;
        testing::create_tag(&db, "Coffee", "coffee").await;
        testing::create_tag(&db, "Watches", "watches").await;

        let p1 = testing::create_post(&db, PostFixture::published("p1", &author.id)).await;
        let p2 = testing::create_post(&db, PostFixture::published("p2", &author.id)).await;
        testing::link_tag(&db, &p1.id, &sauna.id).await;
        testing::link_tag(&db, &p2.id, &sauna.id).await;

        let repo = TagRepository::new(db.clone());
        let limited = repo.list_with_count(Some(2)).await.unwrap();
        assert_eq!(limited.iter().map(|t| t.slug.as_str()).collect::<Vec<_>>(), vec!["coffee", "sauna"]);
        assert_eq!(limited[1].post_count, 2);
    }
}

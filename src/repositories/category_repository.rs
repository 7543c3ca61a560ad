use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::{category_entity, post_category_entity, post_entity};
use crate::models::TaxonomySummary;
use crate::repositories::post_repository::published_condition;

#[derive(Debug, FromQueryResult)]
struct CategoryCount {
    category_id: String,
    post_count: i64,
}

#[derive(Clone)]
pub struct CategoryRepository {
    db: DatabaseConnection,
}

impl CategoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Number of published posts per category id.
    async fn published_counts(&self, ids: Vec<String>) -> Result<HashMap<String, u64>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let published = Query::select()
            .column(post_entity::Column::Id)
            .from(post_entity::Entity)
            .cond_where(published_condition(Utc::now()))
            .to_owned();

        let rows = post_category_entity::Entity::find()
            .select_only()
            .column(post_category_entity::Column::CategoryId)
            .column_as(Expr::col(post_category_entity::Column::PostId).count(), "post_count")
            .filter(post_category_entity::Column::CategoryId.is_in(ids))
            .filter(post_category_entity::Column::PostId.in_subquery(published))
            .group_by(post_category_entity::Column::CategoryId)
            .into_model::<CategoryCount>()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.category_id, r.post_count.max(0) as u64))
            .collect())
    }

    async fn with_counts(&self, categories: Vec<category_entity::Model>) -> Result<Vec<TaxonomySummary>, DbErr> {
        let counts = self
            .published_counts(categories.iter().map(|c| c.id.clone()).collect())
            .await?;
        Ok(categories
            .into_iter()
            .map(|c| TaxonomySummary {
                post_count: counts.get(&c.id).copied().unwrap_or(0),
                id: c.id,
                name: c.name,
                slug: c.slug,
            })
            .collect())
    }

    pub async fn list_with_count(&self, limit: Option<u64>) -> Result<Vec<TaxonomySummary>, DbErr> {
        let mut query = category_entity::Entity::find().order_by_asc(category_entity::Column::Name);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let categories = query.all(&self.db).await?;
        self.with_counts(categories).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<TaxonomySummary>, DbErr> {
        let Some(category) = category_entity::Entity::find()
            .filter(category_entity::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.with_counts(vec![category]).await?.pop())
    }

    /// Ids from `ids` that do not exist.
    pub async fn missing_ids(&self, ids: &[String]) -> Result<Vec<String>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<String> = category_entity::Entity::find()
            .filter(category_entity::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| c.id)
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
    async fn test_counts_only_published_posts() {
        let db = testing::setup_db().await;
        let author = testing::create_user(&db, "a@example.com", UserRole::Admin).await;
        let grooming = testing::create_category(&db, "Grooming", "grooming").await;
        testing::create_category(&db, "Automotive", "automotive").await;

        let live = testing::create_post(&db, PostFixture::published("live", &author.id)).await;
        let draft = testing::create_post(&db, PostFixture::draft("draft", &author.id)).await;
        testing::link_category(&db, &live.id, &grooming.id).await;
        testing::link_category(&db, &draft.id, &grooming.id).await;

        let repo = CategoryRepository::new(db.clone());
        let all = repo.list_with_count(None).await.unwrap();
        assert_eq!(all.iter().map(|c| c.slug.as_str()).collect::<Vec<_>>(), vec!["automotive", "grooming"]);
        assert_eq!(all[0].post_count, 0);
        assert_eq!(all[1].post_count, 1);

        let one = repo.find_by_slug("grooming").await.unwrap().unwrap();
        assert_eq!(one.post_count, 1);
        assert!(repo.find_by_slug("nope").await.unwrap().is_none());

        let missing = repo
            .missing_ids(&[grooming.id.clone(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(missing, vec!["ghost".to_string()]);
    }
}

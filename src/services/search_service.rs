use sea_orm::DatabaseConnection;

use crate::error::AppResult;
use crate::models::{SearchQuery, SearchResponse};
use crate::repositories::{PostRepository, SearchFilters};
use crate::utils::PaginationParams;

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Clone)]
pub struct SearchService {
    posts: PostRepository,
}

impl SearchService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            posts: PostRepository::new(db),
        }
    }

    pub async fn search(&self, query: &SearchQuery) -> AppResult<SearchResponse> {
        let filters = SearchFilters {
            query: non_blank(&query.q),
            category_slug: non_blank(&query.category),
            tag_slug: non_blank(&query.tag),
        };
        let pagination = PaginationParams::new(query.page, query.page_size);

        let (items, total) = self.posts.search_published(&filters, &pagination).await?;
        log::debug!(
            "Search {:?} matched {} posts (page {})",
            filters.query,
            total,
            pagination.get_page()
        );

        Ok(SearchResponse {
            items,
            total,
            page: pagination.get_page(),
            page_size: pagination.get_page_size(),
        })
    }
}

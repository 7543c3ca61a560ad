use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::SearchService;

#[utoipa::path(
    get,
    path = "/search",
    tag = "content",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching published posts", body = SearchResponse),
        (status = 400, description = "Malformed query string", body = ErrorResponse)
    )
)]
pub async fn search(
    search_service: web::Data<SearchService>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    match search_service.search(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn search_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/search", web::get().to(search));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::handlers::query_config;
    use crate::testing::{self, PostFixture};
    use actix_web::{App, http::StatusCode, test};

    #[actix_web::test]
    async fn test_search_endpoint() {
        let db = testing::setup_db().await;
        let author = testing::create_user(&db, "a@example.com", UserRole::Admin).await;
        testing::create_post(&db, PostFixture::published("sauna-basics", &author.id).title("Sauna basics")).await;
        testing::create_post(&db, PostFixture::published("suits", &author.id).title("Suits")).await;
        let app = test::init_service(
            App::new()
                .app_data(query_config())
                .app_data(web::Data::new(SearchService::new(db.clone())))
                .configure(search_config),
        )
        .await;

        let req = test::TestRequest::get().uri("/search?q=SAUNA&pageSize=5").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["pageSize"], 5);
        assert_eq!(body["items"][0]["slug"], "sauna-basics");

        let req = test::TestRequest::get()
            .uri("/search?page=18446744073709551615")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["items"], serde_json::json!([]));
        assert_eq!(body["total"], 2);

        let req = test::TestRequest::get().uri("/search?page=zero").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

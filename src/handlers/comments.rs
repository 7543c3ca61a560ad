use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::error::AppError;
use crate::models::*;
use crate::services::CommentService;

#[utoipa::path(
    get,
    path = "/comments",
    tag = "comments",
    params(CommentsQuery),
    responses(
        (status = 200, description = "Approved comments, oldest first", body = CommentListResponse),
        (status = 400, description = "postId missing", body = ErrorResponse)
    )
)]
pub async fn list_comments(
    comment_service: web::Data<CommentService>,
    query: web::Query<CommentsQuery>,
) -> Result<HttpResponse> {
    let Some(post_id) = query.post_id.as_deref().filter(|id| !id.trim().is_empty()) else {
        return Ok(AppError::BadRequest("MISSING_POST_ID").error_response());
    };

    match comment_service.list_for_post(post_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/comments",
    tag = "comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Queued for moderation", body = CreateCommentResponse),
        (status = 400, description = "Invalid body or comments disabled", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn create_comment(
    comment_service: web::Data<CommentService>,
    request: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    match comment_service.create(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Created().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn comments_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/comments")
            .route(web::get().to(list_comments))
            .route(web::post().to(create_comment)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::testing::{self, PostFixture};
    use actix_web::{App, http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn test_comment_routes() {
        let db = testing::setup_db().await;
        let author = testing::create_user(&db, "a@example.com", UserRole::Admin).await;
        let post = testing::create_post(&db, PostFixture::published("open", &author.id)).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(CommentService::new(db.clone())))
                .configure(comments_config),
        )
        .await;

        let req = test::TestRequest::get().uri("/comments").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "MISSING_POST_ID");

        let req = test::TestRequest::post()
            .uri("/comments")
            .set_json(json!({"postId": post.id, "body": "Solid advice"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["comment"]["status"], "PENDING");

        let req = test::TestRequest::get()
            .uri(&format!("/comments?postId={}", post.id))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["comments"], json!([]));

        let req = test::TestRequest::post()
            .uri("/comments")
            .set_json(json!({"postId": "missing", "body": "hello"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use futures_util::TryStreamExt;

use crate::error::{AppError, AppResult, MediaError};
use crate::middlewares::require_user;
use crate::models::*;
use crate::services::{AdminPostService, CommentService, MAX_UPLOAD_BYTES, MediaService, SettingService};

const UPLOAD_FIELD: &str = "file";

#[utoipa::path(
    get,
    path = "/admin/posts",
    tag = "admin",
    params(AdminPostQuery),
    responses(
        (status = 200, description = "Posts ordered by last update", body = AdminPostListResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_posts(
    admin_post_service: web::Data<AdminPostService>,
    query: web::Query<AdminPostQuery>,
) -> Result<HttpResponse> {
    match admin_post_service.list(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/posts",
    tag = "admin",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = AdminPostEditable),
        (status = 400, description = "Invalid body, missing schedule date or price", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    req: HttpRequest,
    admin_post_service: web::Data<AdminPostService>,
    request: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let admin = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match admin_post_service.create(&admin.id, request.into_inner()).await {
        Ok(post) => Ok(HttpResponse::Created().json(post)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/posts/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Editable post", body = AdminPostEditable),
        (status = 404, description = "Post not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_post(
    admin_post_service: web::Data<AdminPostService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match admin_post_service.get(&path).await {
        Ok(post) => Ok(HttpResponse::Ok().json(post)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/admin/posts/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = AdminPostEditable),
        (status = 400, description = "Invalid body, missing schedule date or price", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_post(
    admin_post_service: web::Data<AdminPostService>,
    path: web::Path<String>,
    request: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    match admin_post_service.update(&path, request.into_inner()).await {
        Ok(post) => Ok(HttpResponse::Ok().json(post)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/posts/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post and its purchases, comments and links removed", body = OkResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_post(
    admin_post_service: web::Data<AdminPostService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match admin_post_service.delete(&path).await {
        Ok(()) => Ok(HttpResponse::Ok().json(OkResponse::ok())),
        Err(e) => Ok(e.error_response()),
    }
}

struct UploadedFile {
    bytes: Vec<u8>,
    filename: String,
    content_type: String,
}

/// Reads the `file` part, stopping early once it grows past the upload limit.
async fn read_upload(mut payload: Multipart) -> AppResult<Option<UploadedFile>> {
    let malformed = |e: actix_multipart::MultipartError| {
        AppError::invalid_field(UPLOAD_FIELD, format!("malformed multipart body: {e}"))
    };

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let disposition = field.content_disposition();
        if disposition.get_name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = disposition.get_filename().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(MediaError::FileTooLarge.into());
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(Some(UploadedFile {
            bytes,
            filename,
            content_type,
        }));
    }
    Ok(None)
}

async fn store_upload(media_service: &MediaService, payload: Multipart) -> AppResult<MediaUploadResponse> {
    let file = read_upload(payload)
        .await?
        .ok_or(AppError::BadRequest("FILE_REQUIRED"))?;
    media_service
        .upload(file.bytes, &file.filename, &file.content_type)
        .await
}

#[utoipa::path(
    post,
    path = "/admin/media",
    tag = "admin",
    request_body(content = MediaUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = MediaUploadResponse),
        (status = 400, description = "Missing, empty or unsupported file", body = ErrorResponse),
        (status = 413, description = "File larger than 5 MiB", body = ErrorResponse),
        (status = 500, description = "Storage backend failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_media(
    media_service: web::Data<MediaService>,
    payload: Multipart,
) -> Result<HttpResponse> {
    match store_upload(&media_service, payload).await {
        Ok(response) => Ok(HttpResponse::Created().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/settings",
    tag = "admin",
    responses(
        (status = 200, description = "All stored settings", body = SettingsResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_settings(setting_service: web::Data<SettingService>) -> Result<HttpResponse> {
    match setting_service.get_all().await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/settings",
    tag = "admin",
    request_body = BulkSettingsRequest,
    responses(
        (status = 200, description = "All four setting groups written", body = OkResponse),
        (status = 400, description = "Invalid body", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_settings(
    setting_service: web::Data<SettingService>,
    request: web::Json<BulkSettingsRequest>,
) -> Result<HttpResponse> {
    match setting_service.update_bulk(request.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(OkResponse::ok())),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/comments",
    tag = "admin",
    responses(
        (status = 200, description = "Every comment, newest first", body = CommentListResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_comments(comment_service: web::Data<CommentService>) -> Result<HttpResponse> {
    match comment_service.list_all().await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/comments",
    tag = "admin",
    request_body = ModerateCommentRequest,
    responses(
        (status = 200, description = "Status changed", body = ModerateCommentResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn moderate_comment(
    comment_service: web::Data<CommentService>,
    request: web::Json<ModerateCommentRequest>,
) -> Result<HttpResponse> {
    match comment_service.moderate(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(
                web::resource("/posts")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(get_post))
                    .route(web::patch().to(update_post))
                    .route(web::delete().to(delete_post)),
            )
            .route("/media", web::post().to(upload_media))
            .service(
                web::resource("/settings")
                    .route(web::get().to(get_settings))
                    .route(web::put().to(update_settings)),
            )
            .service(
                web::resource("/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(moderate_comment)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::external::LocalStorage;
    use crate::handlers::json_config;
    use crate::middlewares::AuthMiddleware;
    use crate::utils::JwtService;
    use crate::testing;
    use actix_web::http::{StatusCode, header::AUTHORIZATION};
    use actix_web::{App, test};
    use serde_json::json;
    use std::sync::Arc;

    const BOUNDARY: &str = "otoko-boundary";

    fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    #[actix_web::test]
    async fn test_admin_post_lifecycle() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "admin@example.com", UserRole::Admin).await;
        let jwt = JwtService::new("admin-secret", 60, 120);
        let token = jwt.generate_access_token(&admin.id, UserRole::Admin).unwrap();
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt))
                .app_data(json_config())
                .app_data(web::Data::new(AdminPostService::new(db.clone())))
                .service(web::scope("/api/v1").configure(admin_config)),
        )
        .await;
        let bearer = format!("Bearer {token}");

        let req = test::TestRequest::post()
            .uri("/api/v1/admin/posts")
            .insert_header((AUTHORIZATION, bearer.clone()))
            .set_json(json!({
                "slug": "sauna-basics",
                "title": "Sauna basics",
                "excerpt": "Heat, cold, rest.",
                "body": "## Heat\n\nSit.",
                "status": "PUBLISHED",
                "isPaid": true,
                "priceJPY": 500
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: serde_json::Value = test::read_body_json(resp).await;
        assert!(created["publishedAt"].is_string());
        assert_eq!(created["author"]["email"], "admin@example.com");
        let id = created["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/admin/posts/{id}"))
            .insert_header((AUTHORIZATION, bearer.clone()))
            .set_json(json!({"isPaid": false}))
            .to_request();
        let updated: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["priceJPY"], 0);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/admin/posts/{id}"))
            .insert_header((AUTHORIZATION, bearer.clone()))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"ok": true}));

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/admin/posts/{id}"))
            .insert_header((AUTHORIZATION, bearer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_media_upload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path(), "/uploads"));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(MediaService::new(storage)))
                .configure(admin_config),
        )
        .await;
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");

        let req = test::TestRequest::post()
            .uri("/admin/media")
            .insert_header(("content-type", content_type.clone()))
            .set_payload(multipart_body("file", "Cover.PNG", "image/png", b"\x89PNG fake"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

        let req = test::TestRequest::post()
            .uri("/admin/media")
            .insert_header(("content-type", content_type.clone()))
            .set_payload(multipart_body("image", "a.png", "image/png", b"data"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "FILE_REQUIRED");

        let req = test::TestRequest::post()
            .uri("/admin/media")
            .insert_header(("content-type", content_type))
            .set_payload(multipart_body("file", "notes.txt", "text/plain", b"hello"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "UNSUPPORTED_TYPE");
    }

    #[actix_web::test]
    async fn test_settings_and_moderation_routes() {
        let db = testing::setup_db().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(SettingService::new(db.clone())))
                .app_data(web::Data::new(CommentService::new(db.clone())))
                .configure(admin_config),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/admin/settings")
            .set_json(json!({
                "key": "bulk",
                "value": {
                    "ads": {"articleTop": "top", "articleInline": "inline", "articleBottom": "bottom"},
                    "seo": {"defaultTitle": "Otoko", "defaultDescription": "Style and sauna"},
                    "affiliate": {"utmSource": "otoko", "partnerId": "p-1"},
                    "comments": {"enabled": true}
                }
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"ok": true}));

        let req = test::TestRequest::get().uri("/admin/settings").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["settings"].as_array().map(Vec::len), Some(4));

        let req = test::TestRequest::post()
            .uri("/admin/comments")
            .set_json(json!({"id": "missing", "status": "APPROVED"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

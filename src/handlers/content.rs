use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{ContentService, OwnershipService};

#[utoipa::path(
    get,
    path = "/content/home",
    tag = "content",
    responses(
        (status = 200, description = "Home page sections", body = HomeResponse)
    )
)]
pub async fn home(content_service: web::Data<ContentService>) -> Result<HttpResponse> {
    match content_service.home().await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

/// Paid bodies come back as `null` with `locked: true` unless the caller owns the post.
#[utoipa::path(
    get,
    path = "/posts/{slug}",
    tag = "content",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Published post", body = PostDetailResponse),
        (status = 404, description = "No published post with this slug", body = ErrorResponse)
    ),
    security((), ("bearer_auth" = []))
)]
pub async fn post_detail(
    req: HttpRequest,
    content_service: web::Data<ContentService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let viewer = current_user(&req);
    match content_service
        .post_detail(&path, viewer.as_ref().map(|u| u.id.as_str()))
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/posts/{slug}/ownership",
    tag = "content",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Caller may read the post", body = OwnershipResponse),
        (status = 401, description = "Not signed in", body = OwnershipResponse),
        (status = 403, description = "Post missing or not purchased", body = OwnershipResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn ownership(
    req: HttpRequest,
    ownership_service: web::Data<OwnershipService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let Some(user) = current_user(&req) else {
        return Ok(HttpResponse::Unauthorized()
            .json(OwnershipResponse::denied(OwnershipReason::Unauthenticated)));
    };

    match ownership_service.check_ownership(&user.id, &path).await {
        Ok(response) if response.has_access => Ok(HttpResponse::Ok().json(response)),
        Ok(response) => Ok(HttpResponse::Forbidden().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = "content",
    responses(
        (status = 200, description = "All categories with published post counts", body = [TaxonomySummary])
    )
)]
pub async fn categories(content_service: web::Data<ContentService>) -> Result<HttpResponse> {
    match content_service.categories().await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/categories/{slug}",
    tag = "content",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category", body = TaxonomySummary),
        (status = 404, description = "Unknown category", body = ErrorResponse)
    )
)]
pub async fn category(
    content_service: web::Data<ContentService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match content_service.category(&path).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tags",
    tag = "content",
    responses(
        (status = 200, description = "All tags with published post counts", body = [TaxonomySummary])
    )
)]
pub async fn tags(content_service: web::Data<ContentService>) -> Result<HttpResponse> {
    match content_service.tags().await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tags/{slug}",
    tag = "content",
    params(("slug" = String, Path, description = "Tag slug")),
    responses(
        (status = 200, description = "Tag", body = TaxonomySummary),
        (status = 404, description = "Unknown tag", body = ErrorResponse)
    )
)]
pub async fn tag(
    content_service: web::Data<ContentService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match content_service.tag(&path).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn content_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/content/home", web::get().to(home))
        .service(
            web::scope("/posts")
                .route("/{slug}", web::get().to(post_detail))
                .route("/{slug}/ownership", web::get().to(ownership)),
        )
        .service(
            web::scope("/categories")
                .route("", web::get().to(categories))
                .route("/{slug}", web::get().to(category)),
        )
        .service(
            web::scope("/tags")
                .route("", web::get().to(tags))
                .route("/{slug}", web::get().to(tag)),
        );
}

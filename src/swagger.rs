use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{CommentStatus, PostStatus, UserRole};
use crate::handlers;
use crate::models::*;
use crate::utils::TocItem;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::search::search,
        handlers::content::home,
        handlers::content::post_detail,
        handlers::content::ownership,
        handlers::content::categories,
        handlers::content::category,
        handlers::content::tags,
        handlers::content::tag,
        handlers::checkout::create_checkout,
        handlers::checkout::confirm_checkout,
        handlers::comments::list_comments,
        handlers::comments::create_comment,
        handlers::admin::list_posts,
        handlers::admin::create_post,
        handlers::admin::get_post,
        handlers::admin::update_post,
        handlers::admin::delete_post,
        handlers::admin::upload_media,
        handlers::admin::get_settings,
        handlers::admin::update_settings,
        handlers::admin::list_comments,
        handlers::admin::moderate_comment,
    ),
    components(
        schemas(
            ErrorResponse,
            OkResponse,
            UserRole,
            PostStatus,
            CommentStatus,
            LoginRequest,
            RefreshTokenRequest,
            AuthResponse,
            UserInfo,
            TaxonomyRef,
            TaxonomySummary,
            PostSummary,
            AuthorInfo,
            PostDetail,
            AdjacentPost,
            AdjacentPosts,
            PostDetailResponse,
            TocItem,
            OwnershipReason,
            OwnershipResponse,
            SearchResponse,
            HomeResponse,
            CreateCheckoutRequest,
            CheckoutSessionResponse,
            ConfirmCheckoutRequest,
            ConfirmCheckoutResponse,
            WebhookResponse,
            CommentResponse,
            CreateCommentRequest,
            CreateCommentResponse,
            CommentListResponse,
            ModerateCommentRequest,
            ModerateCommentResponse,
            AuthorRef,
            AdminPostListItem,
            AdminPostListResponse,
            AdminPostEditable,
            CreatePostRequest,
            UpdatePostRequest,
            MediaUploadForm,
            MediaUploadResponse,
            SettingItem,
            SettingsResponse,
            AdsSettings,
            SeoSettings,
            AffiliateSettings,
            CommentSettings,
            BulkSettingsValue,
            BulkSettingsRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Sign-in and token refresh"),
        (name = "content", description = "Published posts, taxonomy and search"),
        (name = "checkout", description = "Paid post checkout"),
        (name = "comments", description = "Reader comments"),
        (name = "admin", description = "Post, media, settings and comment administration"),
    ),
    info(
        title = "Otoko Press API",
        version = "0.1.0",
        description = "Publishing backend for a men's lifestyle magazine. \
            The Stripe webhook is served at /webhook/stripe outside this base path."
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/posts/{slug}/ownership"));
        assert!(doc.paths.paths.contains_key("/admin/posts/{id}"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}

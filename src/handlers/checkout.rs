use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

use crate::error::AppResult;
use crate::middlewares::require_user;
use crate::models::*;
use crate::services::CheckoutService;

async fn create_session(
    req: &HttpRequest,
    checkout_service: &CheckoutService,
    request: &CreateCheckoutRequest,
) -> AppResult<CheckoutSessionResponse> {
    let user = require_user(req)?;
    request.validate()?;
    checkout_service.create_session_for_post(&user.id, request).await
}

#[utoipa::path(
    post,
    path = "/checkout",
    tag = "checkout",
    request_body = CreateCheckoutRequest,
    responses(
        (status = 200, description = "Hosted checkout session created", body = CheckoutSessionResponse),
        (status = 400, description = "Invalid body, free post or already purchased", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse),
        (status = 503, description = "No payment gateway configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_checkout(
    req: HttpRequest,
    checkout_service: web::Data<CheckoutService>,
    request: web::Json<CreateCheckoutRequest>,
) -> Result<HttpResponse> {
    match create_session(&req, &checkout_service, &request).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

/// Synchronous counterpart of the webhook: records the purchase as soon as the buyer returns.
#[utoipa::path(
    post,
    path = "/checkout/confirm",
    tag = "checkout",
    request_body = ConfirmCheckoutRequest,
    responses(
        (status = 200, description = "Purchase recorded or already owned", body = ConfirmCheckoutResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Session belongs to another user", body = ErrorResponse),
        (status = 404, description = "Session or post not found", body = ErrorResponse),
        (status = 409, description = "Session not paid", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn confirm_checkout(
    req: HttpRequest,
    checkout_service: web::Data<CheckoutService>,
    request: web::Json<ConfirmCheckoutRequest>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match checkout_service
        .confirm_session(&request.session_id, &user.id)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn checkout_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/checkout")
            .route("", web::post().to(create_checkout))
            .route("/confirm", web::post().to(confirm_checkout)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::external::{MockStripeGateway, PaymentGateway};
    use crate::middlewares::AuthMiddleware;
    use crate::testing::{self, PostFixture};
    use crate::utils::JwtService;
    use actix_web::http::{StatusCode, header::AUTHORIZATION};
    use actix_web::{App, test};
    use serde_json::json;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_checkout_then_confirm() {
        let db = testing::setup_db().await;
        let reader = testing::create_user(&db, "reader@example.com", UserRole::Reader).await;
        let post = testing::create_post(&db, PostFixture::published("paid", &reader.id).paid(1200)).await;
        let gateway: Arc<dyn PaymentGateway> = Arc::new(MockStripeGateway::default());
        let jwt = JwtService::new("checkout-secret", 60, 120);
        let token = jwt.generate_access_token(&reader.id, UserRole::Reader).unwrap();
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt))
                .app_data(web::Data::new(CheckoutService::new(db.clone(), Some(gateway))))
                .service(web::scope("/api/v1").configure(checkout_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/checkout")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({"postId": post.id, "successUrl": "/done", "cancelUrl": "/back"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "INVALID_BODY");

        let req = test::TestRequest::post()
            .uri("/api/v1/checkout")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({
                "postId": post.id,
                "successUrl": "https://example.com/posts/paid",
                "cancelUrl": "https://example.com/posts/paid"
            }))
            .to_request();
        let session: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let session_id = session["sessionId"].as_str().unwrap().to_string();
        assert!(session["url"].as_str().unwrap().contains(&session_id));

        let req = test::TestRequest::post()
            .uri("/api/v1/checkout/confirm")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({"sessionId": session_id}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"ok": true, "alreadyOwned": false}));
    }

    #[actix_web::test]
    async fn test_checkout_without_gateway() {
        let db = testing::setup_db().await;
        let reader = testing::create_user(&db, "reader@example.com", UserRole::Reader).await;
        let post = testing::create_post(&db, PostFixture::published("paid", &reader.id).paid(1200)).await;
        let jwt = JwtService::new("checkout-secret", 60, 120);
        let token = jwt.generate_access_token(&reader.id, UserRole::Reader).unwrap();
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt))
                .app_data(web::Data::new(CheckoutService::new(db.clone(), None)))
                .service(web::scope("/api/v1").configure(checkout_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/checkout")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({
                "postId": post.id,
                "successUrl": "https://example.com/ok",
                "cancelUrl": "https://example.com/cancel"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "CHECKOUT_UNAVAILABLE");
    }
}

use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::AuthService;

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Malformed email or password", body = ErrorResponse),
        (status = 401, description = "Unknown email or wrong password", body = ErrorResponse)
    )
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    match auth_service.login(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Refresh token invalid or expired", body = ErrorResponse)
    )
)]
pub async fn refresh(
    auth_service: web::Data<AuthService>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse> {
    match auth_service.refresh(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::testing::{self, TEST_PASSWORD};
    use crate::utils::JwtService;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn test_login_endpoint() {
        let db = testing::setup_db().await;
        testing::create_user(&db, "admin@example.com", UserRole::Admin).await;
        let service = AuthService::new(db.clone(), JwtService::new("handler-secret", 60, 120));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .configure(auth_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"email": "admin@example.com", "password": TEST_PASSWORD}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["accessToken"].is_string());
        assert_eq!(body["user"]["role"], "ADMIN");

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"email": "admin@example.com", "password": "not-the-password"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "INVALID_CREDENTIALS");
    }
}

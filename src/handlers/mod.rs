pub mod admin;
pub mod auth;
pub mod checkout;
pub mod comments;
pub mod content;
pub mod search;
pub mod webhook;

pub use admin::admin_config;
pub use auth::auth_config;
pub use checkout::checkout_config;
pub use comments::comments_config;
pub use content::content_config;
pub use search::search_config;
pub use webhook::webhook_config;

use actix_web::web;

use crate::error::{AppError, FieldErrors};

const JSON_BODY_LIMIT: usize = 1 << 20;

fn extractor_details(field: &str, message: String) -> FieldErrors {
    let mut details = FieldErrors::new();
    details.insert(field.to_string(), vec![message]);
    details
}

/// Malformed JSON bodies surface as `INVALID_BODY` instead of actix's plain-text 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            AppError::InvalidBody(Some(extractor_details("body", err.to_string()))).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::InvalidQuery(Some(extractor_details("query", err.to_string()))).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Body {
        name: String,
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Paging {
        page: u64,
    }

    async fn echo(_body: web::Json<Body>) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn paged(_query: web::Query<Paging>) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_extractor_errors_use_error_envelope() {
        let app = test::init_service(
            App::new()
                .app_data(json_config())
                .app_data(query_config())
                .route("/echo", web::post().to(echo))
                .route("/paged", web::get().to(paged)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/echo")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"nope\":1}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "INVALID_BODY");
        assert!(body["details"]["body"].is_array());

        let req = test::TestRequest::get().uri("/paged?page=abc").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "INVALID_QUERY");
    }
}

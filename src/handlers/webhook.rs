use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

use crate::services::PurchaseService;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Stripe webhook endpoint.
///
/// The body is taken as raw bytes so the signature is checked against exactly what was sent.
/// Storage failures answer 500 so Stripe redelivers; redelivery is idempotent.
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    purchase_service: web::Data<PurchaseService>,
) -> Result<HttpResponse> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match purchase_service.handle_webhook(&body, signature).await {
        Ok(response) => {
            log::info!("Webhook processed (handled={})", response.handled);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/stripe", web::post().to(stripe_webhook)));
}

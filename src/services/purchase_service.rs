use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::StripeConfig;
use crate::error::{AppResult, WebhookError};
use crate::external::{CHECKOUT_SESSION_COMPLETED, CheckoutSession, PaymentGateway, WebhookEvent};
use crate::models::WebhookResponse;
use crate::repositories::PurchaseRepository;
use crate::services::checkout_service::{METADATA_POST_ID, METADATA_USER_ID};

/// Records purchases from `checkout.session.completed` deliveries.
#[derive(Clone)]
pub struct PurchaseService {
    purchases: PurchaseRepository,
    gateway: Option<Arc<dyn PaymentGateway>>,
    webhook_secret: String,
}

impl PurchaseService {
    pub fn new(
        db: DatabaseConnection,
        gateway: Option<Arc<dyn PaymentGateway>>,
        stripe_config: &StripeConfig,
    ) -> Self {
        Self {
            purchases: PurchaseRepository::new(db),
            gateway,
            webhook_secret: stripe_config.webhook_secret.clone(),
        }
    }

    /// Verifies the signature over the raw body and applies the event.
    pub async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> AppResult<WebhookResponse> {
        let signature = signature.ok_or(WebhookError::MissingSignature)?;
        let gateway = self.gateway.as_ref().ok_or(WebhookError::NotConfigured)?;
        if self.webhook_secret.is_empty() {
            return Err(WebhookError::SecretNotSet.into());
        }

        let event = gateway.construct_webhook_event(payload, signature, &self.webhook_secret)?;
        log::info!("Received Stripe webhook event: {} ({})", event.event_type, event.id);

        let handled = self.apply_event(&event).await?;
        Ok(WebhookResponse {
            received: true,
            handled,
        })
    }

    async fn apply_event(&self, event: &WebhookEvent) -> AppResult<bool> {
        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            return Ok(false);
        }

        let session: CheckoutSession = match serde_json::from_value(event.data.object.clone()) {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Event {} carries no checkout session: {}", event.id, e);
                return Ok(false);
            }
        };

        let (Some(user_id), Some(post_id)) = (
            session.metadata_value(METADATA_USER_ID),
            session.metadata_value(METADATA_POST_ID),
        ) else {
            log::warn!("Checkout session {} is missing purchase metadata", session.id);
            return Ok(false);
        };
        if session.id.is_empty() {
            return Ok(false);
        }

        if self
            .purchases
            .find_by_provider_session(&session.id)
            .await?
            .is_some()
        {
            log::info!("Checkout session {} already recorded", session.id);
            return Ok(true);
        }

        self.purchases
            .create_purchase(user_id, post_id, &session.id)
            .await?;
        log::info!(
            "Purchase recorded from webhook: session {} user {} post {}",
            session.id,
            user_id,
            post_id
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::external::MockStripeGateway;
    use crate::external::stripe::sign_payload;
    use crate::testing::{self, PostFixture};
    use chrono::Utc;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    fn config() -> StripeConfig {
        StripeConfig {
            secret_key: String::new(),
            webhook_secret: SECRET.to_string(),
            mock: true,
        }
    }

    fn completed_event(session_id: &str, user_id: &str, post_id: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": session_id,
                "mode": "payment",
                "payment_status": "paid",
                "metadata": {"userId": user_id, "postId": post_id}
            }}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_webhook_replay_records_one_purchase() {
        let db = testing::setup_db().await;
        let reader = testing::create_user(&db, "reader@example.com", UserRole::Reader).await;
        let post = testing::create_post(&db, PostFixture::published("paid", &reader.id).paid(500)).await;
        let service = PurchaseService::new(db.clone(), Some(Arc::new(MockStripeGateway::new())), &config());

        let payload = completed_event("cs_test_42", &reader.id, &post.id);
        let signature = sign_payload(&payload, SECRET, Utc::now().timestamp());

        for _ in 0..2 {
            let response = service.handle_webhook(&payload, Some(&signature)).await.unwrap();
            assert_eq!(response, WebhookResponse { received: true, handled: true });
        }
        let purchases = PurchaseRepository::new(db.clone());
        assert_eq!(purchases.count_for_post(&post.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_webhook_rejections() {
        let db = testing::setup_db().await;
        let payload = completed_event("cs_1", "u", "p");
        let signature = sign_payload(&payload, SECRET, Utc::now().timestamp());
        let gateway: Arc<dyn PaymentGateway> = Arc::new(MockStripeGateway::new());

        let service = PurchaseService::new(db.clone(), Some(gateway.clone()), &config());
        let code = |r: AppResult<WebhookResponse>| r.unwrap_err().code();
        assert_eq!(code(service.handle_webhook(&payload, None).await), "MISSING_SIGNATURE");
        let tampered = [payload.as_slice(), b" "].concat();
        assert_eq!(code(service.handle_webhook(&tampered, Some(&signature)).await), "INVALID_SIGNATURE");

        let unconfigured = PurchaseService::new(db.clone(), None, &config());
        assert_eq!(code(unconfigured.handle_webhook(&payload, Some(&signature)).await), "STRIPE_NOT_CONFIGURED");

        let no_secret = PurchaseService::new(db.clone(), Some(gateway), &StripeConfig::default());
        assert_eq!(code(no_secret.handle_webhook(&payload, Some(&signature)).await), "WEBHOOK_SECRET_NOT_SET");
    }

    #[tokio::test]
    async fn test_unrelated_or_incomplete_events_not_handled() {
        let db = testing::setup_db().await;
        let service = PurchaseService::new(db.clone(), Some(Arc::new(MockStripeGateway::new())), &config());
        let now = Utc::now().timestamp();

        let other = serde_json::to_vec(&json!({
            "id": "evt_2", "type": "payment_intent.succeeded", "data": {"object": {"id": "pi_1"}}
        }))
        .unwrap();
        let response = service.handle_webhook(&other, Some(&sign_payload(&other, SECRET, now))).await.unwrap();
        assert!(!response.handled);

        let missing = serde_json::to_vec(&json!({
            "id": "evt_3", "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_2", "metadata": {"userId": "u1"}}}
        }))
        .unwrap();
        let response = service.handle_webhook(&missing, Some(&sign_payload(&missing, SECRET, now))).await.unwrap();
        assert!(!response.handled);
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::StripeConfig;
use crate::error::{AppError, AppResult, WebhookError};

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
/// Maximum age of a signed webhook payload, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Clone)]
pub struct PriceParams {
    pub post_id: String,
    pub title: String,
    pub amount_jpy: i64,
    pub product_id: Option<String>,
    pub price_id: Option<String>,
    pub current_amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceInfo {
    pub product_id: String,
    pub price_id: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CheckoutSession {
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_payment_mode(&self) -> bool {
        self.mode.as_deref() == Some("payment")
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// Checks a `stripe-signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`) against
/// HMAC-SHA256 of `"<t>.<payload>"`. `payload` must be the raw request bytes.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::InvalidSignature)?;
    if candidates.is_empty() || now.abs_diff(signed_at) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(WebhookError::InvalidSignature);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = candidates.into_iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if matched {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

/// Appends `session_id={CHECKOUT_SESSION_ID}` unless the placeholder is already present.
pub fn append_session_placeholder(url: &str) -> String {
    if url.contains("{CHECKOUT_SESSION_ID}") {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}session_id={{CHECKOUT_SESSION_ID}}")
}

/// Payment processor seam: Stripe over REST in production, in-process mock otherwise.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Product is created lazily and prices are immutable: a changed amount mints a new price.
    async fn ensure_price(&self, params: &PriceParams) -> AppResult<PriceInfo>;

    async fn create_checkout_session(&self, params: &CheckoutSessionParams) -> AppResult<CheckoutSession>;

    /// `None` when the processor does not know the session.
    async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<Option<CheckoutSession>>;

    fn construct_webhook_event(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &str,
    ) -> Result<WebhookEvent, WebhookError> {
        verify_signature(payload, signature, secret, Utc::now().timestamp())?;
        serde_json::from_slice(payload).map_err(|e| {
            log::warn!("Signed webhook payload is not a valid event: {}", e);
            WebhookError::InvalidSignature
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
}

#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    config: StripeConfig,
    base_url: String,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            base_url: STRIPE_API_BASE.to_string(),
        }
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> AppResult<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.config.secret_key)
            .form(params)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            log::error!("Stripe POST /{} failed with {}: {}", path, status, error_text);
            Err(AppError::ExternalApiError(format!(
                "Stripe POST /{path} failed with {status}"
            )))
        }
    }

    async fn create_product(&self, name: &str) -> AppResult<String> {
        let params = vec![("name".to_string(), name.to_string())];
        let product: StripeObject = self.post_form("products", &params).await?;
        Ok(product.id)
    }

    /// Rename failures are logged and ignored.
    async fn safe_update_product(&self, product_id: &str, name: &str) {
        let params = vec![("name".to_string(), name.to_string())];
        if let Err(e) = self
            .post_form::<StripeObject>(&format!("products/{product_id}"), &params)
            .await
        {
            log::warn!("Failed to update Stripe product name for {}: {}", product_id, e);
        }
    }
}

fn is_stripe_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn ensure_price(&self, params: &PriceParams) -> AppResult<PriceInfo> {
        let product_id = match &params.product_id {
            Some(existing) => {
                self.safe_update_product(existing, &params.title).await;
                existing.clone()
            }
            None => self.create_product(&params.title).await?,
        };

        if let Some(price_id) = &params.price_id
            && params.current_amount == Some(params.amount_jpy)
        {
            return Ok(PriceInfo {
                product_id,
                price_id: price_id.clone(),
            });
        }

        let form = vec![
            ("currency".to_string(), "jpy".to_string()),
            ("unit_amount".to_string(), params.amount_jpy.to_string()),
            ("product".to_string(), product_id.clone()),
        ];
        let price: StripeObject = self.post_form("prices", &form).await?;
        log::info!(
            "Created Stripe price {} for post {} at {} JPY",
            price.id,
            params.post_id,
            params.amount_jpy
        );

        Ok(PriceInfo {
            product_id,
            price_id: price.id,
        })
    }

    async fn create_checkout_session(&self, params: &CheckoutSessionParams) -> AppResult<CheckoutSession> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), params.success_url.clone()),
            ("cancel_url".to_string(), params.cancel_url.clone()),
            ("line_items[0][price]".to_string(), params.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
        ];
        for (key, value) in &params.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        self.post_form("checkout/sessions", &form).await
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<Option<CheckoutSession>> {
        if !is_stripe_id(session_id) {
            return Ok(None);
        }

        let response = self
            .client
            .get(format!("{}/checkout/sessions/{}", self.base_url, session_id))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown error".to_string());
                log::error!(
                    "Stripe session lookup {} failed with {}: {}",
                    session_id,
                    status,
                    error_text
                );
                Err(AppError::ExternalApiError(format!(
                    "Stripe session lookup failed with {status}"
                )))
            }
        }
    }
}

/// In-process gateway; sessions live for the life of the process and are always paid.
#[derive(Default)]
pub struct MockStripeGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    ensure_price_calls: AtomicUsize,
    create_session_calls: AtomicUsize,
}

impl MockStripeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_price_calls(&self) -> usize {
        self.ensure_price_calls.load(Ordering::SeqCst)
    }

    pub fn create_session_calls(&self) -> usize {
        self.create_session_calls.load(Ordering::SeqCst)
    }

    /// Registers or replaces a session, e.g. an unpaid one.
    pub fn insert_session(&self, session: CheckoutSession) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session.id.clone(), session);
        }
    }
}

#[async_trait]
impl PaymentGateway for MockStripeGateway {
    async fn ensure_price(&self, params: &PriceParams) -> AppResult<PriceInfo> {
        self.ensure_price_calls.fetch_add(1, Ordering::SeqCst);
        let product_id = params
            .product_id
            .clone()
            .unwrap_or_else(|| format!("prod_{}", params.post_id));
        let price_id = match &params.price_id {
            Some(id) if params.current_amount == Some(params.amount_jpy) => id.clone(),
            _ => format!("price_{}_{}", params.post_id, params.amount_jpy),
        };
        Ok(PriceInfo {
            product_id,
            price_id,
        })
    }

    async fn create_checkout_session(&self, params: &CheckoutSessionParams) -> AppResult<CheckoutSession> {
        self.create_session_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        let session = CheckoutSession {
            url: Some(params.success_url.replace("{CHECKOUT_SESSION_ID}", &id)),
            id,
            mode: Some("payment".to_string()),
            payment_status: Some("paid".to_string()),
            metadata: Some(params.metadata.clone()),
        };
        self.insert_session(session.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<Option<CheckoutSession>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| AppError::InternalError("mock session store poisoned".to_string()))?;
        Ok(sessions.get(session_id).cloned())
    }
}

/// `None` when neither a secret key nor mock mode is configured.
pub fn create_payment_gateway(config: &StripeConfig) -> Option<Arc<dyn PaymentGateway>> {
    if config.mock {
        log::info!("Using in-process mock payment gateway");
        return Some(Arc::new(MockStripeGateway::new()));
    }
    if config.secret_key.is_empty() {
        log::warn!("Stripe is not configured; checkout and webhooks are disabled");
        return None;
    }
    Some(Arc::new(StripeGateway::new(config.clone())))
}

#[cfg(test)]
pub(crate) fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = Utc::now().timestamp();
        let header = sign_payload(payload, SECRET, now);
        assert_eq!(verify_signature(payload, &header, SECRET, now), Ok(()));
    }

    #[test]
    fn test_modified_payload_rejected() {
        let now = Utc::now().timestamp();
        let header = sign_payload(br#"{"amount":1}"#, SECRET, now);
        assert_eq!(
            verify_signature(br#"{"amount":2}"#, &header, SECRET, now),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let now = Utc::now().timestamp();
        let header = sign_payload(payload, SECRET, now - 600);
        assert_eq!(
            verify_signature(payload, &header, SECRET, now),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        let now = Utc::now().timestamp();
        for t in [i64::MIN, i64::MAX] {
            assert_eq!(
                verify_signature(b"{}", &format!("t={t},v1=00"), SECRET, now),
                Err(WebhookError::InvalidSignature)
            );
        }
    }

    #[test]
    fn test_any_matching_v1_accepted_and_garbage_rejected() {
        let payload = b"{}";
        let now = Utc::now().timestamp();
        let good = sign_payload(payload, SECRET, now);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={now},v1=deadbeef,v1={good_sig}");
        assert!(verify_signature(payload, &header, SECRET, now).is_ok());

        assert!(verify_signature(payload, "garbage", SECRET, now).is_err());
        assert!(verify_signature(payload, &format!("t={now}"), SECRET, now).is_err());
    }

    #[test]
    fn test_append_session_placeholder() {
        assert_eq!(
            append_session_placeholder("https://x.test/done"),
            "https://x.test/done?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            append_session_placeholder("https://x.test/done?a=1"),
            "https://x.test/done?a=1&session_id={CHECKOUT_SESSION_ID}"
        );
        let templated = "https://x.test/done?sid={CHECKOUT_SESSION_ID}";
        assert_eq!(append_session_placeholder(templated), templated);
    }

    #[tokio::test]
    async fn test_mock_reuses_price_only_when_amount_unchanged() {
        let mock = MockStripeGateway::new();
        let mut params = PriceParams {
            post_id: "p1".into(),
            title: "Paid".into(),
            amount_jpy: 500,
            product_id: None,
            price_id: None,
            current_amount: None,
        };
        let first = mock.ensure_price(&params).await.unwrap();
        assert_eq!(first.price_id, "price_p1_500");

        params.product_id = Some(first.product_id.clone());
        params.price_id = Some(first.price_id.clone());
        params.current_amount = Some(500);
        assert_eq!(mock.ensure_price(&params).await.unwrap(), first);

        params.amount_jpy = 800;
        let changed = mock.ensure_price(&params).await.unwrap();
        assert_eq!(changed.price_id, "price_p1_800");
        assert_eq!(changed.product_id, first.product_id);
        assert_eq!(mock.ensure_price_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_session_round_trip() {
        let mock = MockStripeGateway::new();
        let session = mock
            .create_checkout_session(&CheckoutSessionParams {
                price_id: "price_1".into(),
                success_url: append_session_placeholder("https://x.test/ok"),
                cancel_url: "https://x.test/cancel".into(),
                metadata: HashMap::from([("userId".to_string(), "u1".to_string())]),
            })
            .await
            .unwrap();
        assert!(session.url.as_deref().unwrap().ends_with(&session.id));

        let found = mock.retrieve_checkout_session(&session.id).await.unwrap().unwrap();
        assert!(found.is_paid() && found.is_payment_mode());
        assert_eq!(found.metadata_value("userId"), Some("u1"));
        assert!(mock.retrieve_checkout_session("cs_missing").await.unwrap().is_none());
    }

    #[test]
    fn test_gateway_selection() {
        assert!(create_payment_gateway(&StripeConfig::default()).is_none());
        let mock = StripeConfig {
            mock: true,
            ..Default::default()
        };
        assert!(create_payment_gateway(&mock).is_some());
    }

    #[test]
    fn test_stripe_id_guard() {
        assert!(is_stripe_id("cs_test_a1B2"));
        assert!(!is_stripe_id("../products"));
        assert!(!is_stripe_id(""));
    }
}

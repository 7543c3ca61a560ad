use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::models::common::{Validator, is_http_url};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub post_id: String,
    #[schema(example = "https://example.com/posts/sauna-basics?purchased=1")]
    pub success_url: String,
    #[schema(example = "https://example.com/posts/sauna-basics")]
    pub cancel_url: String,
}

impl CreateCheckoutRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut v = Validator::new();
        v.non_empty("postId", &self.post_id);
        if !is_http_url(&self.success_url) {
            v.add("successUrl", "must be an http(s) URL");
        }
        if !is_http_url(&self.cancel_url) {
            v.add("cancelUrl", "must be an http(s) URL");
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCheckoutRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCheckoutResponse {
    pub ok: bool,
    pub already_owned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    pub received: bool,
    pub handled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_request_requires_absolute_urls() {
        let req = CreateCheckoutRequest {
            post_id: "p1".into(),
            success_url: "/done".into(),
            cancel_url: "https://example.com".into(),
        };
        assert!(req.validate().is_err());
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::entities::setting_entity;
use crate::error::AppResult;
use crate::models::common::Validator;

pub const ADS_KEY: &str = "ads";
pub const SEO_KEY: &str = "seo";
pub const AFFILIATE_KEY: &str = "affiliate";
pub const COMMENTS_KEY: &str = "comments";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettingItem {
    pub key: String,
    #[schema(value_type = Object)]
    pub value: Value,
}

impl From<setting_entity::Model> for SettingItem {
    fn from(m: setting_entity::Model) -> Self {
        Self {
            key: m.key,
            value: m.value,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub settings: Vec<SettingItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdsSettings {
    pub article_top: String,
    pub article_inline: String,
    pub article_bottom: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeoSettings {
    pub default_title: String,
    pub default_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateSettings {
    pub utm_source: String,
    pub partner_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct CommentSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkSettingsValue {
    pub ads: AdsSettings,
    pub seo: SeoSettings,
    pub affiliate: AffiliateSettings,
    pub comments: CommentSettings,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkSettingsRequest {
    #[schema(example = "bulk")]
    pub key: String,
    pub value: BulkSettingsValue,
}

impl BulkSettingsRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut v = Validator::new();
        if self.key != "bulk" {
            v.add("key", "must be \"bulk\"");
        }
        let value = &self.value;
        v.non_empty("ads.articleTop", &value.ads.article_top);
        v.non_empty("ads.articleInline", &value.ads.article_inline);
        v.non_empty("ads.articleBottom", &value.ads.article_bottom);
        v.non_empty("seo.defaultTitle", &value.seo.default_title);
        v.non_empty("seo.defaultDescription", &value.seo.default_description);
        v.non_empty("affiliate.utmSource", &value.affiliate.utm_source);
        v.non_empty("affiliate.partnerId", &value.affiliate.partner_id);
        v.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_request_rejects_blank_fields() {
        let req: BulkSettingsRequest = serde_json::from_value(serde_json::json!({
            "key": "bulk",
            "value": {
                "ads": {"articleTop": "t", "articleInline": "", "articleBottom": "b"},
                "seo": {"defaultTitle": "Title", "defaultDescription": "Desc"},
                "affiliate": {"utmSource": "press", "partnerId": "p-1"},
                "comments": {"enabled": true}
            }
        }))
        .unwrap();
        match req.validate() {
            Err(crate::error::AppError::InvalidBody(Some(details))) => {
                assert_eq!(details.keys().collect::<Vec<_>>(), vec!["ads.articleInline"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

use sea_orm::DatabaseConnection;
use serde_json::Value;

use crate::error::AppResult;
use crate::models::{
    ADS_KEY, AFFILIATE_KEY, BulkSettingsRequest, COMMENTS_KEY, SEO_KEY, SettingItem,
    SettingsResponse,
};
use crate::repositories::SettingRepository;

#[derive(Clone)]
pub struct SettingService {
    settings: SettingRepository,
}

impl SettingService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            settings: SettingRepository::new(db),
        }
    }

    pub async fn get_all(&self) -> AppResult<SettingsResponse> {
        let settings = self
            .settings
            .find_all()
            .await?
            .into_iter()
            .map(SettingItem::from)
            .collect();
        Ok(SettingsResponse { settings })
    }

    pub async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        Ok(self.settings.find_by_key(key).await?)
    }

    pub async fn update(&self, key: &str, value: Value) -> AppResult<()> {
        self.settings.upsert(key, value).await?;
        log::info!("Setting {} updated", key);
        Ok(())
    }

    /// Writes every section of the admin settings screen in one transaction.
    pub async fn update_bulk(&self, request: BulkSettingsRequest) -> AppResult<()> {
        request.validate()?;
        let value = request.value;
        self.settings
            .upsert_many(vec![
                (ADS_KEY, serde_json::to_value(value.ads)?),
                (SEO_KEY, serde_json::to_value(value.seo)?),
                (AFFILIATE_KEY, serde_json::to_value(value.affiliate)?),
                (COMMENTS_KEY, serde_json::to_value(value.comments)?),
            ])
            .await?;
        log::info!("Site settings updated");
        Ok(())
    }

    /// Site-wide comment switch; on unless explicitly `{"enabled": false}`.
    pub async fn comments_enabled(&self) -> AppResult<bool> {
        let enabled = self
            .get(COMMENTS_KEY)
            .await?
            .and_then(|v| v.get("enabled").and_then(Value::as_bool));
        Ok(enabled != Some(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use serde_json::json;

    #[tokio::test]
    async fn test_bulk_update_writes_four_keys() {
        let db = testing::setup_db().await;
        let service = SettingService::new(db.clone());
        assert!(service.comments_enabled().await.unwrap());

        let request: BulkSettingsRequest = serde_json::from_value(json!({
            "key": "bulk",
            "value": {
                "ads": {"articleTop": "top", "articleInline": "inline", "articleBottom": "bottom"},
                "seo": {"defaultTitle": "Otoko", "defaultDescription": "Lifestyle"},
                "affiliate": {"utmSource": "press", "partnerId": "p-1"},
                "comments": {"enabled": false}
            }
        }))
        .unwrap();
        service.update_bulk(request).await.unwrap();

        let keys: Vec<String> = service
            .get_all()
            .await
            .unwrap()
            .settings
            .into_iter()
            .map(|s| s.key)
            .collect();
        assert_eq!(keys, vec!["ads", "affiliate", "comments", "seo"]);
        assert_eq!(
            service.get(SEO_KEY).await.unwrap(),
            Some(json!({"defaultTitle": "Otoko", "defaultDescription": "Lifestyle"}))
        );
        assert!(!service.comments_enabled().await.unwrap());

        service.update(COMMENTS_KEY, json!({"enabled": true})).await.unwrap();
        assert!(service.comments_enabled().await.unwrap());
    }
}

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set, TransactionTrait,
};
use serde_json::Value;

use crate::entities::setting_entity;

#[derive(Clone)]
pub struct SettingRepository {
    db: DatabaseConnection,
}

async fn upsert_on<C: ConnectionTrait>(db: &C, key: &str, value: Value) -> Result<(), DbErr> {
    let model = setting_entity::ActiveModel {
        key: Set(key.to_string()),
        value: Set(value),
        updated_at: Set(Utc::now()),
    };
    setting_entity::Entity::insert(model)
        .on_conflict(
            OnConflict::column(setting_entity::Column::Key)
                .update_columns([setting_entity::Column::Value, setting_entity::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

impl SettingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<Value>, DbErr> {
        Ok(setting_entity::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?
            .map(|s| s.value))
    }

    pub async fn find_all(&self) -> Result<Vec<setting_entity::Model>, DbErr> {
        setting_entity::Entity::find()
            .order_by_asc(setting_entity::Column::Key)
            .all(&self.db)
            .await
    }

    pub async fn upsert(&self, key: &str, value: Value) -> Result<(), DbErr> {
        upsert_on(&self.db, key, value).await
    }

    /// All entries or none.
    pub async fn upsert_many(&self, entries: Vec<(&str, Value)>) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;
        for (key, value) in entries {
            upsert_on(&txn, key, value).await?;
        }
        txn.commit().await
    }
}

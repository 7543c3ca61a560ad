use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::{UserRole, user_entity};

#[derive(Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<user_entity::Model>, DbErr> {
        user_entity::Entity::find_by_id(id.to_string()).one(&self.db).await
    }

    /// Emails are stored lower-cased.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user_entity::Model>, DbErr> {
        user_entity::Entity::find()
            .filter(user_entity::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await
    }

    pub async fn create(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
        role: UserRole,
    ) -> Result<user_entity::Model, DbErr> {
        user_entity::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            email: Set(email.trim().to_lowercase()),
            name: Set(name.map(str::to_string)),
            password_hash: Set(password_hash.to_string()),
            role: Set(role),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
    }
}

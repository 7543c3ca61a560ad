use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{UserRole, user_entity};
use crate::error::AppResult;
use crate::models::common::Validator;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin@example.com")]
    pub email: String,
    #[schema(example = "Admin123!")]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut v = Validator::new();
        let email = self.email.trim();
        let looks_like_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !looks_like_email {
            v.add("email", "must be a valid email address");
        }
        let len = self.password.chars().count();
        if !(8..=128).contains(&len) {
            v.add("password", "must be between 8 and 128 characters");
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
}

impl From<user_entity::Model> for UserInfo {
    fn from(u: user_entity::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_validation() {
        let ok = LoginRequest {
            email: "admin@example.com".into(),
            password: "Admin123!".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = LoginRequest {
            email: "not-an-email".into(),
            password: "short".into(),
        };
        match bad.validate() {
            Err(crate::error::AppError::InvalidBody(Some(details))) => {
                assert!(details.contains_key("email"));
                assert!(details.contains_key("password"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

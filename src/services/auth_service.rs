use sea_orm::DatabaseConnection;

use crate::entities::user_entity;
use crate::error::{AppError, AppResult};
use crate::models::{AuthResponse, LoginRequest, RefreshTokenRequest, UserInfo};
use crate::repositories::UserRepository;
use crate::utils::{JwtService, verify_password};

#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(db: DatabaseConnection, jwt_service: JwtService) -> Self {
        Self {
            users: UserRepository::new(db),
            jwt_service,
        }
    }

    fn issue_tokens(&self, user: user_entity::Model) -> AppResult<AuthResponse> {
        let access_token = self.jwt_service.generate_access_token(&user.id, user.role)?;
        let refresh_token = self.jwt_service.generate_refresh_token(&user.id, user.role)?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
            user: UserInfo::from(user),
        })
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::AuthError("unknown email or wrong password".to_string()))?;

        if !verify_password(&request.password, &user.password_hash)? {
            log::warn!("Failed login for {}", user.email);
            return Err(AppError::AuthError("unknown email or wrong password".to_string()));
        }

        log::info!("User {} signed in", user.id);
        self.issue_tokens(user)
    }

    /// Role is re-read from the store so demotions take effect on refresh.
    pub async fn refresh(&self, request: RefreshTokenRequest) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(&request.refresh_token)?;
        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        self.issue_tokens(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::testing::{self, TEST_PASSWORD};

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_and_refresh() {
        let db = testing::setup_db().await;
        let admin = testing::create_user(&db, "admin@example.com", UserRole::Admin).await;
        let jwt = JwtService::new("test-secret", 60, 120);
        let service = AuthService::new(db.clone(), jwt.clone());

        let response = service
            .login(login_request(" Admin@Example.com ", TEST_PASSWORD))
            .await
            .unwrap();
        assert_eq!(response.user.id, admin.id);
        assert_eq!(response.expires_in, 60);
        let claims = jwt.verify_access_token(&response.access_token).unwrap();
        assert_eq!(claims.role, UserRole::Admin);

        let refreshed = service
            .refresh(RefreshTokenRequest {
                refresh_token: response.refresh_token.clone(),
            })
            .await
            .unwrap();
        assert_eq!(refreshed.user.email, "admin@example.com");

        let misuse = service
            .refresh(RefreshTokenRequest {
                refresh_token: response.access_token,
            })
            .await
            .unwrap_err();
        assert_eq!(misuse.code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let db = testing::setup_db().await;
        testing::create_user(&db, "reader@example.com", UserRole::Reader).await;
        let service = AuthService::new(db.clone(), JwtService::new("test-secret", 60, 120));

        let wrong = service
            .login(login_request("reader@example.com", "wrong-password"))
            .await
            .unwrap_err();
        assert_eq!(wrong.code(), "INVALID_CREDENTIALS");

        let unknown = service
            .login(login_request("ghost@example.com", TEST_PASSWORD))
            .await
            .unwrap_err();
        assert_eq!(unknown.code(), "INVALID_CREDENTIALS");

        let malformed = service.login(login_request("nope", "x")).await.unwrap_err();
        assert_eq!(malformed.code(), "INVALID_BODY");
    }
}

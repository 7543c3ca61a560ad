pub mod admin_post_service;
pub mod auth_service;
pub mod checkout_service;
pub mod comment_service;
pub mod content_service;
pub mod media_service;
pub mod ownership_service;
pub mod purchase_service;
pub mod search_service;
pub mod setting_service;

pub use admin_post_service::*;
pub use auth_service::*;
pub use checkout_service::*;
pub use comment_service::*;
pub use content_service::*;
pub use media_service::*;
pub use ownership_service::*;
pub use purchase_service::*;
pub use search_service::*;
pub use setting_service::*;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::external::{PaymentGateway, StorageBackend};
use crate::utils::JwtService;

/// Every service, built once at startup from explicit dependencies.
#[derive(Clone)]
pub struct AppServices {
    pub auth: AuthService,
    pub ownership: OwnershipService,
    pub checkout: CheckoutService,
    pub purchases: PurchaseService,
    pub search: SearchService,
    pub admin_posts: AdminPostService,
    pub media: MediaService,
    pub settings: SettingService,
    pub comments: CommentService,
    pub content: ContentService,
}

impl AppServices {
    pub fn new(
        db: DatabaseConnection,
        config: &Config,
        jwt_service: JwtService,
        gateway: Option<Arc<dyn PaymentGateway>>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            auth: AuthService::new(db.clone(), jwt_service),
            ownership: OwnershipService::new(db.clone()),
            checkout: CheckoutService::new(db.clone(), gateway.clone()),
            purchases: PurchaseService::new(db.clone(), gateway, &config.stripe),
            search: SearchService::new(db.clone()),
            admin_posts: AdminPostService::new(db.clone()),
            media: MediaService::new(storage),
            settings: SettingService::new(db.clone()),
            comments: CommentService::new(db.clone()),
            content: ContentService::new(db),
        }
    }
}
